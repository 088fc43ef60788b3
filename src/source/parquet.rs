use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;

use arrow::array::{
    Array, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
    TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use chrono::{TimeZone, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::pipeline::{Column, DuctoError, Schema, Value, ValueType};

use super::{plan_columns, schema_mismatch, BufferedSource, ColumnPlan, FileSlice, RecordSource};

fn map_arrow_type(data_type: &DataType) -> Result<ValueType, DuctoError> {
    match data_type {
        DataType::Boolean => Ok(ValueType::Bool),
        DataType::Int32 => Ok(ValueType::Int),
        DataType::Int64 => Ok(ValueType::Long),
        DataType::Float32 => Ok(ValueType::Float),
        DataType::Float64 => Ok(ValueType::Double),
        DataType::Utf8 | DataType::LargeUtf8 => Ok(ValueType::String),
        DataType::Timestamp(_, _) => Ok(ValueType::DateTime),
        other => Err(DuctoError::UnsupportedFormat(format!(
            "parquet type {:?}",
            other
        ))),
    }
}

fn builder_for(path: &Path) -> Result<ParquetRecordBatchReaderBuilder<File>, DuctoError> {
    let file = File::open(path)?;
    ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| DuctoError::IoError(e.to_string()))
}

/// Parquet always carries its own schema, no sampling needed.
pub(crate) fn read_schema(path: &Path) -> Result<Schema, DuctoError> {
    let builder = builder_for(path)?;
    let columns = builder
        .schema()
        .fields()
        .iter()
        .map(|field| Ok(Column::new(field.name(), map_arrow_type(field.data_type())?)))
        .collect::<Result<Vec<_>, DuctoError>>()?;
    Ok(Schema { columns })
}

fn decode_cell(array: &dyn Array, index: usize) -> Value {
    if array.is_null(index) {
        return Value::Null;
    }
    macro_rules! typed {
        ($ty:ty) => {
            match array.as_any().downcast_ref::<$ty>() {
                Some(a) => a,
                None => {
                    return Value::Error(DuctoError::IoError(format!(
                        "Parquet column has unexpected array type {:?}",
                        array.data_type()
                    )))
                }
            }
        };
    }
    match array.data_type() {
        DataType::Boolean => typed!(BooleanArray).value(index).into(),
        DataType::Int32 => typed!(Int32Array).value(index).into(),
        DataType::Int64 => typed!(Int64Array).value(index).into(),
        DataType::Float32 => typed!(Float32Array).value(index).into(),
        DataType::Float64 => typed!(Float64Array).value(index).into(),
        DataType::Utf8 => typed!(StringArray).value(index).to_string().into(),
        DataType::Timestamp(TimeUnit::Second, _) => Utc
            .timestamp_opt(typed!(TimestampSecondArray).value(index), 0)
            .single()
            .map(Value::from)
            .unwrap_or(Value::Null),
        DataType::Timestamp(TimeUnit::Millisecond, _) => Utc
            .timestamp_millis_opt(typed!(TimestampMillisecondArray).value(index))
            .single()
            .map(Value::from)
            .unwrap_or(Value::Null),
        DataType::Timestamp(TimeUnit::Microsecond, _) => Utc
            .timestamp_micros(typed!(TimestampMicrosecondArray).value(index))
            .single()
            .map(Value::from)
            .unwrap_or(Value::Null),
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            Value::from(Utc.timestamp_nanos(typed!(TimestampNanosecondArray).value(index)))
        }
        other => Value::Error(DuctoError::UnsupportedFormat(format!(
            "parquet type {:?}",
            other
        ))),
    }
}

/// Batches are decoded per file, the file set itself stays lazy.
pub(crate) fn open(
    slice: &FileSlice,
    schema: &Schema,
) -> Result<Box<dyn RecordSource>, DuctoError> {
    let builder = builder_for(&slice.path)?;
    let file_columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|field| field.name().clone())
        .collect();
    let plans = plan_columns(schema, &file_columns, &slice.partitions, false);
    let types = schema.get_column_types();
    let names: Vec<String> = schema.columns.iter().map(|c| c.name.clone()).collect();
    let reader = builder
        .build()
        .map_err(|e| DuctoError::IoError(e.to_string()))?;

    let mut rows = VecDeque::new();
    for batch in reader {
        let batch = batch.map_err(|e| DuctoError::IoError(e.to_string()))?;
        for row_index in 0..batch.num_rows() {
            let row = plans
                .iter()
                .enumerate()
                .map(|(index, plan)| match plan {
                    ColumnPlan::File(position) => {
                        let value = decode_cell(batch.column(*position).as_ref(), row_index);
                        coerce(value, types[index], &names[index])
                    }
                    ColumnPlan::Partition(value) => value.clone(),
                    ColumnPlan::Key(_) | ColumnPlan::Missing => Value::Null,
                })
                .collect();
            rows.push_back(row);
        }
    }
    Ok(Box::new(BufferedSource { rows }))
}

fn coerce(value: Value, expected: ValueType, column: &str) -> Value {
    if matches!(value, Value::Null | Value::Error(_)) || value.value_type() == expected {
        return value;
    }
    let text = value.dump_raw();
    value
        .try_convert(expected)
        .unwrap_or_else(|_| schema_mismatch(column, expected, &text))
}
