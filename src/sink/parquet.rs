use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, RecordBatch,
    StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema, TimeUnit};
use parquet::arrow::ArrowWriter;

use crate::pipeline::{DuctoError, Schema, Value, ValueType};

fn arrow_type(value_type: ValueType) -> Result<DataType, DuctoError> {
    match value_type {
        ValueType::Bool => Ok(DataType::Boolean),
        ValueType::Int => Ok(DataType::Int32),
        ValueType::Long => Ok(DataType::Int64),
        ValueType::Float => Ok(DataType::Float32),
        ValueType::Double => Ok(DataType::Float64),
        ValueType::String | ValueType::Null => Ok(DataType::Utf8),
        ValueType::DateTime => Ok(DataType::Timestamp(TimeUnit::Microsecond, None)),
        ValueType::Error => Err(DuctoError::ValidationError(
            "Error columns cannot be written".to_string(),
        )),
    }
}

fn cells<'a, T, F>(
    rows: &'a [Vec<Value>],
    index: usize,
    extract: F,
) -> Result<Vec<Option<T>>, DuctoError>
where
    F: Fn(&'a Value) -> Result<T, DuctoError>,
{
    rows.iter()
        .map(|row| match &row[index] {
            Value::Null => Ok(None),
            value => extract(value).map(Some),
        })
        .collect()
}

fn build_array(
    rows: &[Vec<Value>],
    index: usize,
    value_type: ValueType,
) -> Result<ArrayRef, DuctoError> {
    Ok(match value_type {
        ValueType::Bool => Arc::new(BooleanArray::from(cells(rows, index, |v| v.get_bool())?)),
        ValueType::Int => Arc::new(Int32Array::from(cells(rows, index, |v| v.get_int())?)),
        ValueType::Long => Arc::new(Int64Array::from(cells(rows, index, |v| v.get_long())?)),
        ValueType::Float => Arc::new(Float32Array::from(cells(rows, index, |v| {
            v.get_double().map(|d| d as f32)
        })?)),
        ValueType::Double => Arc::new(Float64Array::from(cells(rows, index, |v| {
            v.get_double()
        })?)),
        ValueType::String | ValueType::Null => Arc::new(StringArray::from(cells(
            rows,
            index,
            |v| v.get_string().map(|s| s.to_string()),
        )?)),
        ValueType::DateTime => Arc::new(TimestampMicrosecondArray::from(cells(
            rows,
            index,
            |v| v.get_datetime().map(|dt| dt.timestamp_micros()),
        )?)),
        ValueType::Error => {
            return Err(DuctoError::ValidationError(
                "Error columns cannot be written".to_string(),
            ))
        }
    })
}

pub(crate) fn write_file(
    path: &Path,
    schema: &Schema,
    rows: &[Vec<Value>],
) -> Result<(), DuctoError> {
    let fields = schema
        .columns
        .iter()
        .map(|column| Ok(Field::new(&column.name, arrow_type(column.column_type)?, true)))
        .collect::<Result<Vec<_>, DuctoError>>()?;
    let arrow_schema = Arc::new(ArrowSchema::new(fields));
    let arrays = schema
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| build_array(rows, index, column.column_type))
        .collect::<Result<Vec<_>, _>>()?;
    let batch = RecordBatch::try_new(arrow_schema.clone(), arrays)
        .map_err(|e| DuctoError::IoError(e.to_string()))?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, arrow_schema, None)
        .map_err(|e| DuctoError::IoError(e.to_string()))?;
    writer
        .write(&batch)
        .map_err(|e| DuctoError::IoError(e.to_string()))?;
    writer
        .close()
        .map_err(|e| DuctoError::IoError(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::pipeline::{Column, DataSet, DataSetCreator};
    use crate::sink::{SinkWriter, WriteMode, WriteSpec};
    use crate::source::{Format, ReadSpec, SourceReader};

    use super::*;

    #[tokio::test]
    async fn parquet_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let schema = Schema::from(vec![
            Column::new("id", ValueType::String),
            Column::new("age", ValueType::Int),
            Column::new("score", ValueType::Double),
        ]);
        let rows = vec![
            vec![Value::from("a"), Value::Int(1), Value::Double(0.5)],
            vec![Value::from("b"), Value::Null, Value::Double(1.5)],
        ];
        let ds = DataSetCreator::eager(schema.clone(), rows.clone());
        let spec = WriteSpec::new(
            dir.path().to_string_lossy(),
            Format::Parquet,
            WriteMode::Overwrite,
        );
        let result = SinkWriter::write(ds, &spec).await.unwrap();
        assert_eq!(result.record_count, 2);

        let read_spec =
            ReadSpec::new(dir.path().to_string_lossy(), Format::Parquet).with_schema(schema);
        let mut read_back = SourceReader::read(&read_spec).unwrap();
        let (_, mut got) = read_back.try_eval().await.unwrap();
        got.sort_by(|a, b| a[0].total_cmp(&b[0]));
        assert_eq!(got, rows);
    }

    #[tokio::test]
    async fn parquet_carries_its_own_schema() {
        let dir = tempfile::tempdir().unwrap();
        let schema = Schema::from(vec![Column::new("n", ValueType::Long)]);
        let ds = DataSetCreator::eager(schema, vec![vec![Value::Long(42)]]);
        let spec = WriteSpec::new(
            dir.path().to_string_lossy(),
            Format::Parquet,
            WriteMode::Overwrite,
        );
        SinkWriter::write(ds, &spec).await.unwrap();

        let read_spec = ReadSpec::new(dir.path().to_string_lossy(), Format::Parquet);
        let mut read_back = SourceReader::read(&read_spec).unwrap();
        assert_eq!(read_back.schema().columns[0].column_type, ValueType::Long);
        let (_, rows) = read_back.try_eval().await.unwrap();
        assert_eq!(rows, vec![vec![Value::Long(42)]]);
    }
}
