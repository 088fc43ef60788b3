use std::fs::File;
use std::path::Path;

use csv::{Reader, ReaderBuilder, StringRecord, StringRecordsIntoIter};

use crate::pipeline::{Column, DuctoError, Schema, Value, ValueType};

use super::{
    plan_columns, schema_mismatch, ColumnPlan, FileSlice, RecordSource, INFERENCE_SAMPLE_ROWS,
};

fn open_reader(path: &Path) -> Result<Reader<File>, DuctoError> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| DuctoError::IoError(e.to_string()))
}

fn headers(reader: &mut Reader<File>) -> Result<Vec<String>, DuctoError> {
    Ok(reader
        .headers()
        .map_err(|e| DuctoError::IoError(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect())
}

/// Column types are inferred from a bounded sample of the first file.
pub(crate) fn infer_schema(path: &Path) -> Result<Schema, DuctoError> {
    let mut reader = open_reader(path)?;
    let headers = headers(&mut reader)?;
    let mut sample: Vec<StringRecord> = Vec::new();
    for record in reader.into_records().take(INFERENCE_SAMPLE_ROWS) {
        sample.push(record.map_err(|e| DuctoError::IoError(e.to_string()))?);
    }
    let columns = headers
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let column_type =
                super::infer_text_type(sample.iter().filter_map(|r| r.get(index)));
            Column::new(name, column_type)
        })
        .collect();
    Ok(Schema { columns })
}

pub(crate) fn open(
    slice: &FileSlice,
    schema: &Schema,
) -> Result<Box<dyn RecordSource>, DuctoError> {
    let mut reader = open_reader(&slice.path)?;
    let file_columns = headers(&mut reader)?;
    let plans = plan_columns(schema, &file_columns, &slice.partitions, false);
    let types: Vec<ValueType> = schema.get_column_types();
    let names: Vec<String> = schema.columns.iter().map(|c| c.name.clone()).collect();
    Ok(Box::new(CsvFileSource {
        records: reader.into_records(),
        plans,
        types,
        names,
    }))
}

struct CsvFileSource {
    records: StringRecordsIntoIter<File>,
    plans: Vec<ColumnPlan>,
    types: Vec<ValueType>,
    names: Vec<String>,
}

impl RecordSource for CsvFileSource {
    fn next_row(&mut self) -> Option<Vec<Value>> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => {
                let error = Value::Error(DuctoError::IoError(e.to_string()));
                return Some(vec![error; self.plans.len().max(1)]);
            }
        };
        let row = self
            .plans
            .iter()
            .enumerate()
            .map(|(index, plan)| match plan {
                ColumnPlan::File(position) => match record.get(*position) {
                    Some(cell) => Value::parse_as(cell, self.types[index]).unwrap_or_else(|_| {
                        schema_mismatch(&self.names[index], self.types[index], cell)
                    }),
                    None => Value::Null,
                },
                ColumnPlan::Key(_) => Value::Null,
                ColumnPlan::Partition(value) => value.clone(),
                ColumnPlan::Missing => Value::Null,
            })
            .collect();
        Some(row)
    }
}
