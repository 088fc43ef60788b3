use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::pipeline::{Column, DuctoError, Schema, Value, ValueType};

use super::{
    plan_columns, schema_mismatch, ColumnPlan, FileSlice, RecordSource, INFERENCE_SAMPLE_ROWS,
};

fn open_lines(path: &Path) -> Result<Lines<BufReader<File>>, DuctoError> {
    Ok(BufReader::new(File::open(path)?).lines())
}

fn value_type_of_json(v: &serde_json::Value) -> ValueType {
    match v {
        serde_json::Value::Bool(_) => ValueType::Bool,
        serde_json::Value::Number(n) if n.is_i64() => ValueType::Long,
        serde_json::Value::Number(_) => ValueType::Double,
        _ => ValueType::String,
    }
}

/// Keys and types are inferred from a bounded sample of newline-delimited
/// objects. `serde_json::Map` iterates sorted by key, so the inferred
/// columns come out key-sorted; conflicting types widen to string.
pub(crate) fn infer_schema(path: &Path) -> Result<Schema, DuctoError> {
    let mut keys: Vec<String> = Vec::new();
    let mut types: Vec<Option<ValueType>> = Vec::new();
    for line in open_lines(path)?.take(INFERENCE_SAMPLE_ROWS) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&line)
            .map_err(|e| DuctoError::ValidationError(format!("Invalid JSON line: {}", e)))?;
        for (key, value) in &object {
            if value.is_null() {
                continue;
            }
            let value_type = value_type_of_json(value);
            match keys.iter().position(|k| k == key) {
                Some(index) => {
                    types[index] = Some(match types[index] {
                        None => value_type,
                        Some(prev) if prev == value_type => prev,
                        Some(ValueType::Long) if value_type == ValueType::Double => {
                            ValueType::Double
                        }
                        Some(ValueType::Double) if value_type == ValueType::Long => {
                            ValueType::Double
                        }
                        Some(_) => ValueType::String,
                    });
                }
                None => {
                    keys.push(key.clone());
                    types.push(Some(value_type));
                }
            }
        }
    }
    let columns = keys
        .into_iter()
        .zip(types)
        .map(|(name, t)| Column::new(name, t.unwrap_or(ValueType::String)))
        .collect();
    Ok(Schema { columns })
}

pub(crate) fn open(
    slice: &FileSlice,
    schema: &Schema,
) -> Result<Box<dyn RecordSource>, DuctoError> {
    // Keyed lookup, so the file column list is just the schema names
    let names: Vec<String> = schema.columns.iter().map(|c| c.name.clone()).collect();
    let plans = plan_columns(schema, &names, &slice.partitions, true);
    Ok(Box::new(JsonFileSource {
        lines: open_lines(&slice.path)?,
        plans,
        types: schema.get_column_types(),
        names,
    }))
}

struct JsonFileSource {
    lines: Lines<BufReader<File>>,
    plans: Vec<ColumnPlan>,
    types: Vec<ValueType>,
    names: Vec<String>,
}

impl JsonFileSource {
    fn decode(&self, line: &str) -> Vec<Value> {
        let object: serde_json::Map<String, serde_json::Value> = match serde_json::from_str(line)
        {
            Ok(object) => object,
            Err(e) => {
                let error = Value::Error(DuctoError::ValidationError(format!(
                    "Invalid JSON line: {}",
                    e
                )));
                return vec![error; self.plans.len().max(1)];
            }
        };
        self.plans
            .iter()
            .enumerate()
            .map(|(index, plan)| match plan {
                ColumnPlan::Key(key) => match object.get(key) {
                    Some(raw) => self.coerce(index, raw.clone()),
                    None => Value::Null,
                },
                ColumnPlan::Partition(value) => value.clone(),
                ColumnPlan::File(_) | ColumnPlan::Missing => Value::Null,
            })
            .collect()
    }

    fn coerce(&self, index: usize, raw: serde_json::Value) -> Value {
        let text = match &raw {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let value = Value::from(raw);
        if matches!(value, Value::Null | Value::Error(_)) {
            return value;
        }
        if value.value_type() == self.types[index] {
            return value;
        }
        value
            .try_convert(self.types[index])
            .unwrap_or_else(|_| schema_mismatch(&self.names[index], self.types[index], &text))
    }
}

impl RecordSource for JsonFileSource {
    fn next_row(&mut self) -> Option<Vec<Value>> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    let error = Value::Error(DuctoError::from(e));
                    return Some(vec![error; self.plans.len().max(1)]);
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(self.decode(&line));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::pipeline::DataSet;
    use crate::source::{Format, ReadSpec, SourceReader};

    use super::*;

    #[tokio::test]
    async fn reads_ndjson_with_inference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut f = File::create(&path).unwrap();
        writeln!(f, r#"{{"age":25,"id":"cliente1"}}"#).unwrap();
        writeln!(f, r#"{{"age":30,"id":"cliente2"}}"#).unwrap();
        drop(f);
        let spec = ReadSpec::new(path.to_string_lossy(), Format::Json);
        let mut ds = SourceReader::read(&spec).unwrap();
        let schema = ds.schema().clone();
        assert_eq!(schema.get_column_index("age"), Some(0));
        assert_eq!(schema.columns[0].column_type, ValueType::Long);
        let (_, rows) = ds.try_eval().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], Value::Long(25));
        assert_eq!(rows[0][1], Value::from("cliente1"));
    }

    #[tokio::test]
    async fn missing_key_reads_as_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut f = File::create(&path).unwrap();
        writeln!(f, r#"{{"id":"a","age":1}}"#).unwrap();
        writeln!(f, r#"{{"id":"b"}}"#).unwrap();
        drop(f);
        let schema = Schema::from(vec![
            Column::new("id", ValueType::String),
            Column::new("age", ValueType::Long),
        ]);
        let spec = ReadSpec::new(path.to_string_lossy(), Format::Json).with_schema(schema);
        let mut ds = SourceReader::read(&spec).unwrap();
        let (_, rows) = ds.try_eval().await.unwrap();
        assert_eq!(rows[1], vec![Value::from("b"), Value::Null]);
    }
}
