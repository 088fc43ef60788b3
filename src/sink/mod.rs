use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::pipeline::{DataSet, DuctoError, Schema, Value};
use crate::source::{escape_partition_value, Format};

mod csv;
mod json;
mod parquet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    Overwrite,
    Append,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WriteSpec {
    pub location: String,
    pub format: Format,
    pub mode: WriteMode,
    #[serde(default)]
    pub partition_columns: Vec<String>,
}

impl WriteSpec {
    pub fn new<T: Into<String>>(location: T, format: Format, mode: WriteMode) -> Self {
        Self {
            location: location.into(),
            format,
            mode,
            partition_columns: Vec::new(),
        }
    }

    pub fn partitioned_by<T: Into<String>>(mut self, columns: Vec<T>) -> Self {
        self.partition_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteResult {
    pub record_count: usize,
}

pub struct SinkWriter;

impl SinkWriter {
    /// Drains the dataset into the destination. Partition columns are
    /// encoded as `col=value` directories and dropped from the written
    /// rows. Append failure partway leaves a partial destination.
    pub async fn write(
        mut dataset: Box<dyn DataSet>,
        spec: &WriteSpec,
    ) -> Result<WriteResult, DuctoError> {
        if spec.location.is_empty() {
            return Err(DuctoError::ValidationError(
                "Write location is empty".to_string(),
            ));
        }
        spec.format.ensure_supported()?;

        let (schema, rows) = dataset.try_eval().await?;
        let partition_indices = spec
            .partition_columns
            .iter()
            .map(|name| schema.require_index(name))
            .collect::<Result<Vec<_>, _>>()?;
        let file_schema: Schema = schema
            .columns
            .iter()
            .enumerate()
            .filter(|(index, _)| !partition_indices.contains(index))
            .map(|(_, column)| column.clone())
            .collect();

        let record_count = rows.len();
        let root = Path::new(&spec.location);

        // Group rows by partition value tuple, in first-seen order
        let mut group_order: Vec<Vec<String>> = Vec::new();
        let mut groups: HashMap<Vec<String>, Vec<Vec<Value>>> = HashMap::new();
        for row in rows {
            let mut key = Vec::with_capacity(partition_indices.len());
            for (&index, name) in partition_indices.iter().zip(&spec.partition_columns) {
                match &row[index] {
                    Value::Null => {
                        return Err(DuctoError::MissingPartitionValue(name.clone()));
                    }
                    value => key.push(escape_partition_value(&value.dump_raw())),
                }
            }
            let file_row: Vec<Value> = row
                .into_iter()
                .enumerate()
                .filter(|(index, _)| !partition_indices.contains(index))
                .map(|(_, value)| value)
                .collect();
            match groups.get_mut(&key) {
                Some(group) => group.push(file_row),
                None => {
                    group_order.push(key.clone());
                    groups.insert(key, vec![file_row]);
                }
            }
        }

        if spec.mode == WriteMode::Overwrite && spec.partition_columns.is_empty() {
            clear_data_files(root, spec.format)?;
        }

        for key in group_order {
            let group = match groups.remove(&key) {
                Some(group) => group,
                None => continue,
            };
            let mut dir = root.to_path_buf();
            for (name, value) in spec.partition_columns.iter().zip(&key) {
                dir.push(format!("{}={}", name, value));
            }
            if spec.mode == WriteMode::Overwrite && !spec.partition_columns.is_empty() {
                clear_data_files(&dir, spec.format)?;
            }
            std::fs::create_dir_all(&dir)?;
            let path = part_file(&dir, spec.format);
            debug!("Writing {} records to {:?}", group.len(), path);
            write_file(&path, spec.format, &file_schema, &group)?;
        }

        // An empty dataset still creates the destination directory
        std::fs::create_dir_all(root)?;

        Ok(WriteResult { record_count })
    }
}

fn part_file(dir: &Path, format: Format) -> PathBuf {
    dir.join(format!("part-{}.{}", Uuid::new_v4(), format.extension()))
}

fn write_file(
    path: &Path,
    format: Format,
    schema: &Schema,
    rows: &[Vec<Value>],
) -> Result<(), DuctoError> {
    match format {
        Format::Csv => csv::write_file(path, schema, rows),
        Format::Json => json::write_file(path, schema, rows),
        Format::Parquet => parquet::write_file(path, schema, rows),
        other => Err(DuctoError::UnsupportedFormat(other.extension().to_string())),
    }
}

/// Removes this format's data files under a target directory, leaving
/// anything else in place.
fn clear_data_files(dir: &Path, format: Format) -> Result<(), DuctoError> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && path
                .extension()
                .map(|e| e == format.extension())
                .unwrap_or(false)
        {
            std::fs::remove_file(path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::pipeline::{Column, DataSetCreator, Schema, Value, ValueType};

    use super::*;

    fn people() -> (Schema, Vec<Vec<Value>>) {
        let schema = Schema::from(vec![
            Column::new("id", ValueType::String),
            Column::new("country", ValueType::String),
        ]);
        let rows = vec![
            vec![Value::from("cliente1"), Value::from("br")],
            vec![Value::from("cliente2"), Value::from("pt")],
        ];
        (schema, rows)
    }

    #[tokio::test]
    async fn partitioned_write_builds_hive_layout() {
        let dir = tempfile::tempdir().unwrap();
        let (schema, rows) = people();
        let ds = DataSetCreator::eager(schema, rows);
        let spec = WriteSpec::new(
            dir.path().to_string_lossy(),
            Format::Csv,
            WriteMode::Overwrite,
        )
        .partitioned_by(vec!["country"]);
        let result = SinkWriter::write(ds, &spec).await.unwrap();
        assert_eq!(result.record_count, 2);
        assert!(dir.path().join("country=br").is_dir());
        assert!(dir.path().join("country=pt").is_dir());
        // Partition column is dropped from the file itself
        let part = std::fs::read_dir(dir.path().join("country=br"))
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        let content = std::fs::read_to_string(part.path()).unwrap();
        assert!(content.contains("cliente1"));
        assert!(!content.contains("br"));
    }

    #[tokio::test]
    async fn null_partition_value_fails() {
        let dir = tempfile::tempdir().unwrap();
        let schema = Schema::from(vec![
            Column::new("id", ValueType::String),
            Column::new("country", ValueType::String),
        ]);
        let ds = DataSetCreator::eager(schema, vec![vec![Value::from("x"), Value::Null]]);
        let spec = WriteSpec::new(
            dir.path().to_string_lossy(),
            Format::Csv,
            WriteMode::Overwrite,
        )
        .partitioned_by(vec!["country"]);
        let err = SinkWriter::write(ds, &spec).await.err().unwrap();
        assert!(matches!(
            err,
            DuctoError::MissingPartitionValue(column) if column == "country"
        ));
    }

    #[tokio::test]
    async fn unknown_partition_column_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (schema, rows) = people();
        let ds = DataSetCreator::eager(schema, rows);
        let spec = WriteSpec::new(
            dir.path().to_string_lossy(),
            Format::Csv,
            WriteMode::Overwrite,
        )
        .partitioned_by(vec!["region"]);
        let err = SinkWriter::write(ds, &spec).await.err().unwrap();
        assert!(matches!(err, DuctoError::ColumnNotFound(c) if c == "region"));
    }

    #[tokio::test]
    async fn append_adds_files_overwrite_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().to_string_lossy().to_string();
        for _ in 0..2 {
            let (schema, rows) = people();
            let ds = DataSetCreator::eager(schema, rows);
            let spec = WriteSpec::new(&location, Format::Csv, WriteMode::Append);
            SinkWriter::write(ds, &spec).await.unwrap();
        }
        let appended = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(appended, 2);

        let (schema, rows) = people();
        let ds = DataSetCreator::eager(schema, rows);
        let spec = WriteSpec::new(&location, Format::Csv, WriteMode::Overwrite);
        SinkWriter::write(ds, &spec).await.unwrap();
        let after_overwrite = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(after_overwrite, 1);
    }
}
