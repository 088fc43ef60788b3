use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::{Column, DataSet, DuctoError, Schema, Value, ValueType};

mod csv;
mod json;
mod parquet;

/// Every format the pipeline recognizes. Only csv, json, and parquet have
/// embedded codecs, the rest fail with UnsupportedFormat when selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Csv,
    Json,
    Parquet,
    Delta,
    Avro,
    Orc,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "json",
            Format::Parquet => "parquet",
            Format::Delta => "delta",
            Format::Avro => "avro",
            Format::Orc => "orc",
        }
    }

    pub(crate) fn ensure_supported(&self) -> Result<(), DuctoError> {
        match self {
            Format::Csv | Format::Json | Format::Parquet => Ok(()),
            other => Err(DuctoError::UnsupportedFormat(other.extension().to_string())),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Format {
    type Err = DuctoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            "parquet" => Ok(Format::Parquet),
            "delta" => Ok(Format::Delta),
            "avro" => Ok(Format::Avro),
            "orc" => Ok(Format::Orc),
            other => Err(DuctoError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReadSpec {
    pub location: String,
    pub format: Format,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

impl ReadSpec {
    pub fn new<T: Into<String>>(location: T, format: Format) -> Self {
        Self {
            location: location.into(),
            format,
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// A data file plus the partition values encoded in its directory path.
#[derive(Clone, Debug)]
pub(crate) struct FileSlice {
    pub path: PathBuf,
    pub partitions: Vec<(String, String)>,
}

/// Where each output column of a file comes from.
#[derive(Clone, Debug)]
pub(crate) enum ColumnPlan {
    /// Positional index into the file's own columns
    File(usize),
    /// Key lookup, for keyed formats like json
    Key(String),
    /// Constant decoded from the partition path
    Partition(Value),
    /// Not present in this file at all
    Missing,
}

/// Maps the output schema onto one file's columns and partition values.
pub(crate) fn plan_columns(
    schema: &Schema,
    file_columns: &[String],
    partitions: &[(String, String)],
    keyed: bool,
) -> Vec<ColumnPlan> {
    schema
        .columns
        .iter()
        .map(|column| {
            if let Some((_, text)) = partitions.iter().find(|(name, _)| *name == column.name) {
                let value = Value::parse_as(text, column.column_type)
                    .unwrap_or_else(|_| schema_mismatch(&column.name, column.column_type, text));
                return ColumnPlan::Partition(value);
            }
            match file_columns.iter().position(|name| *name == column.name) {
                Some(index) if keyed => ColumnPlan::Key(file_columns[index].clone()),
                Some(index) => ColumnPlan::File(index),
                None => ColumnPlan::Missing,
            }
        })
        .collect()
}

pub(crate) fn schema_mismatch(column: &str, expected: ValueType, value: &str) -> Value {
    Value::Error(DuctoError::SchemaMismatch {
        column: column.to_string(),
        expected,
        value: value.to_string(),
    })
}

/// One opened data file, already aligned to the output schema.
/// Decode problems are reported in-band as error fields.
pub(crate) trait RecordSource: Send + Sync {
    fn next_row(&mut self) -> Option<Vec<Value>>;
}

/// An exhausted source backed by pre-decoded rows.
pub(crate) struct BufferedSource {
    pub rows: VecDeque<Vec<Value>>,
}

impl RecordSource for BufferedSource {
    fn next_row(&mut self) -> Option<Vec<Value>> {
        self.rows.pop_front()
    }
}

/// Number of rows sampled from the first file when no schema is given.
pub(crate) const INFERENCE_SAMPLE_ROWS: usize = 1000;

/// Text-cell type inference: all-integer widens to long, fractional to
/// double, booleans to bool, anything conflicting falls back to string.
pub(crate) fn infer_text_type<'a, T: Iterator<Item = &'a str>>(cells: T) -> ValueType {
    let mut seen = None;
    for cell in cells {
        if cell.is_empty() {
            continue;
        }
        let cell_type = if cell.parse::<i64>().is_ok() {
            ValueType::Long
        } else if cell.parse::<f64>().is_ok() {
            ValueType::Double
        } else if matches!(cell.to_lowercase().as_str(), "true" | "false") {
            ValueType::Bool
        } else {
            ValueType::String
        };
        seen = Some(match seen {
            None => cell_type,
            Some(prev) if prev == cell_type => prev,
            Some(ValueType::Long) if cell_type == ValueType::Double => ValueType::Double,
            Some(ValueType::Double) if cell_type == ValueType::Long => ValueType::Double,
            Some(_) => return ValueType::String,
        });
    }
    seen.unwrap_or(ValueType::String)
}

/// Percent-escapes the characters that would corrupt the `name=value`
/// directory encoding of a partition path segment.
pub(crate) fn escape_partition_value(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '%' | '/' | '\\' | '=' => {
                out.push('%');
                out.push_str(&format!("{:02X}", c as u32));
            }
            _ => out.push(c),
        }
    }
    out
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Inverse of `escape_partition_value`; malformed escapes pass through.
pub(crate) fn unescape_partition_value(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi * 16 + lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Walks a location into data files, decoding `name=value` directory
/// segments as partition values along the way.
pub(crate) fn collect_files(root: &Path, extension: &str) -> Result<Vec<FileSlice>, DuctoError> {
    if root.is_file() {
        return Ok(vec![FileSlice {
            path: root.to_path_buf(),
            partitions: Vec::new(),
        }]);
    }
    let mut files = Vec::new();
    walk(root, extension, &mut Vec::new(), &mut files)?;
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn walk(
    dir: &Path,
    extension: &str,
    partitions: &mut Vec<(String, String)>,
    out: &mut Vec<FileSlice>,
) -> Result<(), DuctoError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || name.starts_with('_') {
            continue;
        }
        if path.is_dir() {
            match name.split_once('=') {
                Some((key, value)) => {
                    partitions.push((key.to_string(), unescape_partition_value(value)));
                    walk(&path, extension, partitions, out)?;
                    partitions.pop();
                }
                None => walk(&path, extension, partitions, out)?,
            }
        } else if path.extension().map(|e| e == extension).unwrap_or(false) {
            out.push(FileSlice {
                path,
                partitions: partitions.clone(),
            });
        }
    }
    Ok(())
}

/// The lazy dataset over a set of data files, opened one at a time.
struct FileSetDataSet {
    schema: Schema,
    format: Format,
    files: VecDeque<FileSlice>,
    current: Option<Box<dyn RecordSource>>,
}

impl FileSetDataSet {
    fn open_next(&mut self) -> Result<bool, DuctoError> {
        let slice = match self.files.pop_front() {
            Some(slice) => slice,
            None => return Ok(false),
        };
        debug!("Opening data file {:?}", slice.path);
        let source = match self.format {
            Format::Csv => csv::open(&slice, &self.schema)?,
            Format::Json => json::open(&slice, &self.schema)?,
            Format::Parquet => parquet::open(&slice, &self.schema)?,
            other => return Err(DuctoError::UnsupportedFormat(other.extension().to_string())),
        };
        self.current = Some(source);
        Ok(true)
    }
}

#[async_trait]
impl DataSet for FileSetDataSet {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn next(&mut self) -> Option<Vec<Value>> {
        loop {
            if let Some(source) = &mut self.current {
                if let Some(row) = source.next_row() {
                    return Some(row);
                }
                self.current = None;
            }
            match self.open_next() {
                Ok(true) => continue,
                Ok(false) => return None,
                // Surface the open failure in-band, then stop
                Err(e) => {
                    let width = self.schema.columns.len();
                    return Some(vec![Value::Error(e); width.max(1)]);
                }
            }
        }
    }
}

pub struct SourceReader;

impl SourceReader {
    /// Resolves a read spec into a lazy, single-pass dataset.
    pub fn read(spec: &ReadSpec) -> Result<Box<dyn DataSet>, DuctoError> {
        if spec.location.is_empty() {
            return Err(DuctoError::ValidationError(
                "Read location is empty".to_string(),
            ));
        }
        spec.format.ensure_supported()?;
        let root = Path::new(&spec.location);
        if !root.exists() {
            return Err(DuctoError::NotFound(spec.location.clone()));
        }
        let files = collect_files(root, spec.format.extension())?;
        let schema = match &spec.schema {
            Some(schema) => {
                schema.validate()?;
                schema.clone()
            }
            None => {
                let first = files.first().ok_or_else(|| {
                    DuctoError::ValidationError(format!(
                        "No {} data files under '{}' to infer a schema from",
                        spec.format, spec.location
                    ))
                })?;
                let mut schema = match spec.format {
                    Format::Csv => csv::infer_schema(&first.path)?,
                    Format::Json => json::infer_schema(&first.path)?,
                    Format::Parquet => parquet::read_schema(&first.path)?,
                    other => {
                        return Err(DuctoError::UnsupportedFormat(
                            other.extension().to_string(),
                        ))
                    }
                };
                // Partition values come back as string columns
                for (name, _) in &first.partitions {
                    if schema.get_column_index(name).is_none() {
                        schema.columns.push(Column::new(name, ValueType::String));
                    }
                }
                schema
            }
        };
        Ok(Box::new(FileSetDataSet {
            schema,
            format: spec.format,
            files: files.into(),
            current: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_name_is_rejected() {
        let err = Format::from_str("xml").err().unwrap();
        assert!(matches!(err, DuctoError::UnsupportedFormat(f) if f == "xml"));
        assert_eq!(Format::from_str("CSV").unwrap(), Format::Csv);
    }

    #[test]
    fn missing_location_is_not_found() {
        let spec = ReadSpec::new("/no/such/place", Format::Csv);
        assert!(matches!(
            SourceReader::read(&spec),
            Err(DuctoError::NotFound(_))
        ));
    }

    #[test]
    fn empty_location_is_invalid() {
        let spec = ReadSpec::new("", Format::Csv);
        assert!(matches!(
            SourceReader::read(&spec),
            Err(DuctoError::ValidationError(_))
        ));
    }

    #[test]
    fn codecless_format_is_unsupported() {
        let spec = ReadSpec::new("/tmp", Format::Delta);
        assert!(matches!(
            SourceReader::read(&spec),
            Err(DuctoError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn partition_value_escaping_round_trips() {
        let raw = "br/sul=100%";
        let escaped = escape_partition_value(raw);
        assert_eq!(escaped, "br%2Fsul%3D100%25");
        assert_eq!(unescape_partition_value(&escaped), raw);
        // Plain values pass through untouched
        assert_eq!(escape_partition_value("norte"), "norte");
        assert_eq!(unescape_partition_value("norte"), "norte");
    }

    #[test]
    fn text_type_inference_widens() {
        assert_eq!(
            infer_text_type(["1", "2", "3"].into_iter()),
            ValueType::Long
        );
        assert_eq!(
            infer_text_type(["1", "2.5"].into_iter()),
            ValueType::Double
        );
        assert_eq!(
            infer_text_type(["true", "false"].into_iter()),
            ValueType::Bool
        );
        assert_eq!(
            infer_text_type(["1", "x"].into_iter()),
            ValueType::String
        );
        assert_eq!(infer_text_type([].into_iter()), ValueType::String);
    }
}
