use std::path::Path;

use csv::WriterBuilder;

use crate::pipeline::{DuctoError, Schema, Value};

/// Nulls are written as empty cells, matching what the reader parses back.
pub(crate) fn write_file(
    path: &Path,
    schema: &Schema,
    rows: &[Vec<Value>],
) -> Result<(), DuctoError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| DuctoError::IoError(e.to_string()))?;
    writer
        .write_record(schema.columns.iter().map(|c| c.name.as_str()))
        .map_err(|e| DuctoError::IoError(e.to_string()))?;
    for row in rows {
        writer
            .write_record(row.iter().map(cell_text))
            .map_err(|e| DuctoError::IoError(e.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.dump_raw(),
    }
}
