use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::pipeline::{DuctoError, Schema, Value};

/// One JSON object per line, null fields omitted.
pub(crate) fn write_file(
    path: &Path,
    schema: &Schema,
    rows: &[Vec<Value>],
) -> Result<(), DuctoError> {
    let mut writer = BufWriter::new(File::create(path)?);
    for row in rows {
        let mut object = serde_json::Map::new();
        for (column, value) in schema.columns.iter().zip(row) {
            if matches!(value, Value::Null) {
                continue;
            }
            object.insert(column.name.clone(), value.clone().into());
        }
        serde_json::to_writer(&mut writer, &serde_json::Value::Object(object))
            .map_err(|e| DuctoError::IoError(e.to_string()))?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
