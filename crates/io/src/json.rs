// JSON export

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

/// Pretty-printed JSON of any serializable value (the run result).
pub fn export<T: Serialize>(value: &T, path: &Path) -> Result<(), String> {
    let file = File::create(path).map_err(|e| format!("cannot write {}: {e}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, value).map_err(|e| e.to_string())?;
    Ok(())
}
