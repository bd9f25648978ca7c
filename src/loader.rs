use crate::error::{HistoryError, Result};
use crate::model::SortColumn;
use crate::table::HistoryTable;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_FILE_PREFIX: &str = "endsong_";

pub fn history_file_path(dir: &Path, prefix: &str, index: usize) -> PathBuf {
    dir.join(format!("{prefix}{index}.json"))
}

/// Reads `<prefix>0.json`, `<prefix>1.json`, ... and concatenates their
/// records. Reading stops at the first missing index, so files after a gap are
/// never seen.
pub fn load_records(dir: &Path, prefix: &str) -> Result<Vec<Value>> {
    let mut records = Vec::new();
    let mut index = 0_usize;

    loop {
        let path = history_file_path(dir, prefix, index);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                if index == 0 {
                    return Err(HistoryError::EmptyResult(path));
                }
                break;
            }
            Err(source) => return Err(HistoryError::Io { path, source }),
        };

        let file_records = parse_history_file(&path, &raw)?;
        tracing::debug!(
            file = %path.display(),
            records = file_records.len(),
            "read history file"
        );
        records.extend(file_records);
        index += 1;
    }

    tracing::info!(files = index, records = records.len(), "loaded listening history");
    Ok(records)
}

fn parse_history_file(path: &Path, raw: &str) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_str(raw).map_err(|err| HistoryError::FileFormat {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;

    let Value::Array(records) = value else {
        return Err(HistoryError::FileFormat {
            path: path.to_path_buf(),
            reason: String::from("expected a JSON array of play records"),
        });
    };

    if let Some(position) = records.iter().position(|record| !record.is_object()) {
        return Err(HistoryError::FileFormat {
            path: path.to_path_buf(),
            reason: format!("entry {position} is not an object"),
        });
    }
    Ok(records)
}

/// The one loading step of a session: read every file, build the table and
/// optionally sort it.
pub fn load_table(dir: &Path, prefix: &str, sort: Option<SortColumn>) -> Result<HistoryTable> {
    let table = HistoryTable::from_records(load_records(dir, prefix)?)?;
    Ok(match sort {
        Some(column) => {
            tracing::debug!(column = column.label(), "sorting history");
            table.sorted_by(column)
        }
        None => table,
    })
}
