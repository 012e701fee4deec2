use crate::errors::AppError;
use crate::ingest::ingest_rows;
use crate::models::{AdRecord, LoadReport};
use serde_json::Value;
use std::{env, io, path::Path, path::PathBuf};
use tokio::fs;
use tracing::{info, warn};

pub fn resolve_data_path() -> Result<PathBuf, std::io::Error> {
    if let Ok(path) = env::var("APP_DATA_PATH") {
        return Ok(PathBuf::from(path));
    }

    Ok(PathBuf::from("data/meta_ads.json"))
}

/// Read the record source export and normalize it into a fresh snapshot.
///
/// The export is either a bare JSON array of rows or an object wrapping the
/// array under `"data"`. A missing file yields an empty snapshot.
pub async fn load_snapshot(path: &Path) -> Result<(Vec<AdRecord>, LoadReport), AppError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!("record source {} not found, starting empty", path.display());
            return Ok((Vec::new(), LoadReport::default()));
        }
        Err(err) => return Err(AppError::internal(err)),
    };

    let rows = match serde_json::from_slice::<Value>(&bytes)? {
        Value::Array(rows) => rows,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(rows)) => rows,
            _ => return Err(invalid_export("object export has no \"data\" array")),
        },
        _ => return Err(invalid_export("expected a JSON array of rows")),
    };

    let (records, report) = ingest_rows(rows);
    info!(
        "loaded {} records from {} ({} skipped, {} undated)",
        report.loaded_rows,
        path.display(),
        report.skipped_rows,
        report.undated_rows
    );
    Ok((records, report))
}

fn invalid_export(message: &str) -> AppError {
    AppError::internal(io::Error::new(io::ErrorKind::InvalidData, message))
}
