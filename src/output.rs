// Result persistence - timestamped JSON and markdown files

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// `<prefix>_YYYYMMDD_HHMMSS.<extension>`
pub fn timestamped_name(prefix: &str, extension: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}.{}", prefix, at.format("%Y%m%d_%H%M%S"), extension)
}

/// Serialize `value` as pretty JSON into `dir`, creating it if needed
pub async fn save_json<T: Serialize>(dir: &Path, prefix: &str, value: &T) -> Result<PathBuf> {
    let body = serde_json::to_string_pretty(value)?;
    write(dir, &timestamped_name(prefix, "json", Utc::now()), body).await
}

/// Write a text document (markdown reports) into `dir`
pub async fn save_text(dir: &Path, prefix: &str, extension: &str, body: &str) -> Result<PathBuf> {
    write(dir, &timestamped_name(prefix, extension, Utc::now()), body.to_string()).await
}

async fn write(dir: &Path, name: &str, body: String) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(name);
    tokio::fs::write(&path, body).await?;
    info!("Saved {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_timestamped_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(timestamped_name("result", "json", at), "result_20240309_070501.json");
    }

    #[tokio::test]
    async fn test_save_json_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("results");

        let path = save_json(&nested, "result", &json!({ "score": 8.5 })).await.unwrap();
        assert!(path.starts_with(&nested));

        let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["score"], 8.5);
    }

    #[tokio::test]
    async fn test_save_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_text(dir.path(), "report", "md", "# Report\n").await.unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("md"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# Report\n");
    }
}
