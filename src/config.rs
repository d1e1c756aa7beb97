use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{LedgerError, Result};
use crate::ledger::DEFAULT_INTEGRATION_NAME;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct LedgerRequest {
    pub source_path: Option<String>,
    pub output_path: Option<String>,
    pub integration_name: Option<String>,
}

/// Validated settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub integration_name: String,
}

fn resolve_required_path(raw: Option<String>, what: &str) -> Result<PathBuf> {
    let path = raw.unwrap_or_default().trim().to_string();
    if path.is_empty() {
        return Err(LedgerError::InvalidInput(format!("{what} is required")));
    }
    Ok(PathBuf::from(path))
}

fn resolve_integration_name(raw: Option<String>) -> String {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_INTEGRATION_NAME.to_string())
}

impl LedgerRequest {
    pub fn resolve(self) -> Result<LedgerConfig> {
        let source_path = resolve_required_path(
            self.source_path,
            "source_path (an .eml file or a directory of .eml files)",
        )?;
        let output_path = resolve_required_path(self.output_path, "output_path")?;
        if output_path.is_dir() {
            return Err(LedgerError::InvalidInput(format!(
                "output_path is a directory: {}",
                output_path.to_string_lossy()
            )));
        }
        Ok(LedgerConfig {
            source_path,
            output_path,
            integration_name: resolve_integration_name(self.integration_name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_integration_name() {
        let cfg = LedgerRequest {
            source_path: Some(" mails ".to_string()),
            output_path: Some("out.csv".to_string()),
            integration_name: Some("   ".to_string()),
        }
        .resolve()
        .expect("resolve");
        assert_eq!(cfg.source_path, PathBuf::from("mails"));
        assert_eq!(cfg.integration_name, "Robinhood");
    }

    #[test]
    fn requires_both_paths() {
        let err = LedgerRequest {
            output_path: Some("out.csv".to_string()),
            ..LedgerRequest::default()
        }
        .resolve()
        .expect_err("missing source");
        assert!(err.to_string().contains("source_path"));

        let err = LedgerRequest {
            source_path: Some("mails".to_string()),
            ..LedgerRequest::default()
        }
        .resolve()
        .expect_err("missing output");
        assert!(err.to_string().contains("output_path"));
    }

    #[test]
    fn deserializes_from_json() {
        let req: LedgerRequest = serde_json::from_str(
            r#"{"source_path":"mails","output_path":"ledger.csv","integration_name":"Robinhood EU"}"#,
        )
        .expect("json");
        let cfg = req.resolve().expect("resolve");
        assert_eq!(cfg.integration_name, "Robinhood EU");
        assert_eq!(cfg.output_path, PathBuf::from("ledger.csv"));
    }

    #[test]
    fn rejects_directory_as_output() {
        let err = LedgerRequest {
            source_path: Some("mails".to_string()),
            output_path: Some(std::env::temp_dir().to_string_lossy().to_string()),
            integration_name: None,
        }
        .resolve()
        .expect_err("dir output");
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }
}
