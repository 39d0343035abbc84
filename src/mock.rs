use std::{io, path::PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MockError {
    #[error("unable to read mock file `{path}`")]
    Read { path: PathBuf, #[source] source: io::Error },
    #[error("mock file `{path}` is not valid JSON")]
    Parse { path: PathBuf, #[source] source: serde_json::Error },
}

/// Static JSON fixtures served instead of talking to n8n when `MOCK=1`
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    dir: Option<PathBuf>,
}

impl MockSource {
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: Some(dir.into()) }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Loads `file` from the fixture directory. `None` when mock mode is off.
    pub async fn load(&self, file: &str) -> Option<Result<Value, MockError>> {
        let dir = self.dir.as_ref()?;
        let path = dir.join(file);

        debug!(path = %path.display(), "Serving mock fixture");

        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(source) => return Some(Err(MockError::Read { path, source })),
        };

        Some(serde_json::from_str(&text).map_err(|source| MockError::Parse { path, source }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[actix_web::test]
    async fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("balance.json"), r#"{"ok":true}"#).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();

        let source = MockSource::from_dir(dir.path());
        assert!(source.is_enabled());
        assert_eq!(source.load("balance.json").await.unwrap().unwrap(), json!({ "ok": true }));
        assert!(matches!(source.load("broken.json").await, Some(Err(MockError::Parse { .. }))));
        assert!(matches!(source.load("missing.json").await, Some(Err(MockError::Read { .. }))));

        assert!(MockSource::disabled().load("balance.json").await.is_none());
    }

    #[actix_web::test]
    async fn test_bundled_fixtures_parse() {
        let source = MockSource::from_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/mock"));

        for file in ["applied.json", "balance.json", "history.json"] {
            assert!(source.load(file).await.unwrap().is_ok(), "{file}");
        }
    }
}
