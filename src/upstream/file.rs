use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::UpstreamError;
use crate::upstream::SchemaSource;

/// Serves SDL from a file on disk, read on each fetch.
#[derive(Debug, Clone)]
pub struct FileSchemaSource {
    path: PathBuf,
}

impl FileSchemaSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SchemaSource for FileSchemaSource {
    async fn fetch_schema(&self) -> Result<String, UpstreamError> {
        tracing::debug!(path = %self.path.display(), "Reading schema file");
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn test_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "type Query {{ ok: Boolean }}").unwrap();

        let source = FileSchemaSource::new(file.path());
        assert_eq!(
            source.fetch_schema().await.unwrap(),
            "type Query { ok: Boolean }"
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSchemaSource::new(dir.path().join("absent.graphql"));
        assert!(matches!(
            source.fetch_schema().await,
            Err(UpstreamError::Io(_))
        ));
    }
}
