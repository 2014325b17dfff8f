//! Materialization of inline certificate material into files
//!
//! TLS backends want certificate and key material as files. When the client is
//! handed inline PEM content (directly or through a kubeconfig), the content is
//! written out through a [`FileMaterializer`] and the resulting path is used.

use crate::{Error, Result};
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of every materialized file name
pub const FILE_PREFIX: &str = "kubernetes-client-";

/// Writes named content somewhere on disk and returns its path
pub trait FileMaterializer: Debug + Send + Sync {
    fn materialize(&self, name: &str, content: &[u8]) -> Result<PathBuf>;
}

/// Materializer writing uniquely named files into a directory
#[derive(Debug, Clone)]
pub struct TempDirMaterializer {
    dir: PathBuf,
}

impl TempDirMaterializer {
    /// Use `dir`, which must be an existing directory
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(Error::Configuration(format!(
                "{} is not a valid directory",
                dir.display()
            )));
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Default for TempDirMaterializer {
    /// Materialize into the system temporary directory
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir(),
        }
    }
}

impl FileMaterializer for TempDirMaterializer {
    fn materialize(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let file_name = format!("{}{}-{}", FILE_PREFIX, name, uuid::Uuid::new_v4().simple());
        let path = self.dir.join(file_name);

        fs::write(&path, content).map_err(|e| {
            Error::Configuration(format!(
                "Failed to write content to temp file {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!("Materialized {} into {}", name, path.display());
        Ok(path)
    }
}

/// Return `value` untouched when it names an existing file, otherwise write it out
pub fn materialize_if_inline(
    materializer: &dyn FileMaterializer,
    name: &str,
    value: &str,
) -> Result<PathBuf> {
    let candidate = Path::new(value);
    if candidate.is_file() {
        return Ok(candidate.to_path_buf());
    }
    materializer.materialize(name, value.as_bytes())
}
