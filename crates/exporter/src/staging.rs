use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ExportError;
use crate::settings::OutputFormat;

/// Where a stream's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSource {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// A named transcoder input. `name` is both the staged file name and the
/// basis for media-type detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub name: String,
    pub source: StreamSource,
}

impl Stream {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            source: StreamSource::Bytes(bytes),
        }
    }

    /// Stream backed by a file on disk, named after the file
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow::anyhow!("Input path has no usable file name: {:?}", path))?;

        Ok(Self {
            name: name.to_string(),
            source: StreamSource::File(path.to_path_buf()),
        })
    }

    /// Same stream under a different staged name
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Rename to `input-<name>` when the name would shadow a transcoder
    /// output file such as `output.mp4`
    pub fn clear_of_outputs(self) -> Self {
        if is_output_name(&self.name) {
            let name = format!("input-{}", self.name);
            self.renamed(name)
        } else {
            self
        }
    }
}

/// Per-export scratch directory the transcoder reads inputs from and writes
/// `output.<ext>` into. Removed on drop unless kept.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    staged: Vec<String>,
    keep: bool,
    removed: bool,
}

impl Workspace {
    /// Create a fresh `clipcut-<uuid>` directory under `root`
    pub fn create(root: &Path) -> Result<Self> {
        let dir = root.join(format!("clipcut-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create staging directory {}", dir.display()))?;
        debug!("Created staging directory {:?}", dir);

        Ok(Self {
            dir,
            staged: Vec::new(),
            keep: false,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Keep the directory on disk after drop, for debugging failed exports
    pub fn set_keep(&mut self, keep: bool) {
        self.keep = keep;
    }

    pub fn staged(&self) -> &[String] {
        &self.staged
    }

    /// Copy a stream's bytes into the workspace under `stream.name`
    pub async fn stage(&mut self, stream: &Stream) -> Result<PathBuf> {
        validate_stream_name(&stream.name)?;
        if self.staged.iter().any(|n| n == &stream.name) {
            return Err(ExportError::DuplicateStream(stream.name.clone()).into());
        }

        let dest = self.dir.join(&stream.name);
        match &stream.source {
            StreamSource::Bytes(bytes) => {
                tokio::fs::write(&dest, bytes)
                    .await
                    .with_context(|| format!("Failed to stage {}", stream.name))?;
            }
            StreamSource::File(src) => {
                tokio::fs::copy(src, &dest)
                    .await
                    .with_context(|| format!("Failed to stage {} from {}", stream.name, src.display()))?;
            }
        }

        debug!("Staged {} into {:?}", stream.name, self.dir);
        self.staged.push(stream.name.clone());
        Ok(dest)
    }

    pub fn output_path(&self, format: OutputFormat) -> PathBuf {
        self.dir.join(format.output_file_name())
    }

    pub async fn read_output(&self, format: OutputFormat) -> Result<Vec<u8>> {
        let path = self.output_path(format);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read transcoder output {}", path.display()))
    }

    /// Remove the directory now instead of on drop
    pub fn cleanup(mut self) -> Result<()> {
        self.removed = true;
        std::fs::remove_dir_all(&self.dir)
            .with_context(|| format!("Failed to remove staging directory {}", self.dir.display()))
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.keep || self.removed {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            warn!("Failed to remove staging directory {:?}: {}", self.dir, e);
        }
    }
}

fn is_output_name(name: &str) -> bool {
    OutputFormat::ALL
        .iter()
        .any(|f| f.output_file_name() == name)
}

/// Staged names must be plain file names that cannot shadow an output file
fn validate_stream_name(name: &str) -> Result<(), ExportError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || is_output_name(name);

    if invalid {
        Err(ExportError::InvalidStreamName(name.to_string()))
    } else {
        Ok(())
    }
}
