//! Output artifact persistence.
//!
//! The pipeline never touches the filesystem directly: it hands
//! `(filename, content)` pairs to an [`ArtifactWriter`]. The filesystem
//! implementation creates directories, appends the trailing newline, and
//! resolves filename collisions deterministically instead of overwriting.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Destination for the transcript artifacts a run produces.
pub trait ArtifactWriter {
    /// Persist the run's aggregate transcript at its configured destination.
    fn write_primary(&mut self, content: &str) -> Result<PathBuf>;

    /// Persist one per-chunk artifact under the output directory.
    ///
    /// `filename` must be a plain file name; implementations resolve
    /// collisions rather than silently overwrite.
    fn write_chunk(&mut self, filename: &str, content: &str) -> Result<PathBuf>;
}

/// Filesystem-backed writer rooted at the run's output path.
pub struct FsWriter {
    output_path: PathBuf,
    output_dir: PathBuf,
    /// Names handed out during this run, so repeated renders of the same
    /// template value get distinct `__N` suffixes.
    allocated: HashMap<String, u32>,
}

impl FsWriter {
    /// Create a writer for the configured aggregate output path. Chunk
    /// artifacts land in the same directory.
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        let output_path = output_path.into();
        let output_dir = output_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            output_path,
            output_dir,
            allocated: HashMap::new(),
        }
    }

    fn ensure_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir).map_err(|err| {
            Error::io(
                &self.output_dir,
                format!("failed to create output directory: {err}"),
                "the output directory must exist before artifacts can be written",
                "check permissions and the configured output path",
            )
        })
    }

    fn persist(&self, path: &Path, content: &str) -> Result<()> {
        fs::write(path, format!("{content}\n")).map_err(|err| {
            Error::io(
                path,
                format!("failed to write transcript: {err}"),
                "the computed transcript could not be persisted",
                "check free space and permissions on the output directory",
            )
        })
    }

    /// Resolve collisions deterministically using numbered suffixes:
    /// `name.txt`, `name__1.txt`, `name__2.txt`, ...
    fn resolve_collision(&mut self, filename: &str) -> String {
        let base = Path::new(filename);
        let stem = base
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_owned());
        let suffix = base
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let mut attempt = self.allocated.get(filename).copied().unwrap_or(0);
        loop {
            let candidate = if attempt == 0 {
                filename.to_owned()
            } else {
                format!("{stem}__{attempt}{suffix}")
            };
            let exists_on_disk = self.output_dir.join(&candidate).exists();
            if !self.allocated.contains_key(&candidate) && !exists_on_disk {
                self.allocated.insert(candidate.clone(), 1);
                self.allocated.insert(filename.to_owned(), attempt + 1);
                return candidate;
            }
            attempt += 1;
        }
    }
}

impl ArtifactWriter for FsWriter {
    fn write_primary(&mut self, content: &str) -> Result<PathBuf> {
        self.ensure_output_dir()?;
        self.persist(&self.output_path, content)?;
        Ok(self.output_path.clone())
    }

    fn write_chunk(&mut self, filename: &str, content: &str) -> Result<PathBuf> {
        self.ensure_output_dir()?;
        let resolved = self.resolve_collision(filename);
        let path = self.output_dir.join(resolved);
        self.persist(&path, content)?;
        Ok(path)
    }
}

/// In-memory writer used by tests to observe what the pipeline would persist.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    pub primary: Option<String>,
    pub chunks: Vec<(String, String)>,
}

impl ArtifactWriter for MemoryWriter {
    fn write_primary(&mut self, content: &str) -> Result<PathBuf> {
        self.primary = Some(content.to_owned());
        Ok(PathBuf::from("<memory>/primary"))
    }

    fn write_chunk(&mut self, filename: &str, content: &str) -> Result<PathBuf> {
        self.chunks.push((filename.to_owned(), content.to_owned()));
        Ok(PathBuf::from("<memory>").join(filename))
    }
}
