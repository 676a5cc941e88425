//! Local delivery of finished documents and user-facing alerts.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Receives a finished document (the browser download in the web client).
pub trait DownloadSink: Send + Sync {
    /// Store `bytes` under `filename`; returns where it went.
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Writes documents into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create a sink writing into `dir` (created on first save).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        // Keep only the final component so a filename cannot escape the directory
        let name = Path::new(filename)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "documento.pdf".into());
        let path = self.dir.join(name);
        std::fs::write(&path, bytes)?;
        log::info!("saved {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

/// Shows blocking alerts for fatal export failures.
pub trait Notifier: Send + Sync {
    /// Alert the user.
    fn alert(&self, message: &str);
}

/// [`Notifier`] that writes alerts to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn alert(&self, message: &str) {
        log::error!("{}", message);
    }
}
