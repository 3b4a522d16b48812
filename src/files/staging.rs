use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// An uploaded workbook written to the upload directory for the duration of one request.
///
/// The file is removed by [`StagedUpload::discard`]; if the request is dropped before
/// that (cancellation, panic), the inner `NamedTempFile` removes it on drop instead.
pub struct StagedUpload {
    file: NamedTempFile,
}

impl StagedUpload {
    /// Writes `body` to a fresh file in `dir`, keeping the extension of `file_name`
    /// so the workbook reader can tell the format.
    pub fn stage(dir: &Path, file_name: Option<&str>, body: &[u8]) -> std::io::Result<Self> {
        let suffix = file_name
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_else(|| ".xlsx".into());

        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(dir)?;
        file.write_all(body)?;
        file.flush()?;
        debug!(path = %file.path().display(), bytes = body.len(), "staged upload");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Deletes the staged file.
    pub fn discard(self) {
        let path: PathBuf = self.file.path().to_path_buf();
        if let Err(e) = self.file.close() {
            warn!(error = %e, path = %path.display(), "failed to remove staged upload");
        }
    }
}
