//! OCR model registry: download, verify, and atomically install model
//! files per script family.
//!
//! Layout under the model root (`<data>/ocr-models`):
//! - `det.onnx` — detection model, shared by every family
//! - `<family>/rec.onnx` — recognition model
//! - `<family>/dict.txt` — glyph dictionary
//!
//! Installs are atomic per file: the body streams into `<path>.tmp` and a
//! `rename` commits it. A family is either fully present or observably
//! absent; readers never see a half-written model.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use futures::StreamExt;
use fw_core::{Error, Result};

use crate::lang::ScriptFamily;

/// File name of the shared detection model.
const DET_MODEL: &str = "det.onnx";
/// File name of a family's recognition model.
const REC_MODEL: &str = "rec.onnx";
/// File name of a family's glyph dictionary.
const DICT: &str = "dict.txt";

/// Resolved on-disk locations for one family's model set.
#[derive(Debug, Clone)]
pub struct OcrModelPaths {
    /// Text detection model, shared across families. Declared here even
    /// though the current engine detects lines by row scan.
    pub detection_model: PathBuf,
    /// Recognition model for this family.
    pub recognition_model: PathBuf,
    /// Ordered glyph dictionary for this family.
    pub dictionary: PathBuf,
}

/// Downloads and installs model sets; cheap to share behind an `Arc`.
pub struct ModelRegistry {
    root: PathBuf,
    base_url: String,
    client: reqwest::Client,
    /// Serializes every filesystem commit. Download I/O is not the
    /// bottleneck, so one process-wide lock keeps the install logic simple.
    download_lock: Mutex<()>,
}

impl ModelRegistry {
    /// Create a registry rooted at `<data_dir>/ocr-models`.
    pub fn new(data_dir: &Path, base_url: impl Into<String>) -> Self {
        Self {
            root: data_dir.join("ocr-models"),
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            download_lock: Mutex::new(()),
        }
    }

    /// On-disk paths for a family, whether or not the files exist yet.
    pub fn paths(&self, family: ScriptFamily) -> OcrModelPaths {
        let family_dir = self.root.join(family.dir_name());
        OcrModelPaths {
            detection_model: self.root.join(DET_MODEL),
            recognition_model: family_dir.join(REC_MODEL),
            dictionary: family_dir.join(DICT),
        }
    }

    /// True when all three files of a family are installed.
    pub fn has_models(&self, family: ScriptFamily) -> bool {
        let paths = self.paths(family);
        paths.detection_model.exists()
            && paths.recognition_model.exists()
            && paths.dictionary.exists()
    }

    /// Ensure a family's model set is installed, downloading what is
    /// missing.
    ///
    /// Concurrent callers serialize on the download lock; whoever arrives
    /// second re-checks and usually finds the files already present. No
    /// retries here — failures surface to the caller, and the next startup
    /// simply tries again.
    pub async fn ensure(&self, family: ScriptFamily, cancel: &CancellationToken) -> Result<()> {
        if self.has_models(family) {
            return Ok(());
        }

        let _guard = self.download_lock.lock().await;
        if self.has_models(family) {
            return Ok(());
        }

        tracing::info!(%family, "downloading OCR models");
        let paths = self.paths(family);

        let files = [
            (format!("{}/{DET_MODEL}", self.base_url), paths.detection_model),
            (
                format!("{}/{}/{REC_MODEL}", self.base_url, family.dir_name()),
                paths.recognition_model,
            ),
            (
                format!("{}/{}/{DICT}", self.base_url, family.dir_name()),
                paths.dictionary,
            ),
        ];

        for (url, dest) in files {
            if dest.exists() {
                continue;
            }
            self.download_file(&url, &dest, cancel).await?;
        }

        tracing::info!(%family, "OCR models installed");
        Ok(())
    }

    /// Ensure the families most subtitles need (Latin + CJK).
    pub async fn ensure_common(&self, cancel: &CancellationToken) -> Result<()> {
        for family in ScriptFamily::COMMON {
            self.ensure(family, cancel).await?;
        }
        Ok(())
    }

    /// Ensure every supported family.
    pub async fn ensure_all(&self, cancel: &CancellationToken) -> Result<()> {
        for family in ScriptFamily::ALL {
            self.ensure(family, cancel).await?;
        }
        Ok(())
    }

    /// Stream one URL into `<dest>.tmp`, then rename into place.
    async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = tmp_path(dest);
        let result = self.stream_to_file(url, &tmp, cancel).await;

        match result {
            Ok(()) => {
                tokio::fs::rename(&tmp, dest).await?;
                tracing::debug!(url, dest = %dest.display(), "model file installed");
                Ok(())
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                Err(e)
            }
        }
    }

    async fn stream_to_file(
        &self,
        url: &str,
        tmp: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Http(format!("GET {url}: {e}")))?;

        let mut file = tokio::fs::File::create(tmp).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let chunk = chunk.map_err(|e| Error::Http(format!("GET {url}: {e}")))?;
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(())
    }
}

/// `<path>.tmp`, preserving the original extension.
fn tmp_path(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_layout() {
        let registry = ModelRegistry::new(Path::new("/data"), "http://example/models");
        let paths = registry.paths(ScriptFamily::Korean);

        assert_eq!(paths.detection_model, Path::new("/data/ocr-models/det.onnx"));
        assert_eq!(
            paths.recognition_model,
            Path::new("/data/ocr-models/korean/rec.onnx")
        );
        assert_eq!(paths.dictionary, Path::new("/data/ocr-models/korean/dict.txt"));
    }

    #[test]
    fn tmp_path_appends_suffix() {
        assert_eq!(
            tmp_path(Path::new("/data/ocr-models/det.onnx")),
            Path::new("/data/ocr-models/det.onnx.tmp")
        );
    }

    #[test]
    fn has_models_requires_all_three() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path(), "http://example");
        let family = ScriptFamily::Latin;
        assert!(!registry.has_models(family));

        let paths = registry.paths(family);
        std::fs::create_dir_all(paths.recognition_model.parent().unwrap()).unwrap();
        std::fs::write(&paths.detection_model, b"det").unwrap();
        std::fs::write(&paths.recognition_model, b"rec").unwrap();
        assert!(!registry.has_models(family));

        std::fs::write(&paths.dictionary, b"a\nb\n").unwrap();
        assert!(registry.has_models(family));
    }

    #[tokio::test]
    async fn ensure_short_circuits_when_present() {
        let dir = tempfile::tempdir().unwrap();
        // Unroutable base URL: any actual download attempt would fail.
        let registry = ModelRegistry::new(dir.path(), "http://invalid.localdomain");
        let family = ScriptFamily::Latin;

        let paths = registry.paths(family);
        std::fs::create_dir_all(paths.recognition_model.parent().unwrap()).unwrap();
        std::fs::write(&paths.detection_model, b"det").unwrap();
        std::fs::write(&paths.recognition_model, b"rec").unwrap();
        std::fs::write(&paths.dictionary, b"a\n").unwrap();

        registry
            .ensure(family, &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_ensure_leaves_no_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path(), "http://invalid.localdomain");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = registry.ensure(ScriptFamily::Latin, &cancel).await;
        assert!(result.is_err());
        assert!(!registry.has_models(ScriptFamily::Latin));
        // No stray .tmp files either.
        let leftovers: Vec<_> = walk(dir.path());
        assert!(leftovers.is_empty(), "unexpected files: {leftovers:?}");
    }

    fn walk(dir: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let Ok(entries) = std::fs::read_dir(dir) else {
            return files;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(walk(&path));
            } else {
                files.push(path);
            }
        }
        files
    }
}
