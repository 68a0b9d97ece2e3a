//! Upload batch: images the user added, in arrival order
//!
//! Ids are never reused, not even across [`UploadBatch::clear`], so a
//! classification result that arrives after a clear cannot land on a newer
//! upload.

use super::{classifier, ChartImage, Classification, TimeframeImageSet, UploadedImage};
use crate::vision::VisionProvider;
use std::fmt;
use std::path::{Path, PathBuf};

/// Why an image could not be added
#[derive(Debug)]
pub enum UploadError {
    /// Extension is not an accepted image type
    Unsupported { path: PathBuf },
    /// File could not be read
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// File exists but has no content
    Empty { path: PathBuf },
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported { path } => {
                write!(f, "{}: not an image (png, jpg, webp, gif)", path.display())
            }
            Self::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            Self::Empty { path } => write!(f, "{}: file is empty", path.display()),
        }
    }
}

impl std::error::Error for UploadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// MIME type for an accepted image extension
pub fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Read one image file from disk
pub async fn load_image(path: &Path) -> Result<ChartImage, UploadError> {
    let mime = mime_for(path).ok_or_else(|| UploadError::Unsupported {
        path: path.to_path_buf(),
    })?;
    let bytes = tokio::fs::read(path).await.map_err(|source| UploadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(UploadError::Empty {
            path: path.to_path_buf(),
        });
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    tracing::debug!(image = %name, bytes = bytes.len(), "Loaded image");
    Ok(ChartImage::new(name, mime, bytes))
}

/// Load many paths; failures are reported per path and never abort the rest
pub async fn load_images(paths: &[PathBuf]) -> (Vec<ChartImage>, Vec<UploadError>) {
    let mut images = Vec::new();
    let mut errors = Vec::new();
    for path in paths {
        match load_image(path).await {
            Ok(image) => images.push(image),
            Err(e) => {
                tracing::warn!("Skipping upload: {}", e);
                errors.push(e);
            }
        }
    }
    (images, errors)
}

#[derive(Debug, Default)]
pub struct UploadBatch {
    uploads: Vec<UploadedImage>,
    next_id: u64,
}

impl UploadBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an image, returning its id
    pub fn add(&mut self, image: ChartImage) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.uploads.push(UploadedImage::new(id, image));
        id
    }

    pub fn uploads(&self) -> &[UploadedImage] {
        &self.uploads
    }

    pub fn len(&self) -> usize {
        self.uploads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty()
    }

    /// Uploads still waiting for classification, in arrival order
    pub fn pending(&self) -> Vec<(u64, ChartImage)> {
        self.uploads
            .iter()
            .filter(|u| u.is_pending())
            .map(|u| (u.id, u.image.clone()))
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        self.uploads.iter().any(UploadedImage::is_pending)
    }

    /// Store a classification outcome
    ///
    /// Returns false for unknown ids (e.g. cleared) and already-classified
    /// uploads.
    pub fn record(&mut self, id: u64, outcome: Classification) -> bool {
        match self.uploads.iter_mut().find(|u| u.id == id) {
            Some(upload) => upload.record(outcome),
            None => {
                tracing::debug!(id, "Dropping classification for unknown upload");
                false
            }
        }
    }

    /// Timeframe image set from detected uploads, last write wins
    pub fn image_set(&self) -> TimeframeImageSet {
        let mut set = TimeframeImageSet::new();
        for upload in &self.uploads {
            if let Some(tf) = upload.detected_timeframe() {
                set.insert(tf, upload.image.clone());
            }
        }
        set
    }

    pub fn clear(&mut self) {
        self.uploads.clear();
    }

    /// Classify every pending upload sequentially
    ///
    /// Returns the number of uploads that were classified (detected or failed).
    pub async fn classify_pending(&mut self, provider: &dyn VisionProvider) -> usize {
        let mut classified = 0;
        for (id, image) in self.pending() {
            let outcome = classifier::classify(provider, &image).await;
            if self.record(id, outcome) {
                classified += 1;
            }
        }
        classified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Timeframe;
    use crate::vision::DemoProvider;
    use std::time::Duration;

    fn image(name: &str) -> ChartImage {
        ChartImage::new(name, "image/png", name.as_bytes().to_vec())
    }

    #[test]
    fn test_mime_detection() {
        assert_eq!(mime_for(Path::new("a/b/chart.PNG")), Some("image/png"));
        assert_eq!(mime_for(Path::new("chart.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_for(Path::new("notes.txt")), None);
        assert_eq!(mime_for(Path::new("Makefile")), None);
    }

    #[tokio::test]
    async fn test_load_rejects_non_images() {
        let err = load_image(Path::new("definitely-missing.txt")).await.unwrap_err();
        assert!(matches!(err, UploadError::Unsupported { .. }));

        let err = load_image(Path::new("definitely-missing.png")).await.unwrap_err();
        assert!(matches!(err, UploadError::Io { .. }));
    }

    #[test]
    fn test_image_set_last_detected_wins() {
        let mut batch = UploadBatch::new();
        let a = batch.add(image("a"));
        let b = batch.add(image("b"));
        let c = batch.add(image("c"));

        batch.record(a, Classification::Detected(Timeframe::H1));
        batch.record(b, Classification::Failed("nope".to_string()));
        batch.record(c, Classification::Detected(Timeframe::H1));

        let set = batch.image_set();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(Timeframe::H1).map(|i| i.name.as_str()), Some("c"));
    }

    #[test]
    fn test_ids_survive_clear() {
        let mut batch = UploadBatch::new();
        let old = batch.add(image("old"));
        batch.clear();
        let new = batch.add(image("new"));

        assert_ne!(old, new);
        assert!(!batch.record(old, Classification::Detected(Timeframe::H4)));
        assert!(batch.uploads()[0].is_pending());
    }

    #[tokio::test]
    async fn test_classify_pending_only_once() {
        let provider = DemoProvider::new(Duration::ZERO);
        let mut batch = UploadBatch::new();
        batch.add(image("btc_4h.png"));
        batch.add(image("screenshot.png"));

        assert_eq!(batch.classify_pending(&provider).await, 2);
        assert!(!batch.has_pending());
        assert_eq!(batch.uploads()[0].detected_timeframe(), Some(Timeframe::H4));
        assert!(batch.uploads()[1]
            .classification_error()
            .is_some_and(|e| e.contains("unknown")));

        batch.add(image("btc_5min.png"));
        assert_eq!(batch.classify_pending(&provider).await, 1);
        assert_eq!(batch.image_set().len(), 2);
    }
}
