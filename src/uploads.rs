//! Per-user image storage: `<upload_root>/<user_id>/<millis>-<random>.<ext>`.

use std::path::PathBuf;

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Only JPEG, PNG and WebP images are accepted")]
    UnsupportedType,

    #[error("Uploaded file is empty")]
    Empty,

    #[error("File is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("Image not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Image formats the analyzer accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    /// Detect from magic bytes, never from the client's name or header.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

/// What the upload endpoint reports back.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUpload {
    pub filename: String,
    pub original_name: String,
    pub size: usize,
    pub mimetype: String,
    /// Reference to pass to the analyzer; also where the file is served.
    pub url: String,
}

/// Image bytes loaded back from the store.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub bytes: Vec<u8>,
    pub kind: ImageKind,
}

pub struct UploadStore {
    root: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(root: PathBuf, max_bytes: usize) -> Self {
        Self { root, max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    fn user_dir(&self, user_id: &Uuid) -> PathBuf {
        self.root.join(user_id.to_string())
    }

    /// Validate and write an uploaded image under a fresh unique name.
    pub fn save(
        &self,
        user_id: &Uuid,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredUpload, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }
        let kind = ImageKind::sniff(bytes).ok_or(UploadError::UnsupportedType)?;

        let dir = self.user_dir(user_id);
        std::fs::create_dir_all(&dir)?;

        let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
        let filename = format!(
            "{}-{suffix}.{}",
            Utc::now().timestamp_millis(),
            kind.extension()
        );
        std::fs::write(dir.join(&filename), bytes)?;

        tracing::info!(
            user_id = %user_id,
            filename = %filename,
            size = bytes.len(),
            mime = kind.mime_type(),
            "Upload stored"
        );

        Ok(StoredUpload {
            url: format!("/uploads/{user_id}/{filename}"),
            filename,
            original_name: display_name(original_name),
            size: bytes.len(),
            mimetype: kind.mime_type().to_string(),
        })
    }

    /// Load the image an analyzer reference points at.
    ///
    /// Only the final path component of `reference` is used, looked up in
    /// the caller's own directory, so a reference can never reach outside it.
    pub fn resolve(&self, user_id: &Uuid, reference: &str) -> Result<LoadedImage, UploadError> {
        let name = reference_file_name(reference)
            .ok_or_else(|| UploadError::NotFound(reference.to_string()))?;
        let bytes = self.read_file(user_id, name)?;
        // Anything that made it through `save` sniffs cleanly; files placed
        // by other means are sent as JPEG.
        let kind = ImageKind::sniff(&bytes).unwrap_or(ImageKind::Jpeg);
        Ok(LoadedImage { bytes, kind })
    }

    /// Read a stored file by bare name from `user_id`'s directory.
    pub fn read_file(&self, user_id: &Uuid, filename: &str) -> Result<Vec<u8>, UploadError> {
        if !is_plain_file_name(filename) {
            return Err(UploadError::NotFound(filename.to_string()));
        }
        let path = self.user_dir(user_id).join(filename);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(UploadError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Final `/`-separated component of a path or URL, minus any query string.
fn reference_file_name(reference: &str) -> Option<&str> {
    let without_query = reference.split(['?', '#']).next().unwrap_or(reference);
    let name = without_query.rsplit('/').next()?;
    is_plain_file_name(name).then_some(name)
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Client-supplied name, reduced to its last component for display.
fn display_name(original: &str) -> String {
    let name = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .replace('\0', "");
    let name: String = name.chars().take(255).collect();
    if name.is_empty() {
        "image".to_string()
    } else {
        name
    }
}
