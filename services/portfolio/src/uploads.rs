//! Avatar and résumé uploads
//!
//! Storage is reached only through [`UploadStore`]: bytes go in under a
//! derived name and a public URL comes back.

use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Extensions accepted for upload, compared case-insensitively
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "pdf"];

/// Public URL prefix under which stored files are served
pub const UPLOAD_URL_PREFIX: &str = "/uploads";

pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Reduce a client filename to a safe, flat name
///
/// Path separators become spaces, whitespace runs become `_`, characters
/// outside `[A-Za-z0-9_.-]` are dropped, and leading dots and underscores are
/// stripped so the result can never escape the upload folder.
pub fn secure_filename(filename: &str) -> String {
    static UNSAFE: OnceLock<Option<Regex>> = OnceLock::new();
    let unsafe_chars = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.-]").ok());

    let flattened = filename.replace(['/', '\\'], " ");
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = match unsafe_chars {
        Some(re) => re.replace_all(&joined, "").into_owned(),
        None => joined
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
            .collect(),
    };

    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// Store bytes, return a URL
#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn store(&self, user_id: Uuid, original_name: &str, bytes: &[u8]) -> AppResult<String>;
}

/// Files in a local folder, served back under [`UPLOAD_URL_PREFIX`]
#[derive(Debug, Clone)]
pub struct LocalUploadStore {
    folder: PathBuf,
}

impl LocalUploadStore {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    async fn store(&self, user_id: Uuid, original_name: &str, bytes: &[u8]) -> AppResult<String> {
        if original_name.is_empty() {
            return Err(AppError::Validation("No selected file".to_string()));
        }
        if !allowed_file(original_name) {
            return Err(AppError::Validation("File type not allowed".to_string()));
        }

        let name = secure_filename(&format!("{}_{}", user_id, original_name));
        tokio::fs::create_dir_all(&self.folder)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create upload folder: {}", e))?;
        tokio::fs::write(self.folder.join(&name), bytes)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to store upload {}: {}", name, e))?;

        info!("Stored upload {} ({} bytes)", name, bytes.len());
        Ok(format!("{}/{}", UPLOAD_URL_PREFIX, name))
    }
}
