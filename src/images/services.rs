use std::collections::HashSet;

use bytes::Bytes;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::storage::object_key;

pub const ALLOWED_EXTENSIONS_MESSAGE: &str = "Only .jpg, .jpeg and .png images are allowed";

/// Body limit for every multipart upload route.
pub const UPLOAD_BODY_LIMIT: usize = 20 * 1024 * 1024;

/// A file taken from a multipart request whose extension already passed the allow-list.
#[derive(Debug)]
pub struct UploadItem {
    pub extension: String,
    pub content_type: String,
    pub body: Bytes,
}

impl UploadItem {
    pub fn new(original_name: &str, content_type: Option<&str>, body: Bytes) -> ApiResult<Self> {
        let extension = image_extension(original_name).ok_or_else(|| {
            warn!(file = original_name, "rejected upload with disallowed extension");
            ApiError::bad_request(ALLOWED_EXTENSIONS_MESSAGE)
        })?;
        let content_type = content_type
            .map(str::to_string)
            .unwrap_or_else(|| mime_from_ext(&extension).to_string());
        Ok(Self {
            extension,
            content_type,
            body,
        })
    }
}

/// Lowercased extension (with dot) if it is one of `.jpg`, `.jpeg`, `.png`.
pub fn image_extension(name: &str) -> Option<String> {
    lazy_static! {
        static ref IMAGE_EXT_RE: Regex = Regex::new(r"(?i)\.(jpe?g|png)$").unwrap();
    }
    IMAGE_EXT_RE
        .find(name)
        .map(|m| m.as_str().to_ascii_lowercase())
}

fn mime_from_ext(ext: &str) -> &'static str {
    match ext {
        ".png" => "image/png",
        _ => "image/jpeg",
    }
}

pub fn stored_filename(timestamp_ms: i128, suffix: u32, ext: &str) -> String {
    format!("{}-{}{}", timestamp_ms, suffix, ext)
}

/// Names files for one request: a shared timestamp plus a random suffix per file.
pub struct UploadBatch {
    timestamp_ms: i128,
    used: HashSet<String>,
}

impl UploadBatch {
    pub fn new() -> Self {
        Self::at(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000)
    }

    pub fn at(timestamp_ms: i128) -> Self {
        Self {
            timestamp_ms,
            used: HashSet::new(),
        }
    }

    pub fn name_for<R: Rng>(&mut self, ext: &str, rng: &mut R) -> String {
        loop {
            let name = stored_filename(self.timestamp_ms, rng.gen_range(0..1_000_000_000), ext);
            if self.used.insert(name.clone()) {
                return name;
            }
        }
    }
}

impl Default for UploadBatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes every item under `prefix` and returns the stored filenames in order.
/// If one write fails, files already written by this call are removed.
pub async fn save_images(
    st: &AppState,
    prefix: &str,
    items: Vec<UploadItem>,
) -> anyhow::Result<Vec<String>> {
    let names: Vec<String> = {
        let mut batch = UploadBatch::new();
        let mut rng = rand::thread_rng();
        items
            .iter()
            .map(|item| batch.name_for(&item.extension, &mut rng))
            .collect()
    };

    let mut saved = Vec::with_capacity(items.len());
    for (item, name) in items.into_iter().zip(names) {
        let key = object_key(prefix, &name);
        if let Err(e) = st
            .storage
            .put_object(&key, item.body, &item.content_type)
            .await
        {
            discard_images(st, prefix, &saved).await;
            return Err(e.context(format!("store {}", key)));
        }
        saved.push(name);
    }
    info!(prefix, count = saved.len(), "images stored");
    Ok(saved)
}

/// Best-effort removal; failures are logged and swallowed.
pub async fn discard_images(st: &AppState, prefix: &str, filenames: &[String]) {
    for name in filenames {
        let key = object_key(prefix, name);
        if let Err(e) = st.storage.delete_object(&key).await {
            warn!(error = %e, key, "failed to delete stored image");
        }
    }
}
