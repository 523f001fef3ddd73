use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Filesystem entry inside the upload directory
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_file: bool,
}

/// File upload response DTO
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadResponse {
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    pub mimetype: String,
    pub url: String,
}
