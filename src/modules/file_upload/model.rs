use crate::constants::{Env, ALLOWED_MIME_TYPES, MAX_FILE_SIZE};

/// File upload configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_file_size: u64,
    pub allowed_mime_types: Vec<String>,
    pub base_url: String,
}

impl UploadConfig {
    pub fn from_env(env: &Env) -> Self {
        Self { max_file_size: env.max_file_size, base_url: env.base_url.clone(), ..Default::default() }
    }

    pub fn allows(&self, mime_type: &str) -> bool {
        self.allowed_mime_types.iter().any(|allowed| allowed.eq_ignore_ascii_case(mime_type))
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            allowed_mime_types: ALLOWED_MIME_TYPES.iter().map(|m| m.to_string()).collect(),
            base_url: "http://localhost:5500".to_string(),
        }
    }
}

/// File received from a multipart field, before it is written.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub mime_type: String,
}
