use actix_web::web::Bytes;
use futures_util::{Stream, TryStreamExt};
use std::io;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use crate::api::error;
use crate::constants::{MAX_NAME_ATTEMPTS, MULTIPART_OVERHEAD};
use crate::modules::file_upload::{
    model::{IncomingFile, UploadConfig},
    repository::{FileRepository, FileWriter},
    schema::{FileUploadResponse, StoredFile},
};
use crate::utils::{generate_storage_name, requested_filename};

#[derive(Clone)]
pub struct FileUploadService<R>
where
    R: FileRepository + Send + Sync,
{
    file_repo: Arc<R>,
    config: UploadConfig,
}

impl<R> FileUploadService<R>
where
    R: FileRepository + Send + Sync,
{
    pub fn new(file_repo: Arc<R>, config: UploadConfig) -> Self {
        log::info!(
            "FileUploadService initialized (max {} bytes, {} allowed types)",
            config.max_file_size,
            config.allowed_mime_types.len()
        );
        Self { file_repo, config }
    }

    fn too_large(&self) -> error::SystemError {
        error::SystemError::PayloadTooLarge { limit: self.config.max_file_size }
    }

    /// Rejects a request whose declared body length cannot possibly hold an
    /// acceptable file, before any of it is parsed.
    pub fn check_declared_length(&self, declared: Option<u64>) -> Result<(), error::SystemError> {
        match declared {
            Some(len) if len > self.config.max_file_size.saturating_add(MULTIPART_OVERHEAD) => {
                Err(self.too_large())
            }
            _ => Ok(()),
        }
    }

    /// Check MIME type against the allow-list
    fn validate_mime_type(&self, mime_type: &str) -> Result<(), error::SystemError> {
        if !self.config.allows(mime_type) {
            return Err(error::SystemError::validation(format!(
                "File type '{}' is not allowed",
                mime_type
            )));
        }
        Ok(())
    }

    pub fn file_url(&self, filename: &str) -> String {
        format!("{}/api/files/{}", self.config.base_url, urlencoding::encode(filename))
    }

    /// Picks a storage name and creates it exclusively, retrying on the
    /// unlikely chance the name is already taken.
    async fn reserve(&self, original_name: &str) -> Result<(String, FileWriter), error::SystemError> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = generate_storage_name(original_name, chrono::Utc::now());
            if let Some(writer) = self.file_repo.create_new(&name).await? {
                return Ok((name, writer));
            }
            log::warn!("Storage name {} already taken, retrying", name);
        }
        Err(io::Error::new(io::ErrorKind::AlreadyExists, "Could not allocate a unique storage name")
            .into())
    }

    /// Write chunks through to disk, enforcing the size ceiling as they arrive
    async fn write_stream<S, E>(
        &self,
        writer: &mut FileWriter,
        stream: S,
    ) -> Result<u64, error::SystemError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        error::SystemError: From<E>,
    {
        let mut stream = std::pin::pin!(stream);
        let mut written: u64 = 0;

        while let Some(chunk) = stream.try_next().await? {
            written += chunk.len() as u64;
            if written > self.config.max_file_size {
                return Err(self.too_large());
            }
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;

        Ok(written)
    }

    /// Validate, store and describe one uploaded file
    pub async fn upload_file<S, E>(
        &self,
        incoming: IncomingFile,
        stream: S,
    ) -> Result<FileUploadResponse, error::SystemError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        error::SystemError: From<E>,
    {
        self.validate_mime_type(&incoming.mime_type)?;

        let (filename, mut writer) = self.reserve(&incoming.original_name).await?;
        let written = self.write_stream(&mut writer, stream).await;
        drop(writer);

        let size = match written {
            Ok(size) => size,
            Err(e) => {
                self.discard(&filename).await;
                return Err(e);
            }
        };

        log::info!("Stored {} ({} bytes, {})", filename, size, incoming.mime_type);

        Ok(FileUploadResponse {
            url: self.file_url(&filename),
            filename,
            original_name: incoming.original_name,
            size,
            mimetype: incoming.mime_type,
        })
    }

    /// Remove a stored file after a failed request. Failures are only logged
    /// since the request is already failing with its own error.
    pub async fn discard(&self, filename: &str) {
        if let Err(e) = self.file_repo.remove(filename).await {
            log::warn!("Failed to remove {} after aborted upload: {}", filename, e);
        }
    }

    /// Resolve a requested filename to a regular file and read it
    pub async fn get_file(
        &self,
        raw_name: &str,
    ) -> Result<(StoredFile, Vec<u8>), error::SystemError> {
        let name = requested_filename(raw_name)?;

        let file = self
            .file_repo
            .find(name)
            .await?
            .ok_or_else(|| error::SystemError::not_found("File not found"))?;

        if !file.is_file {
            return Err(error::SystemError::invalid_file("Requested path is not a regular file"));
        }

        let bytes = self.file_repo.read(name).await?;
        Ok((file, bytes))
    }
}
