use std::pin::Pin;

use tokio::io::AsyncWrite;

use crate::{api::error, modules::file_upload::schema::StoredFile};

pub type FileWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// Flat store of uploaded files addressed by their storage name.
#[async_trait::async_trait]
pub trait FileRepository {
    /// Creates `name` exclusively. Returns `None` when an entry with that name
    /// already exists.
    async fn create_new(&self, name: &str) -> Result<Option<FileWriter>, error::SystemError>;

    async fn remove(&self, name: &str) -> Result<(), error::SystemError>;

    async fn find(&self, name: &str) -> Result<Option<StoredFile>, error::SystemError>;

    async fn read(&self, name: &str) -> Result<Vec<u8>, error::SystemError>;
}
