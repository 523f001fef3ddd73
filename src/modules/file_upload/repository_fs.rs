use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::{
    api::error,
    modules::file_upload::{
        repository::{FileRepository, FileWriter},
        schema::StoredFile,
    },
};

#[derive(Clone)]
pub struct LocalFileRepository {
    root: PathBuf,
}

impl LocalFileRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // Names reaching this point are single path segments already; joining
    // anything else would escape the upload directory.
    fn path_of(&self, name: &str) -> Result<PathBuf, error::SystemError> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(error::SystemError::invalid_filename("Filename must be a plain file name"));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait::async_trait]
impl FileRepository for LocalFileRepository {
    async fn create_new(&self, name: &str) -> Result<Option<FileWriter>, error::SystemError> {
        let path = self.path_of(name)?;

        // The directory may have been removed since startup.
        fs::create_dir_all(&self.root).await?;

        match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => {
                let writer: FileWriter = Box::pin(file);
                Ok(Some(writer))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, name: &str) -> Result<(), error::SystemError> {
        let path = self.path_of(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn find(&self, name: &str) -> Result<Option<StoredFile>, error::SystemError> {
        let path = self.path_of(name)?;
        // symlink_metadata so a link planted in the directory is never followed
        let metadata = match fs::symlink_metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(StoredFile {
            name: name.to_string(),
            size: metadata.len(),
            modified: metadata.modified().ok(),
            is_file: metadata.is_file(),
        }))
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>, error::SystemError> {
        let path = self.path_of(name)?;
        Ok(fs::read(&path).await?)
    }
}
