pub mod handle;
pub mod model;
pub mod repository;
pub mod repository_fs;
pub mod route;
pub mod schema;
pub mod service;

pub use model::UploadConfig;
pub use repository_fs::LocalFileRepository;
pub use service::FileUploadService;
