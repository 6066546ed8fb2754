use filestore_files::FilesError;
use filestore_paths::PathError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to read config file {path}: {source}", path = path.display())]
    ConfigRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
    #[error("adapter setup failed: {0}")]
    Files(#[from] FilesError),
    #[error("path builder setup failed: {0}")]
    Path(#[from] PathError),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
