use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubwrapError {
    #[error("'{}' is not an accessible directory", .0.display())]
    InvalidDirectory(PathBuf),
    #[error("'{}' is not valid UTF-8", .0.display())]
    NotUtf8(PathBuf),
    #[error("'{}' is read-only", .0.display())]
    ReadOnly(PathBuf),
    #[error("Failed to create backup archive '{}'", .0.display())]
    Archive(PathBuf),
}
