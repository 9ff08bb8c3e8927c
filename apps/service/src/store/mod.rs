/// Check record storage
///
/// The worker only lists, reads and updates records. Creating and deleting
/// them belongs to the API layer that owns the same directory.

pub mod repository;

pub use repository::{CheckStore, FileCheckStore};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not list checks in {}: {source}", .dir.display())]
    List { dir: PathBuf, source: io::Error },
    #[error("could not read check {id}: {source}")]
    Read { id: String, source: io::Error },
    #[error("check {id} is not valid JSON: {source}")]
    Parse { id: String, source: serde_json::Error },
    #[error("could not serialize check {id}: {source}")]
    Serialize { id: String, source: serde_json::Error },
    #[error("could not write check {id}: {source}")]
    Write { id: String, source: io::Error },
    #[error("check {0} does not exist")]
    NotFound(String),
    #[error("'{0}' cannot be used as a check id")]
    InvalidId(String),
}
