//! Core module - repository, project and configuration types

pub mod config;
pub mod identity;
pub mod mimetype;
pub mod project;
pub mod repository;
pub mod store;
pub mod upload;
pub mod workflow;

pub use config::Config;
pub use identity::{NodeRef, NodeRefParseError};
pub use mimetype::MimetypeMap;
pub use project::{Project, ProjectError};
pub use repository::{in_transaction, ContentRepository, NodeKind, NodeRecord, RepositoryError};
pub use store::FsRepository;
pub use upload::{UploadError, UploadSlot, UploadStore, UploadedFile};
pub use workflow::{WorkflowCatalog, WorkflowDefinition};
