//! Data models for content installation

pub mod content;
pub mod install_result;

pub use content::{
    ContentBundle, FieldKind, FieldOption, FieldSpec, FieldValue, NewRecord, RecordDefinition,
    RecordFields, RecordStatus, RemoteRecord, TypeDefinition,
};
pub use install_result::{InstallOutcome, InstallSummary, ItemError};
