//! Template loading and rendering of generated Go files

mod kind;
mod manager;

pub use kind::ArtifactKind;
pub use manager::TemplateManager;
