// harmonia-core/src/ports/mod.rs

pub mod sink;
pub mod source;

pub use sink::{Artifact, AuditSink};
pub use source::SourceReader;
