pub mod delete;
pub mod media;
pub mod upload;

pub use delete::{DeleteOutcome, DeleteReport, RemoteFileInfo};
pub use media::{Artifact, ArtifactKind, MediaCategory, RemoteObjectRef, TranscodeOutput};
pub use upload::{FileSource, StagedFile, UploadRequest};
