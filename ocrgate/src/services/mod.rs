mod artifacts;

pub use artifacts::{ArtifactRecorder, ArtifactTarget, DEFAULT_FILENAME};
