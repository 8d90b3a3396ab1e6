//! v1 API data transfer objects.
//!
//! OCR jobs use the domain types from `crate::models` directly on the wire
//! (`JobRequest`, `JobResponse`). The types here cover the queue and the
//! result store, whose storage shapes differ from what clients see.

pub mod jobs;
pub mod results;

pub use jobs::*;
pub use results::*;
