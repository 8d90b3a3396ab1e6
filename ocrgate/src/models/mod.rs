mod detection;
mod job;
mod queue;
mod record;

pub use detection::*;
pub use job::*;
pub use queue::*;
pub use record::*;
