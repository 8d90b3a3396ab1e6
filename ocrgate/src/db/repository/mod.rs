mod queue;
mod results;

pub use queue::QueueRepository;
pub use results::ResultRepository;
