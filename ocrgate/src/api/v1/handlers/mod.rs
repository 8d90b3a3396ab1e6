pub(crate) mod health;
pub mod jobs;
pub mod ocr;
pub mod results;

pub use health::health_check;
