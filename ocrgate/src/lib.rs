//! ocrgate: OCR post-processing behind an HTTP API and a durable job queue.
//!
//! An image arrives as base64 (HTTP or queue) or as raw bytes (upload, demo),
//! an external OCR engine produces detections, and the pipeline filters them
//! by confidence, draws their boxes onto the image and serializes the result.

pub mod api;
pub mod config;
pub mod db;
pub mod demo;
pub mod error;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod queue;
pub mod services;
