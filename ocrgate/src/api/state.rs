use std::sync::Arc;

use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::ocr::OcrEngine;
use crate::pipeline::{Pipeline, PipelineSettings};
use crate::services::ArtifactRecorder;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Result store and job queues.
    pub db: Arc<dyn DatabaseBackend>,
    pub pipeline: Pipeline,
    pub artifacts: ArtifactRecorder,
}

impl AppState {
    pub fn new(config: Config, db: Arc<dyn DatabaseBackend>, engine: Arc<dyn OcrEngine>) -> Self {
        let config = Arc::new(config);
        let pipeline = Pipeline::new(engine, PipelineSettings::from_config(&config));
        let artifacts = ArtifactRecorder::new(db.clone(), config.storage.clone());

        Self {
            config,
            db,
            pipeline,
            artifacts,
        }
    }
}
