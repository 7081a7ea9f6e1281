//! The detection engine: owns the session, the frozen config and the
//! preprocessing scratch buffers.

use std::path::Path;

use anyhow::{bail, Result};
use log::debug;

use crate::config::{self, ModelConfig, DEFAULT_INPUT_SIZE};
use crate::decode;
use crate::ort_backend::OrtBackend;
use crate::preprocess::{Frame, Preprocessor};
use crate::{non_max_suppression, Detection};

/// A loaded detection model plus everything needed to turn frames into
/// labeled boxes.
///
/// One engine serves one caller at a time: `detect` takes `&mut self`
/// because the preprocessing tensor and the session are reused scratch
/// state. Use one engine per worker for parallel pipelines.
#[derive(Debug)]
pub struct Engine {
    backend: OrtBackend,
    config: ModelConfig,
    preprocessor: Preprocessor,
}

impl Engine {
    /// Load a model graph and its label file.
    ///
    /// `input_size` is `(width, height)`; when `None`, the size is read
    /// from the model's declared input shape, falling back to 640x640 if
    /// the shape is fully dynamic. Fails with a not-found error naming
    /// whichever file is missing.
    pub fn new(
        model_path: &Path,
        labels_path: &Path,
        input_size: Option<(u32, u32)>,
    ) -> Result<Self> {
        if !model_path.exists() {
            bail!("model file not found: {}", model_path.display());
        }
        let labels = config::load_labels(labels_path)?;
        let backend = OrtBackend::build(model_path)?;

        let (input_width, input_height) = input_size
            .or_else(|| backend.input_size())
            .unwrap_or((DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE));

        let config = ModelConfig {
            input_name: backend.input_name().to_string(),
            input_width,
            input_height,
            labels,
        };
        debug!(
            "engine ready: input '{}' {}x{}, {} labels",
            config.input_name,
            input_width,
            input_height,
            config.labels.len()
        );

        Ok(Self {
            preprocessor: Preprocessor::new(input_width, input_height),
            backend,
            config,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Run the full pipeline on one frame.
    ///
    /// Returns detections with confidence >= `score_threshold`, clamped
    /// to frame bounds and suppressed per class at `nms_threshold`,
    /// grouped by class in first-seen order.
    pub fn detect(
        &mut self,
        frame: &Frame,
        score_threshold: f32,
        nms_threshold: f32,
    ) -> Result<Vec<Detection>> {
        let tensor = self.preprocessor.run(frame)?;
        let outputs = self.backend.run(tensor)?;

        let raw = decode::decode_outputs(
            &outputs,
            &self.config,
            frame.width,
            frame.height,
            score_threshold,
        );
        let mut detections = decode::resolve(raw, &self.config, frame.width, frame.height);
        non_max_suppression(&mut detections, nms_threshold);

        debug!(
            "frame {}x{}: {} raw outputs, {} detections kept",
            frame.width,
            frame.height,
            outputs.len(),
            detections.len()
        );
        Ok(detections)
    }
}
