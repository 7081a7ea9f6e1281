//! ONNX Runtime session wrapper.
//!
//! The backend owns the session for the engine's lifetime and exposes the
//! two things the pipeline consumes: the declared input shape (used once,
//! at construction) and a run call returning the named output tensors.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use ndarray::{Array4, ArrayD, IxDyn};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{TensorRef, ValueType};

#[derive(Debug)]
pub struct OrtBackend {
    session: Session,
    input_name: String,
    output_names: Vec<String>,
}

impl OrtBackend {
    /// Load the model graph from disk. Fails fast when the file is
    /// missing, before touching the runtime.
    pub fn build(model_path: &Path) -> Result<Self> {
        if !model_path.exists() {
            bail!("model file not found: {}", model_path.display());
        }

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| anyhow!("model declares no inputs"))?;
        let output_names = session.outputs.iter().map(|o| o.name.clone()).collect();

        Ok(Self {
            session,
            input_name,
            output_names,
        })
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Declared input (width, height), when the model pins them.
    /// Returns `None` for non-4D or dynamic spatial dimensions.
    pub fn input_size(&self) -> Option<(u32, u32)> {
        let input = self.session.inputs.first()?;
        let ValueType::Tensor { shape, .. } = &input.input_type else {
            return None;
        };
        let dims: Vec<i64> = shape.iter().copied().collect();
        if dims.len() != 4 {
            return None;
        }
        let (height, width) = (dims[2], dims[3]);
        if height > 0 && width > 0 {
            Some((width as u32, height as u32))
        } else {
            None
        }
    }

    /// Execute the graph on one preprocessed tensor and return all output
    /// tensors in the graph's declared order, paired with their names.
    ///
    /// Integer outputs (class-label tensors) are widened to f32 so the
    /// decoder sees a single element type.
    pub fn run(&mut self, input: &Array4<f32>) -> Result<Vec<(String, ArrayD<f32>)>> {
        let input = input.as_standard_layout();
        let tensor = TensorRef::from_array_view(&input)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .context("ONNX inference failed")?;

        let mut named = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let Some(value) = outputs.get(name.as_str()) else {
                continue;
            };
            let array = if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
                let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
                ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())?
            } else if let Ok((shape, data)) = value.try_extract_tensor::<i64>() {
                let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
                ArrayD::from_shape_vec(IxDyn(&dims), data.iter().map(|&v| v as f32).collect())?
            } else {
                // non-numeric output, irrelevant to detection decoding
                continue;
            };
            named.push((name.clone(), array));
        }
        Ok(named)
    }
}
