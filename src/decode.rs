//! Output-schema detection and raw detection decoding.
//!
//! Two export conventions are recognized:
//!
//! - **Triple**: three named outputs ("boxes"/"scores"/"labels" substring
//!   match) holding parallel flat arrays — one coordinate quad, one score
//!   and one class id per detection.
//! - **Flat**: a single tensor of stride-6 rows
//!   `[x1, y1, x2, y2, score, class]` in model input space.
//!
//! Anything else decodes to an empty set; an unrecognized export format
//! is deliberately not an error.

use log::{debug, warn};
use ndarray::{ArrayD, CowArray, IxDyn};

use crate::config::ModelConfig;
use crate::{Bbox, Detection};

/// How many leading box values are inspected to decide whether a triple
/// response carries normalized fractions or absolute pixels.
const FORMAT_PROBE_LEN: usize = 100;

/// Boxes whose probed maximum stays at or below this are treated as
/// normalized fractions.
const NORMALIZED_MAX: f32 = 1.5;

/// A decoded detection, already remapped into frame-pixel corner
/// coordinates but not yet clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    pub class_id: i64,
}

/// The closed set of recognized output layouts, determined once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSchema {
    /// Parallel boxes/scores/labels outputs, by index into the output list.
    Triple {
        boxes: usize,
        scores: usize,
        labels: usize,
    },
    /// Single flat tensor of stride-6 rows, by index into the output list.
    Flat(usize),
    Unrecognized,
}

/// Classify the runner's outputs by name (case-insensitive substring
/// match). Falls back to the first output as a flat tensor when the
/// named triple is incomplete.
pub fn classify(outputs: &[(String, ArrayD<f32>)]) -> OutputSchema {
    let find = |needle: &str| {
        outputs
            .iter()
            .position(|(name, _)| name.to_lowercase().contains(needle))
    };
    match (find("boxes"), find("scores"), find("labels")) {
        (Some(boxes), Some(scores), Some(labels)) => OutputSchema::Triple {
            boxes,
            scores,
            labels,
        },
        _ if !outputs.is_empty() => OutputSchema::Flat(0),
        _ => OutputSchema::Unrecognized,
    }
}

/// Decode model outputs into frame-space raw detections, dropping
/// everything under `score_threshold` before any geometry work.
pub fn decode_outputs(
    outputs: &[(String, ArrayD<f32>)],
    config: &ModelConfig,
    frame_width: u32,
    frame_height: u32,
    score_threshold: f32,
) -> Vec<RawDetection> {
    match classify(outputs) {
        OutputSchema::Triple {
            boxes,
            scores,
            labels,
        } => {
            let boxes = outputs[boxes].1.as_standard_layout();
            let scores = outputs[scores].1.as_standard_layout();
            let labels = outputs[labels].1.as_standard_layout();
            decode_triple(
                tensor_data(&boxes),
                tensor_data(&scores),
                tensor_data(&labels),
                config,
                frame_width,
                frame_height,
                score_threshold,
            )
        }
        OutputSchema::Flat(first) => {
            let data = outputs[first].1.as_standard_layout();
            decode_flat(
                tensor_data(&data),
                config,
                frame_width,
                frame_height,
                score_threshold,
            )
        }
        OutputSchema::Unrecognized => {
            warn!("model returned no recognizable detection outputs");
            Vec::new()
        }
    }
}

/// Map raw detections into clamped, labeled `Detection`s.
pub fn resolve(
    raw: Vec<RawDetection>,
    config: &ModelConfig,
    frame_width: u32,
    frame_height: u32,
) -> Vec<Detection> {
    raw.into_iter()
        .map(|r| Detection {
            bbox: Bbox::from_corners(
                r.x1,
                r.y1,
                r.x2,
                r.y2,
                frame_width as f32,
                frame_height as f32,
            ),
            label: config.label(r.class_id),
            confidence: r.score,
            class_id: r.class_id,
        })
        .collect()
}

fn tensor_data<'a>(tensor: &'a CowArray<'a, f32, IxDyn>) -> &'a [f32] {
    // standard layout guarantees a contiguous row-major buffer
    tensor.as_slice().unwrap_or(&[])
}

fn decode_triple(
    boxes: &[f32],
    scores: &[f32],
    labels: &[f32],
    config: &ModelConfig,
    frame_width: u32,
    frame_height: u32,
    score_threshold: f32,
) -> Vec<RawDetection> {
    let fw = frame_width as f32;
    let fh = frame_height as f32;

    // One decision per response: normalized [x, y, w, h] fractions of the
    // frame, or absolute [x1, y1, x2, y2] pixels in model input space.
    let probed_max = boxes
        .iter()
        .take(FORMAT_PROBE_LEN)
        .fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    let normalized = probed_max <= NORMALIZED_MAX;

    let sx = fw / config.input_width as f32;
    let sy = fh / config.input_height as f32;

    let mut detections = Vec::new();
    for (i, &score) in scores.iter().enumerate() {
        if score < score_threshold {
            continue;
        }
        let Some(quad) = boxes.get(i * 4..i * 4 + 4) else {
            debug!("boxes output shorter than scores ({} quads)", boxes.len() / 4);
            break;
        };
        let (x1, y1, x2, y2) = if normalized {
            (
                quad[0] * fw,
                quad[1] * fh,
                (quad[0] + quad[2]) * fw,
                (quad[1] + quad[3]) * fh,
            )
        } else {
            (quad[0] * sx, quad[1] * sy, quad[2] * sx, quad[3] * sy)
        };
        detections.push(RawDetection {
            x1,
            y1,
            x2,
            y2,
            score,
            class_id: labels.get(i).copied().unwrap_or_default() as i64,
        });
    }
    detections
}

fn decode_flat(
    data: &[f32],
    config: &ModelConfig,
    frame_width: u32,
    frame_height: u32,
    score_threshold: f32,
) -> Vec<RawDetection> {
    if data.is_empty() || data.len() % 6 != 0 {
        debug!("flat output length {} is not rows of 6; ignoring", data.len());
        return Vec::new();
    }

    let sx = frame_width as f32 / config.input_width as f32;
    let sy = frame_height as f32 / config.input_height as f32;

    let mut detections = Vec::new();
    for row in data.chunks_exact(6) {
        let score = row[4];
        if score < score_threshold {
            continue;
        }
        detections.push(RawDetection {
            x1: row[0] * sx,
            y1: row[1] * sy,
            x2: row[2] * sx,
            y2: row[3] * sy,
            score,
            class_id: row[5] as i64,
        });
    }
    detections
}
