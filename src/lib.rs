//! Detection decoding and suppression pipeline.
//!
//! Turns raw ONNX object-detection outputs into labeled, pixel-space
//! bounding boxes: preprocess → run → decode → clamp → class-wise NMS.

pub mod config;
pub mod decode;
pub mod engine;
pub mod ort_backend;
pub mod preprocess;

pub use crate::config::{ModelConfig, DEFAULT_INPUT_SIZE};
pub use crate::engine::Engine;
pub use crate::ort_backend::OrtBackend;
pub use crate::preprocess::{Frame, Preprocessor};

use serde::{Deserialize, Serialize};

/// Class-wise non-maximum suppression.
///
/// Detections are partitioned by class id (classes kept in first-seen
/// order), sorted descending by confidence within each partition (stable,
/// so ties keep source order), then greedily filtered: the highest
/// remaining box is kept and every candidate of the same class with
/// IoU >= `iou_threshold` against it is dropped. The result is grouped by
/// class, descending confidence within each group; there is no global
/// re-sort across classes.
pub fn non_max_suppression(detections: &mut Vec<Detection>, iou_threshold: f32) {
    let input = std::mem::take(detections);

    // partition by class id, first-seen order
    let mut classes: Vec<(i64, Vec<Detection>)> = Vec::new();
    for det in input {
        match classes.iter_mut().find(|(id, _)| *id == det.class_id) {
            Some((_, group)) => group.push(det),
            None => classes.push((det.class_id, vec![det])),
        }
    }

    for (_, mut group) in classes {
        group.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut suppressed = vec![false; group.len()];
        for i in 0..group.len() {
            if suppressed[i] {
                continue;
            }
            for j in (i + 1)..group.len() {
                if !suppressed[j] && group[i].bbox.iou(&group[j].bbox) >= iou_threshold {
                    suppressed[j] = true;
                }
            }
        }

        for (det, dropped) in group.into_iter().zip(suppressed) {
            if !dropped {
                detections.push(det);
            }
        }
    }
}

/// A labeled detection in original-frame pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: Bbox,
    pub label: String,
    pub confidence: f32,
    pub class_id: i64,
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bbox {
    xmin: f32,
    ymin: f32,
    width: f32,
    height: f32,
}

impl Bbox {
    pub fn new(xmin: f32, ymin: f32, width: f32, height: f32) -> Self {
        Self {
            xmin,
            ymin,
            width,
            height,
        }
    }

    /// Build a box from two corner points in any order, clamped into
    /// `[0, frame_width - 1] x [0, frame_height - 1]`.
    ///
    /// Degenerate or fully out-of-frame corners still yield a box with
    /// non-negative extent inside the frame.
    pub fn from_corners(
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        frame_width: f32,
        frame_height: f32,
    ) -> Self {
        let left = x1.min(x2).clamp(0.0, frame_width - 1.0);
        let top = y1.min(y2).clamp(0.0, frame_height - 1.0);
        let right = x1.max(x2).clamp(0.0, frame_width - 1.0);
        let bottom = y1.max(y2).clamp(0.0, frame_height - 1.0);
        Self {
            xmin: left,
            ymin: top,
            width: (right - left).max(0.0),
            height: (bottom - top).max(0.0),
        }
    }

    pub fn xmin(&self) -> f32 {
        self.xmin
    }

    pub fn ymin(&self) -> f32 {
        self.ymin
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn xmax(&self) -> f32 {
        self.xmin + self.width
    }

    pub fn ymax(&self) -> f32 {
        self.ymin + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn intersection_area(&self, other: &Bbox) -> f32 {
        let l = self.xmin.max(other.xmin);
        let r = self.xmax().min(other.xmax());
        let t = self.ymin.max(other.ymin);
        let b = self.ymax().min(other.ymax());
        (r - l).max(0.0) * (b - t).max(0.0)
    }

    /// Intersection over union; the epsilon keeps two zero-area boxes
    /// from dividing by zero.
    pub fn iou(&self, other: &Bbox) -> f32 {
        let inter = self.intersection_area(other);
        inter / (self.area() + other.area() - inter + 1e-6)
    }
}
