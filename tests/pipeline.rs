//! End-to-end checks of the decode → clamp → suppress pipeline on
//! synthetic model outputs, without a real ONNX session.

use detect_rs::decode::{decode_outputs, resolve};
use detect_rs::{non_max_suppression, Detection, ModelConfig};
use ndarray::{ArrayD, IxDyn};

const FRAME_W: u32 = 640;
const FRAME_H: u32 = 480;
const SCORE_THRESHOLD: f32 = 0.3;
const NMS_THRESHOLD: f32 = 0.45;

fn tensor(values: Vec<f32>) -> ArrayD<f32> {
    let len = values.len();
    ArrayD::from_shape_vec(IxDyn(&[len]), values).unwrap()
}

fn config() -> ModelConfig {
    ModelConfig {
        input_name: "images".to_string(),
        input_width: 320,
        input_height: 320,
        labels: vec!["person".to_string(), "car".to_string(), "dog".to_string()],
    }
}

fn run_pipeline(outputs: &[(String, ArrayD<f32>)]) -> Vec<Detection> {
    let cfg = config();
    let raw = decode_outputs(outputs, &cfg, FRAME_W, FRAME_H, SCORE_THRESHOLD);
    let mut detections = resolve(raw, &cfg, FRAME_W, FRAME_H);
    non_max_suppression(&mut detections, NMS_THRESHOLD);
    detections
}

fn assert_invariants(detections: &[Detection]) {
    for det in detections {
        // threshold invariant
        assert!(det.confidence >= SCORE_THRESHOLD);
        // bounds invariant
        assert!(det.bbox.xmin() >= 0.0);
        assert!(det.bbox.ymin() >= 0.0);
        assert!(det.bbox.xmin() <= (FRAME_W - 1) as f32);
        assert!(det.bbox.ymin() <= (FRAME_H - 1) as f32);
        assert!(det.bbox.width() >= 0.0);
        assert!(det.bbox.height() >= 0.0);
        assert!(det.bbox.xmax() <= FRAME_W as f32);
        assert!(det.bbox.ymax() <= FRAME_H as f32);
    }
    // suppression invariant
    for i in 0..detections.len() {
        for j in (i + 1)..detections.len() {
            if detections[i].class_id == detections[j].class_id {
                assert!(detections[i].bbox.iou(&detections[j].bbox) < NMS_THRESHOLD);
            }
        }
    }
}

#[test]
fn triple_schema_end_to_end() {
    // two heavily overlapping people, one car, one below-threshold row,
    // one box hanging out of frame
    let outputs = vec![
        (
            "det_boxes".to_string(),
            tensor(vec![
                100.0, 100.0, 200.0, 200.0, // person, kept
                105.0, 105.0, 205.0, 205.0, // person, suppressed
                240.0, 200.0, 300.0, 260.0, // car
                10.0, 10.0, 20.0, 20.0, // below threshold
                300.0, 300.0, 500.0, 500.0, // clamped to frame
            ]),
        ),
        (
            "det_scores".to_string(),
            tensor(vec![0.9, 0.8, 0.7, 0.1, 0.6]),
        ),
        (
            "det_labels".to_string(),
            tensor(vec![0.0, 0.0, 1.0, 1.0, 2.0]),
        ),
    ];
    let detections = run_pipeline(&outputs);
    assert_invariants(&detections);

    assert_eq!(detections.len(), 3);
    assert_eq!(detections[0].label, "person");
    assert_eq!(detections[0].confidence, 0.9);
    assert_eq!(detections[1].label, "car");
    assert_eq!(detections[2].label, "dog");
    // the out-of-frame dog box is clamped inside the frame
    assert!(detections[2].bbox.ymax() <= (FRAME_H - 1) as f32);
}

#[test]
fn flat_schema_end_to_end() {
    let outputs = vec![(
        "output0".to_string(),
        tensor(vec![
            100.0, 100.0, 200.0, 200.0, 0.9, 0.0, //
            102.0, 102.0, 202.0, 202.0, 0.85, 0.0, //
            -40.0, -40.0, 60.0, 60.0, 0.7, 1.0, //
            5.0, 5.0, 15.0, 15.0, 0.05, 2.0,
        ]),
    )];
    let detections = run_pipeline(&outputs);
    assert_invariants(&detections);

    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].label, "person");
    assert_eq!(detections[1].label, "car");
    // negative corners clamped to the frame origin
    assert_eq!(detections[1].bbox.xmin(), 0.0);
    assert_eq!(detections[1].bbox.ymin(), 0.0);
}

#[test]
fn normalized_triple_end_to_end() {
    let outputs = vec![
        ("boxes".to_string(), tensor(vec![0.1, 0.2, 0.3, 0.4])),
        ("scores".to_string(), tensor(vec![0.9])),
        ("labels".to_string(), tensor(vec![0.0])),
    ];
    let detections = run_pipeline(&outputs);
    assert_invariants(&detections);

    assert_eq!(detections.len(), 1);
    let b = &detections[0].bbox;
    assert!((b.xmin() - 64.0).abs() < 1e-3);
    assert!((b.ymin() - 96.0).abs() < 1e-3);
    assert!((b.width() - 192.0).abs() < 1e-3);
    assert!((b.height() - 192.0).abs() < 1e-3);
}

#[test]
fn box_entirely_past_far_edge_stays_in_frame() {
    // model-space corners (400, 400)-(420, 420) scale to (800, 600)-(840, 630),
    // fully beyond the 640x480 frame
    let outputs = vec![(
        "output0".to_string(),
        tensor(vec![400.0, 400.0, 420.0, 420.0, 0.9, 0.0]),
    )];
    let detections = run_pipeline(&outputs);
    assert_invariants(&detections);

    assert_eq!(detections.len(), 1);
    let b = &detections[0].bbox;
    assert_eq!(b.xmin(), (FRAME_W - 1) as f32);
    assert_eq!(b.ymin(), (FRAME_H - 1) as f32);
    assert_eq!(b.width(), 0.0);
    assert_eq!(b.height(), 0.0);
}

#[test]
fn unknown_schema_yields_empty_list() {
    let outputs = vec![(
        "embedding".to_string(),
        tensor(vec![0.5, 0.25, 0.125, 0.0625, 0.75]),
    )];
    let detections = run_pipeline(&outputs);
    assert!(detections.is_empty());
}

#[test]
fn out_of_range_class_id_is_labeled_cls() {
    let outputs = vec![(
        "output0".to_string(),
        tensor(vec![100.0, 100.0, 200.0, 200.0, 0.9, 41.0]),
    )];
    let detections = run_pipeline(&outputs);
    assert_invariants(&detections);
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].label, "cls41");
    assert_eq!(detections[0].class_id, 41);
}
