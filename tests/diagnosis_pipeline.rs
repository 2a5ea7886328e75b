mod common;

use std::sync::Arc;
use std::thread;

use approx::assert_abs_diff_eq;

use medisight::gradcam::{decode_data_uri, importance_map, DATA_URI_PREFIX};
use medisight::network::metadata::DEFAULT_TARGET_LAYER;
use medisight::preprocess::{decode_grayscale, to_input_tensor};
use medisight::{capture, render_heatmap, Diagnosis, DiagnosisError, RenderConfig, Tensor};

use common::{png_bytes, reference_engine, synthetic_xray};

#[test]
fn diagnosis_carries_label_score_and_full_size_heatmap() {
    let engine = reference_engine();
    let upload = png_bytes(&synthetic_xray(96, 80, 1));

    let d = engine.diagnose(&upload).unwrap();

    assert!(engine.network().labels().contains(&d.diagnosis));
    assert!((0.0..=1.0).contains(&d.confidence));
    assert_eq!(d.full_analysis, "Success");
    assert!(d.heatmap.starts_with(DATA_URI_PREFIX));
    let heatmap = decode_data_uri(&d.heatmap).unwrap();
    assert_eq!(heatmap.dimensions(), (96, 80));
}

#[test]
fn json_payload_uses_the_wire_field_names() {
    let engine = reference_engine();
    let d = engine.diagnose(&png_bytes(&synthetic_xray(32, 32, 0))).unwrap();
    let json: serde_json::Value = serde_json::to_value(&d).unwrap();
    for key in ["diagnosis", "confidence", "heatmap", "full_analysis"] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
}

#[test]
fn repeated_calls_are_deterministic() {
    let engine = reference_engine();
    let upload = png_bytes(&synthetic_xray(120, 100, 3));

    let first = engine.diagnose(&upload).unwrap();
    let second = engine.diagnose(&upload).unwrap();

    assert_eq!(first.diagnosis, second.diagnosis);
    assert_abs_diff_eq!(first.confidence, second.confidence, epsilon = 1e-5);
    assert_eq!(first.heatmap, second.heatmap);
}

#[test]
fn confidence_is_the_raw_top_score() {
    let engine = reference_engine();
    let img = synthetic_xray(64, 64, 2);
    let input = to_input_tensor(&img, 224, 224).unwrap();
    let scores = engine.network().predict(&input).unwrap();

    let d = engine.diagnose(&png_bytes(&img)).unwrap();

    let top = scores.iter().copied().fold(f64::MIN, f64::max);
    assert_abs_diff_eq!(d.confidence, top, epsilon = 1e-12);
}

#[test]
fn back_to_back_captures_do_not_contaminate_each_other() {
    let engine = reference_engine();
    let net = engine.network();
    let input_for = |variant| {
        let img = decode_grayscale(&png_bytes(&synthetic_xray(80, 80, variant))).unwrap();
        to_input_tensor(&img, 224, 224).unwrap()
    };
    let (a, b) = (input_for(4), input_for(9));

    let a1 = capture(net, &a, DEFAULT_TARGET_LAYER).unwrap();
    let b1 = capture(net, &b, DEFAULT_TARGET_LAYER).unwrap();
    let a2 = capture(net, &a, DEFAULT_TARGET_LAYER).unwrap();

    assert_eq!(a1.class_index, a2.class_index);
    assert_eq!(a1.score, a2.score);
    assert_eq!(a1.activation, a2.activation);
    assert_eq!(a1.gradient, a2.gradient);
    assert_ne!(a1.activation, b1.activation);
}

#[test]
fn all_zero_input_yields_an_all_zero_map() {
    let engine = reference_engine();
    let net = engine.network();
    let zero = Tensor::zeros(&net.input_shape());

    let c = capture(net, &zero, DEFAULT_TARGET_LAYER).unwrap();
    assert!(c.activation.data.iter().all(|&v| v == 0.0));

    let map = importance_map(&c.activation, &c.gradient).unwrap();
    assert!(map.is_zero());

    let heatmap = render_heatmap(&c.activation, &c.gradient, 50, 40, &RenderConfig::default()).unwrap();
    assert_eq!(decode_data_uri(&heatmap.data_uri).unwrap().dimensions(), (50, 40));
}

#[test]
fn concurrent_requests_match_a_sequential_run() {
    let engine = Arc::new(reference_engine());
    let uploads: Vec<Vec<u8>> = (0..6)
        .map(|i| png_bytes(&synthetic_xray(48 + i * 8, 56, i)))
        .collect();

    let sequential: Vec<Diagnosis> = uploads.iter()
        .map(|u| engine.diagnose(u).unwrap())
        .collect();

    let handles: Vec<_> = uploads.into_iter()
        .map(|upload| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.diagnose(&upload).unwrap())
        })
        .collect();

    for (handle, expected) in handles.into_iter().zip(&sequential) {
        let got = handle.join().unwrap();
        assert_eq!(got.diagnosis, expected.diagnosis);
        assert_abs_diff_eq!(got.confidence, expected.confidence, epsilon = 1e-12);
        assert_eq!(got.heatmap, expected.heatmap);
    }
}

#[test]
fn failures_surface_as_stage_errors() {
    let engine = reference_engine();
    let err = engine.diagnose(b"GIF89a-truncated").unwrap_err();
    assert!(matches!(err, DiagnosisError::Decode(_)));
    assert!(err.to_string().starts_with("Failed to decode image"));
}
