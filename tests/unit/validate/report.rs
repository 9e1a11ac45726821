use super::*;

fn sample(check: CheckKind) -> Discrepancy {
    Discrepancy::new(
        DisplayId(1),
        FrameIndex(42),
        check,
        Some(3),
        "display frame mismatch",
        Detail::DisplayFrame {
            original: PixelRect::new(0, 0, 1920, 1080),
            expected: PixelRect::new(0, 0, 1920, 1080),
            actual: PixelRect::new(0, 0, 1900, 1080),
        },
    )
}

#[test]
fn class_follows_check_kind() {
    assert_eq!(sample(CheckKind::PlaneScale).class, ErrorClass::Mismatch);
    assert_eq!(sample(CheckKind::CompositionBlend).class, ErrorClass::Policy);
}

#[test]
fn display_names_display_frame_and_check() {
    let s = sample(CheckKind::PlaneScale).to_string();
    assert_eq!(s, "D1 frame 42 [plane_scale] layer 3: display frame mismatch");
}

#[test]
fn serializes_both_rectangles() {
    let json = serde_json::to_value(sample(CheckKind::PlaneScale)).unwrap();
    assert_eq!(json["check"], "plane_scale");
    assert_eq!(json["detail"]["type"], "display_frame");
    assert_eq!(json["detail"]["expected"]["right"], 1920);
    assert_eq!(json["detail"]["actual"]["right"], 1900);
}

#[test]
fn collecting_sink_clones_share_storage() {
    let sink = CollectingSink::new();
    let mut boxed: Box<dyn DiagnosticsSink> = Box::new(sink.clone());
    boxed.report(&sample(CheckKind::PlaneCrop));
    boxed.report(&sample(CheckKind::PlaneAlpha));
    assert_eq!(sink.len(), 2);
    assert_eq!(sink.take().len(), 2);
    assert!(sink.is_empty());
}

#[test]
fn frame_report_counts_by_kind() {
    let report = FrameReport {
        display: DisplayId(0),
        frame: FrameIndex(1),
        state: CheckState::Passed,
        layers_checked: 2,
        discrepancies: vec![
            sample(CheckKind::PlaneCrop),
            sample(CheckKind::PlaneCrop),
            sample(CheckKind::PlaneAlpha),
        ],
    };
    assert!(!report.is_clean());
    assert_eq!(report.count(CheckKind::PlaneCrop), 2);
    assert_eq!(report.count(CheckKind::LayerOrder), 0);
}
