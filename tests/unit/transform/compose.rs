use super::*;
use crate::buffer::format::PixelFormat;
use crate::buffer::source::{BufferSource, SourceMask};
use crate::buffer::store::{BufferDesc, BufferStore};
use crate::foundation::core::{PixelRect, Rect, max_rect_edge_delta};
use crate::foundation::error::LayervalError;
use crate::transform::discrete::DiscreteTransform;
use crate::transform::layer::Placement;

fn placed(crop: [f64; 4], df: [i32; 4], d: DiscreteTransform) -> LayerTransform {
    LayerTransform::from_placement(
        None,
        &Placement {
            source_crop: Rect::new(crop[0], crop[1], crop[2], crop[3]),
            display_frame: PixelRect::from(df),
            transform: d,
        },
    )
}

fn close(a: Rect, b: Rect) -> bool {
    max_rect_edge_delta(a, b) <= 1e-6
}

#[test]
fn crop_then_scaled_placement() {
    let a = LayerTransform::identity(None, 100.0, 100.0);
    let b = LayerTransform::identity(None, 100.0, 100.0).with_geometry(
        Rect::new(0.0, 0.0, 100.0, 100.0),
        Vec2::new(50.0, 50.0),
        Vec2::new(2.0, 2.0),
        DiscreteTransform::Identity,
    );
    let c = compose(&a, &b).unwrap().transform;
    assert_eq!(c.display_rect(), Rect::new(50.0, 50.0, 250.0, 250.0));
    assert_eq!(c.effective_display_frame(), PixelRect::new(50, 50, 250, 250));
}

#[test]
fn rotated_crop_onto_matching_frame_keeps_unit_scale() {
    let a = placed([0.0, 0.0, 100.0, 50.0], [0, 0, 50, 100], DiscreteTransform::Rotate90);
    let b = LayerTransform::identity(None, 50.0, 100.0);
    let c = compose(&a, &b).unwrap().transform;
    assert_eq!(c.scale(), Vec2::new(1.0, 1.0));
    assert_eq!(c.display_rect(), Rect::new(0.0, 0.0, 50.0, 100.0));
}

#[test]
fn second_rotation_swaps_the_first_scale() {
    let a = placed([0.0, 0.0, 100.0, 50.0], [0, 0, 50, 200], DiscreteTransform::Rotate90);
    assert_eq!(a.scale(), Vec2::new(1.0, 2.0));
    let b = placed([0.0, 0.0, 50.0, 200.0], [0, 0, 200, 50], DiscreteTransform::Rotate90);
    let c = compose(&a, &b).unwrap().transform;
    assert_eq!(c.discrete(), DiscreteTransform::Rotate180);
    assert_eq!(c.scale(), Vec2::new(2.0, 1.0));
    assert!(close(c.display_rect(), Rect::new(0.0, 0.0, 200.0, 50.0)));
}

#[test]
fn round_trip_recovers_source_crop_for_every_element() {
    for d in DiscreteTransform::ALL {
        let t = placed([10.0, 20.0, 110.0, 70.0], [5, 7, 305, 157], d);
        let back = compose(&t, &inverse(&t)).unwrap().transform;
        assert!(
            close(back.display_rect(), t.source_crop()),
            "{d}: {:?} vs {:?}",
            back.display_rect(),
            t.source_crop()
        );
        assert_eq!(back.discrete(), DiscreteTransform::Identity);
        assert_eq!(inverse(&inverse(&t)).discrete(), d);
    }
}

#[test]
fn identity_is_neutral_on_both_sides() {
    for d in DiscreteTransform::ALL {
        let t = placed([10.0, 20.0, 110.0, 70.0], [40, 30, 240, 130], d);
        let screen = LayerTransform::identity(None, 1920.0, 1080.0);
        let after = compose(&t, &screen).unwrap().transform;
        assert!(after.geometry_eq(&t, 1e-9), "{d}: {after}");

        let buffer = LayerTransform::identity(None, 200.0, 200.0);
        let before = compose(&buffer, &t).unwrap().transform;
        assert!(before.geometry_eq(&t, 1e-9), "{d}: {before}");
    }
}

#[test]
fn clipping_trims_crop_and_shifts_offset() {
    let screen = LayerTransform::clip(Rect::new(0.0, 0.0, 1920.0, 1080.0));

    let left = placed([0.0, 0.0, 200.0, 100.0], [-50, 0, 150, 100], DiscreteTransform::Identity);
    let c = compose(&left, &screen).unwrap().transform;
    assert!(close(c.source_crop(), Rect::new(50.0, 0.0, 200.0, 100.0)));
    assert_eq!(c.offset(), Vec2::new(0.0, 0.0));
    assert!(close(c.display_rect(), Rect::new(0.0, 0.0, 150.0, 100.0)));

    // Off the right edge under rotation: destination X runs against source Y, so the kept
    // part is the bottom half of the source.
    let right = placed(
        [0.0, 0.0, 100.0, 200.0],
        [1820, 0, 2020, 100],
        DiscreteTransform::Rotate90,
    );
    let c = compose(&right, &screen).unwrap().transform;
    assert!(close(c.source_crop(), Rect::new(0.0, 100.0, 100.0, 200.0)));
    assert!(close(c.display_rect(), Rect::new(1820.0, 0.0, 1920.0, 100.0)));
}

#[test]
fn disjoint_composition_collapses_to_zero_extent() {
    let screen = LayerTransform::clip(Rect::new(0.0, 0.0, 1920.0, 1080.0));
    let off = placed([0.0, 0.0, 100.0, 100.0], [2000, 0, 2100, 100], DiscreteTransform::Identity);
    let c = compose(&off, &screen).unwrap().transform;
    assert_eq!(c.source_crop().width(), 0.0);
    assert_eq!(c.display_rect().width(), 0.0);
    assert!(c.scale().x.is_finite());
}

#[test]
fn attributes_combine_per_rule() {
    let a = LayerTransform::identity(None, 10.0, 10.0)
        .with_layer_index(3)
        .with_plane_alpha(0.5)
        .with_blend(BlendMode::Coverage)
        .with_pixel_alpha(true)
        .with_z_order(ZOrderKey::for_index(3).unwrap())
        .with_composed_from(SourceMask::from(BufferSource::Input));
    let b = LayerTransform::identity(None, 10.0, 10.0)
        .with_layer_index(9)
        .with_plane_alpha(0.5)
        .with_decrypt(true)
        .with_z_order(ZOrderKey::for_index(1).unwrap())
        .with_composed_from(SourceMask::from(BufferSource::ClientComposition));

    let opaque = compose(&a, &b).unwrap();
    assert!(opaque.violation.is_none());
    let c = opaque.transform;
    assert_eq!(c.plane_alpha(), 0.5);
    assert!(c.decrypt());
    assert_eq!(c.blend_mode(), BlendMode::Coverage);
    assert!(c.has_pixel_alpha());
    assert_eq!(c.layer_index(), Some(3));
    assert_eq!(c.z_order().levels(), 2);
    assert_eq!(c.z_order().field(0), 1);
    assert_eq!(c.z_order().field(1), 3);
    assert!(c.composed_from().contains(BufferSource::Input));
    assert!(c.composed_from().contains(BufferSource::ClientComposition));

    let premult = compose(&a, &b.clone().with_blend(BlendMode::Premultiplied)).unwrap();
    assert_eq!(premult.transform.plane_alpha(), 0.25);
}

#[test]
fn coverage_on_composed_buffer_is_reported_then_multiplied() {
    let mut store = BufferStore::new();
    let target = store.insert(BufferDesc {
        width: 10,
        height: 10,
        format: PixelFormat::Argb8888,
        source: BufferSource::ClientComposition,
    });
    let input = store.insert(BufferDesc {
        width: 10,
        height: 10,
        format: PixelFormat::Argb8888,
        source: BufferSource::Input,
    });

    let a = LayerTransform::identity(None, 10.0, 10.0)
        .with_layer_index(1)
        .with_plane_alpha(0.5);
    let on_target = LayerTransform::identity(Some(target), 10.0, 10.0)
        .with_blend(BlendMode::Coverage)
        .with_plane_alpha(0.5);
    let (t, violation) = compose(&a, &on_target).unwrap().into_parts();
    assert_eq!(t.plane_alpha(), 0.25);
    let violation = violation.unwrap();
    assert_eq!(violation.layer_index, Some(1));
    assert_eq!(violation.buffer, Some(target));

    let on_input = on_target.clone().with_source(Some(input));
    assert!(compose(&a, &on_input).unwrap().violation.is_none());
}

#[test]
fn z_order_overflow_propagates() {
    let mut deep = ZOrderKey::for_index(0).unwrap();
    for _ in 0..7 {
        deep = ZOrderKey::nest(deep, ZOrderKey::for_index(0).unwrap()).unwrap();
    }
    let a = LayerTransform::identity(None, 1.0, 1.0).with_z_order(deep);
    let b = LayerTransform::identity(None, 1.0, 1.0).with_z_order(ZOrderKey::for_index(2).unwrap());
    let err = compose(&a, &b).unwrap_err();
    assert!(matches!(err, LayervalError::ZOrderOverflow { .. }));
}
