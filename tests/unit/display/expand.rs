use super::*;
use crate::buffer::format::PixelFormat;
use crate::buffer::source::BufferSource;
use crate::buffer::store::BufferDesc;
use crate::display::plane::PlaneUpdate;
use crate::foundation::core::{PixelRect, Rect};
use crate::transform::discrete::DiscreteTransform;
use crate::transform::layer::{BlendMode, Placement};

fn desc(width: u32, height: u32, source: BufferSource) -> BufferDesc {
    BufferDesc {
        width,
        height,
        format: PixelFormat::Argb8888,
        source,
    }
}

fn placement(crop: [f64; 4], df: [i32; 4]) -> Placement {
    Placement {
        source_crop: Rect::new(crop[0], crop[1], crop[2], crop[3]),
        display_frame: PixelRect::from(df),
        transform: DiscreteTransform::Identity,
    }
}

fn contributor(buf: BufferRef, index: u32, df: [i32; 4]) -> LayerTransform {
    LayerTransform::from_placement(Some(buf), &placement([0.0, 0.0, 100.0, 100.0], df))
        .with_layer_index(index)
        .with_z_order(ZOrderKey::for_index(index).unwrap())
}

fn plane_showing(buf: BufferRef, z: u32, blend: BlendMode, df: [i32; 4]) -> PlaneBinding {
    let mut plane = PlaneBinding::new(10 + z, z);
    plane
        .bind(&PlaneUpdate {
            buffer: buf,
            placement: placement([0.0, 0.0, 200.0, 100.0], df),
            format: PixelFormat::Xrgb8888,
            blend,
            plane_alpha: 1.0,
        })
        .unwrap();
    plane.flip();
    plane
}

/// Two 100×100 inputs side by side in a 200×100 client composition target.
fn composed_target(store: &mut BufferStore) -> (BufferRef, BufferRef, BufferRef) {
    let a = store.insert(desc(100, 100, BufferSource::Input));
    let b = store.insert(desc(100, 100, BufferSource::Input));
    let target = store.insert(desc(200, 100, BufferSource::ClientComposition));
    store
        .set_combined_from(
            target,
            vec![
                contributor(a, 0, [0, 0, 100, 100]),
                contributor(b, 1, [100, 0, 200, 100]),
            ],
        )
        .unwrap();
    (a, b, target)
}

#[test]
fn composed_buffer_expands_to_one_leaf_per_layer_in_z_order() {
    let mut store = BufferStore::new();
    let (a, b, target) = composed_target(&mut store);
    let plane = plane_showing(target, 1, BlendMode::None, [0, 0, 200, 100]);

    let mut set = ExpandedSet::new();
    expand_plane(&plane, None, true, &mut store, &mut set).unwrap();
    assert!(store.is_used(target).unwrap());

    let leaves: Vec<_> = set.iter().cloned().collect();
    assert_eq!(leaves.len(), 2);
    assert_eq!(leaves[0].source(), Some(a));
    assert_eq!(leaves[1].source(), Some(b));
    assert_eq!(leaves[0].effective_display_frame(), PixelRect::new(0, 0, 100, 100));
    assert_eq!(leaves[1].effective_display_frame(), PixelRect::new(100, 0, 200, 100));
    for (i, leaf) in leaves.iter().enumerate() {
        assert_eq!(leaf.z_order().field(0), 1);
        assert_eq!(u32::from(leaf.z_order().field(1)), u32::try_from(i).unwrap());
        assert!(leaf.composed_from().contains(BufferSource::Input));
        assert!(leaf.composed_from().contains(BufferSource::ClientComposition));
    }
}

#[test]
fn panel_fitter_scales_every_leaf() {
    let mut store = BufferStore::new();
    let (_, b, target) = composed_target(&mut store);
    let plane = plane_showing(target, 0, BlendMode::None, [0, 0, 200, 100]);
    let pf = LayerTransform::scaling(200.0, 100.0, 400.0, 200.0);

    let mut set = ExpandedSet::new();
    expand_plane(&plane, Some(&pf), true, &mut store, &mut set).unwrap();
    let last = set.iter().last().unwrap();
    assert_eq!(last.source(), Some(b));
    assert_eq!(last.effective_display_frame(), PixelRect::new(200, 0, 400, 200));
}

#[test]
fn nested_composition_accumulates_source_bits() {
    let mut store = BufferStore::new();
    let (a, _, target) = composed_target(&mut store);
    let outer = store.insert(desc(200, 100, BufferSource::PartitionedComposer));
    store
        .set_combined_from(
            outer,
            vec![
                LayerTransform::from_placement(
                    Some(target),
                    &placement([0.0, 0.0, 200.0, 100.0], [0, 0, 200, 100]),
                )
                .with_z_order(ZOrderKey::for_index(0).unwrap()),
            ],
        )
        .unwrap();
    let plane = plane_showing(outer, 2, BlendMode::None, [0, 0, 200, 100]);

    let mut set = ExpandedSet::new();
    expand_plane(&plane, None, true, &mut store, &mut set).unwrap();
    assert_eq!(set.len(), 2);
    let first = set.iter().next().unwrap();
    assert_eq!(first.source(), Some(a));
    assert_eq!(first.z_order().levels(), 3);
    for s in [
        BufferSource::Input,
        BufferSource::ClientComposition,
        BufferSource::PartitionedComposer,
    ] {
        assert!(first.composed_from().contains(s), "{s:?}");
    }
}

#[test]
fn coverage_onto_composed_buffer_is_collected() {
    let mut store = BufferStore::new();
    let (_, _, target) = composed_target(&mut store);
    let plane = plane_showing(target, 1, BlendMode::Coverage, [0, 0, 200, 100]);

    let mut set = ExpandedSet::new();
    expand_plane(&plane, None, true, &mut store, &mut set).unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(set.violations().len(), 2);
    assert_eq!(set.violations()[0].layer_index, Some(0));
}

#[test]
fn duplicate_z_order_is_an_error() {
    let mut store = BufferStore::new();
    let a = store.insert(desc(100, 100, BufferSource::Input));
    let target = store.insert(desc(200, 100, BufferSource::ClientComposition));
    store
        .set_combined_from(
            target,
            vec![
                contributor(a, 0, [0, 0, 100, 100]),
                contributor(a, 0, [100, 0, 200, 100]),
            ],
        )
        .unwrap();
    let plane = plane_showing(target, 1, BlendMode::None, [0, 0, 200, 100]);

    let mut set = ExpandedSet::new();
    let err = expand_plane(&plane, None, true, &mut store, &mut set).unwrap_err();
    assert!(matches!(err, LayervalError::DuplicateZOrder { .. }));
}

#[test]
fn cyclic_ancestry_is_bounded() {
    let mut store = BufferStore::new();
    let target = store.insert(desc(200, 100, BufferSource::ClientComposition));
    store
        .add_combined_from(
            target,
            LayerTransform::from_placement(
                Some(target),
                &placement([0.0, 0.0, 200.0, 100.0], [0, 0, 200, 100]),
            ),
        )
        .unwrap();
    let plane = plane_showing(target, 1, BlendMode::None, [0, 0, 200, 100]);

    let mut set = ExpandedSet::new();
    let err = expand_plane(&plane, None, true, &mut store, &mut set).unwrap_err();
    assert!(matches!(err, LayervalError::AncestryTooDeep(_)));
}

#[test]
fn failed_display_set_leaves_buffer_unused() {
    let mut store = BufferStore::new();
    let (_, _, target) = composed_target(&mut store);
    let mut plane = plane_showing(target, 1, BlendMode::None, [0, 0, 200, 100]);
    plane.mark_set_display_failed();

    let mut set = ExpandedSet::new();
    expand_plane(&plane, None, true, &mut store, &mut set).unwrap();
    assert!(!store.is_used(target).unwrap());

    let plane = plane_showing(target, 1, BlendMode::None, [0, 0, 200, 100]);
    let mut set = ExpandedSet::new();
    expand_plane(&plane, None, false, &mut store, &mut set).unwrap();
    assert!(!store.is_used(target).unwrap());
}

#[test]
fn stale_plane_buffer_is_an_error() {
    let mut store = BufferStore::new();
    let a = store.insert(desc(200, 100, BufferSource::Input));
    let plane = plane_showing(a, 0, BlendMode::None, [0, 0, 200, 100]);
    store.remove(a).unwrap();

    let mut set = ExpandedSet::new();
    let err = expand_plane(&plane, None, true, &mut store, &mut set).unwrap_err();
    assert!(matches!(err, LayervalError::StaleBuffer(r) if r == a));
}
