use super::*;
use crate::foundation::core::Rect;

fn desc(source: BufferSource) -> BufferDesc {
    BufferDesc {
        width: 32,
        height: 16,
        format: PixelFormat::Xrgb8888,
        source,
    }
}

#[test]
fn removed_handles_go_stale_when_slot_is_reused() {
    let mut store = BufferStore::new();
    let a = store.insert(desc(BufferSource::Input));
    assert!(store.is_alive(a));
    assert_eq!(store.len(), 1);

    store.remove(a).unwrap();
    assert!(!store.is_alive(a));
    assert!(store.is_empty());

    let b = store.insert(desc(BufferSource::Hwc));
    assert_eq!(b.index(), a.index());
    assert_eq!(b.generation(), a.generation() + 1);
    assert!(matches!(store.desc(a), Err(LayervalError::StaleBuffer(r)) if r == a));
    assert!(store.remove(a).is_err());
    assert_eq!(store.desc(b).unwrap().source, BufferSource::Hwc);
}

#[test]
fn handle_carries_provenance() {
    let mut store = BufferStore::new();
    let target = store.insert(desc(BufferSource::ClientComposition));
    assert_eq!(target.origin(), BufferSource::ClientComposition);
    assert!(target.is_composition_target());
    assert_eq!(format!("{target:?}"), "BufferRef(0@gen0 Sf)");
}

#[test]
fn ancestry_is_searched_transitively() {
    let mut store = BufferStore::new();
    let leaf = store.insert(desc(BufferSource::Input));
    let mid = store.insert(desc(BufferSource::ClientComposition));
    let top = store.insert(desc(BufferSource::PartitionedComposer));
    let other = store.insert(desc(BufferSource::Input));

    store
        .add_combined_from(mid, LayerTransform::identity(Some(leaf), 32.0, 16.0))
        .unwrap();
    store
        .set_combined_from(top, vec![LayerTransform::identity(Some(mid), 32.0, 16.0)])
        .unwrap();

    assert_eq!(store.combined_from(top).unwrap().len(), 1);
    assert!(store.is_combined_from(top, leaf).unwrap());
    assert!(store.is_combined_from(top, mid).unwrap());
    assert!(!store.is_combined_from(top, other).unwrap());
    assert!(!store.is_combined_from(leaf, top).unwrap());
}

#[test]
fn cyclic_ancestry_search_terminates() {
    let mut store = BufferStore::new();
    let a = store.insert(desc(BufferSource::ClientComposition));
    let unrelated = store.insert(desc(BufferSource::Input));
    store
        .add_combined_from(
            a,
            LayerTransform::clip(Rect::new(0.0, 0.0, 1.0, 1.0)).with_source(Some(a)),
        )
        .unwrap();
    assert!(matches!(
        store.is_combined_from(a, unrelated),
        Err(LayervalError::AncestryTooDeep(_))
    ));
}

#[test]
fn usage_marks_reset_and_report_unused_targets() {
    let mut store = BufferStore::new();
    let input = store.insert(desc(BufferSource::Input));
    let shown = store.insert(desc(BufferSource::ClientComposition));
    let dropped = store.insert(desc(BufferSource::Writeback));

    store.mark_used(shown).unwrap();
    assert!(store.is_used(shown).unwrap());
    assert!(!store.is_used(input).unwrap());
    assert_eq!(store.unused_composition_targets(), vec![dropped]);

    store.reset_usage();
    assert!(!store.is_used(shown).unwrap());
    assert_eq!(store.unused_composition_targets().len(), 2);
}

#[test]
fn pixel_alpha_comes_from_format() {
    let mut store = BufferStore::new();
    let opaque = store.insert(desc(BufferSource::Input));
    let alpha = store.insert(BufferDesc {
        format: PixelFormat::Rgba8888,
        ..desc(BufferSource::Input)
    });
    assert!(!store.has_pixel_alpha(opaque).unwrap());
    assert!(store.has_pixel_alpha(alpha).unwrap());
}
