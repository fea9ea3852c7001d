use std::sync::Arc;

use gl_driver::{LevelInfo, MagFilter, MinFilter, TextureTarget, WrapMode};

use super::support;
use crate::definition::TextureDefinition;

#[test]
fn capture_makes_a_private_texture_shareable() {
    let (recording, driver) = support::driver();
    let texture = support::make_texture(&driver, TextureTarget::Texture2d, 64);

    let mut state = texture.state();
    assert!(state.image().is_none());

    let definition = TextureDefinition::from_texture(&driver, 1, &mut state);

    let attached = state.image().expect("capture attaches a shared image");
    let shared = definition.image().expect("definition references the image");
    assert!(Arc::ptr_eq(&attached.image, shared));
    assert!(attached.image.is_client(attached.client));
    assert_eq!(
        recording.image_record(shared.id()).unwrap().source_texture,
        state.service_id()
    );
}

#[test]
fn capture_without_defined_content_carries_no_image() {
    let (_recording, driver) = support::driver();
    let service_id = driver.gen_texture();
    let texture = crate::texture::SharedTexture::new(service_id, TextureTarget::Texture2d);

    let mut state = texture.state();
    let definition = TextureDefinition::from_texture(&driver, 1, &mut state);
    assert!(definition.image().is_none());
    assert!(state.image().is_none());
}

#[test]
fn capture_survives_image_allocation_failure() {
    let (recording, driver) = support::driver();
    let texture = support::make_texture(&driver, TextureTarget::Texture2d, 64);

    recording.fail_image_creation(true);
    let mut state = texture.state();
    let definition = TextureDefinition::from_texture(&driver, 1, &mut state);

    assert!(definition.image().is_none());
    assert_eq!(definition.level0(), state.level0_info());
}

#[test]
fn is_older_than_handles_wraparound_at_the_boundary() {
    let (_recording, driver) = support::driver();
    let texture = support::make_texture(&driver, TextureTarget::Texture2d, 8);

    let old = TextureDefinition::from_texture(&driver, 0xFFFF_FFFF, &mut texture.state());
    let new = TextureDefinition::from_texture(&driver, 0, &mut texture.state());

    // 0xFFFFFFFF wraps to just before 0: the old capture is older than
    // version 0, and version 0 is not older than 0xFFFFFFFF.
    assert!(old.is_older_than(0));
    assert!(!new.is_older_than(0xFFFF_FFFF));

    // Equal versions count as older: the holder saw the current state.
    assert!(new.is_older_than(0));
    assert!(old.is_older_than(0xFFFF_FFFF));

    // Ordinary in-range comparisons.
    assert!(new.is_older_than(1));
    assert!(!new.is_older_than(0x8000_0000));
}

#[test]
fn matches_tracks_filter_and_wrap_state() {
    let (_recording, driver) = support::driver();
    let texture = support::make_texture(&driver, TextureTarget::Texture2d, 16);
    let definition = TextureDefinition::from_texture(&driver, 1, &mut texture.state());

    assert!(definition.matches(&texture.state()));

    texture.state().set_parameters(
        MinFilter::Nearest,
        MagFilter::Linear,
        WrapMode::ClampToEdge,
        WrapMode::ClampToEdge,
    );
    assert!(!definition.matches(&texture.state()));
}

#[test]
fn structural_redefinition_orphans_the_attachment_and_breaks_matches() {
    let (_recording, driver) = support::driver();
    let texture = support::make_texture(&driver, TextureTarget::Texture2d, 16);
    let definition = TextureDefinition::from_texture(&driver, 1, &mut texture.state());
    assert!(definition.image().is_some());

    // Redefining level 0 with a different shape orphans the image; the
    // definition expects one, so the texture no longer matches.
    texture.state().define_level(0, LevelInfo::rgba(32, 32));
    assert!(texture.state().image().is_none());
    assert!(!definition.matches(&texture.state()));
}

#[test]
fn create_texture_stamps_a_full_replica() {
    let (recording, driver) = support::driver();
    let source = support::make_texture(&driver, TextureTarget::Texture2d, 64);
    let definition = TextureDefinition::from_texture(&driver, 1, &mut source.state());

    let replica = definition
        .create_texture(&driver)
        .expect("allocation succeeds");
    assert_ne!(replica.service_id(), source.service_id());

    let state = replica.state();
    assert_eq!(state.level0_info(), source.state().level0_info());
    assert!(state.level_cleared(0));
    assert!(state.immutable() == source.state().immutable());

    // Replica aliases the same shared image storage.
    let source_state = source.state();
    let source_image = &source_state.image().unwrap().image;
    let replica_image = &state.image().unwrap().image;
    assert!(Arc::ptr_eq(source_image, replica_image));

    let record = recording.image_record(replica_image.id()).unwrap();
    assert!(record
        .bindings
        .contains(&(state.service_id(), TextureTarget::Texture2d)));

    // Parameters were replayed through the driver.
    let tex_record = recording.texture_record(replica.service_id()).unwrap();
    assert_eq!(tex_record.min_filter, Some(MinFilter::Linear));
    assert_eq!(tex_record.wrap_s, Some(WrapMode::ClampToEdge));
}

#[test]
fn create_texture_propagates_name_allocation_failure() {
    let (recording, driver) = support::driver();
    let source = support::make_texture(&driver, TextureTarget::Texture2d, 64);
    let definition = TextureDefinition::from_texture(&driver, 1, &mut source.state());

    recording.fail_texture_allocation(true);
    assert!(definition.create_texture(&driver).is_none());
}

#[test]
fn update_texture_flushes_exactly_once() {
    let (recording, driver) = support::driver();
    let source = support::make_texture(&driver, TextureTarget::Texture2d, 64);
    let definition = TextureDefinition::from_texture(&driver, 1, &mut source.state());
    let replica = definition.create_texture(&driver).unwrap();

    let before = recording.flush_count();
    definition.update_texture(&driver, &mut replica.state());
    assert_eq!(recording.flush_count(), before + 1);
}
