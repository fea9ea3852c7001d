use gl_driver::testing::RecordingDriver;
use gl_driver::GlDriver;
use std::sync::Arc;

use super::support;
use crate::image::NativeImage;

#[test]
fn create_wraps_the_source_texture_storage() {
    let (recording, driver) = support::driver();
    let image = NativeImage::create(&driver, 7).unwrap();

    let record = recording.image_record(image.id()).unwrap();
    assert_eq!(record.source_texture, 7);
    assert!(image.has_outstanding_write_fence());
}

#[test]
fn create_returns_none_when_the_driver_refuses() {
    let (recording, driver) = support::driver();
    recording.fail_image_creation(true);
    assert!(NativeImage::create(&driver, 7).is_none());
}

#[test]
fn first_read_after_a_write_pays_one_wait() {
    let (recording, driver) = support::driver();
    let image = NativeImage::create(&driver, 1).unwrap();
    let reader = image.add_client();

    let before = recording.total_server_waits();
    image.will_read(reader);
    assert_eq!(recording.total_server_waits(), before + 1);

    // Repeated reads before the next write pay nothing further.
    image.did_read(reader);
    image.will_read(reader);
    assert_eq!(recording.total_server_waits(), before + 1);
}

#[test]
fn a_write_marks_every_client_for_a_fresh_wait() {
    let (recording, driver) = support::driver();
    let image = NativeImage::create(&driver, 1).unwrap();
    let writer = image.add_client();
    let reader = image.add_client();

    image.will_read(reader);
    image.did_read(reader);

    image.will_write(writer);
    image.did_write(writer);

    let before = recording.total_server_waits();
    image.will_read(reader);
    assert_eq!(recording.total_server_waits(), before + 1);
}

#[test]
fn a_writer_waits_on_the_write_fence_and_all_other_readers() {
    let (recording, driver) = support::driver();
    let image = NativeImage::create(&driver, 1).unwrap();
    let writer = image.add_client();
    let reader = image.add_client();

    image.will_read(reader);
    image.did_read(reader);

    // One wait for the outstanding write fence, one for the reader's fence.
    let before = recording.total_server_waits();
    image.will_write(writer);
    assert_eq!(recording.total_server_waits(), before + 2);
}

#[test]
fn a_writer_does_not_wait_on_its_own_previous_write() {
    let (recording, driver) = support::driver();
    let image = NativeImage::create(&driver, 1).unwrap();
    let writer = image.add_client();

    image.will_write(writer);
    image.did_write(writer);

    let before = recording.total_server_waits();
    image.will_write(writer);
    assert_eq!(recording.total_server_waits(), before);
}

#[test]
fn removing_the_writer_clears_the_write_fence_slot() {
    let (_recording, driver) = support::driver();
    let image = NativeImage::create(&driver, 1).unwrap();
    let writer = image.add_client();

    image.will_write(writer);
    image.did_write(writer);
    assert!(image.has_outstanding_write_fence());

    image.remove_client(writer);
    assert!(!image.has_outstanding_write_fence());
    assert!(!image.is_client(writer));
}

#[test]
fn client_with_pending_read_fence_is_tombstoned_then_reaped() {
    let (recording, driver) = support::driver();
    let image = NativeImage::create(&driver, 1).unwrap();
    let writer = image.add_client();
    let reader = image.add_client();

    image.will_read(reader);
    image.did_read(reader);

    // The read fence has not signaled; removal must not block, so the
    // client is kept as a tombstone.
    image.remove_client(reader);
    assert!(!image.is_client(reader));
    assert_eq!(image.client_count(), 2);

    recording.complete_all_fences();
    image.will_write(writer);
    assert_eq!(image.client_count(), 1);
}

#[test]
fn client_with_signaled_read_fence_is_removed_immediately() {
    let (recording, driver) = support::driver();
    let image = NativeImage::create(&driver, 1).unwrap();
    let reader = image.add_client();

    image.will_read(reader);
    image.did_read(reader);
    recording.complete_all_fences();

    image.remove_client(reader);
    assert_eq!(image.client_count(), 0);
}

#[test]
fn dropping_the_last_handle_destroys_the_driver_image() {
    let recording = Arc::new(RecordingDriver::new());
    let driver: Arc<dyn GlDriver> = recording.clone();
    let image = NativeImage::create(&driver, 1).unwrap();
    let id = image.id();

    let second = Arc::clone(&image);
    drop(image);
    assert!(!recording.was_image_destroyed(id));

    drop(second);
    assert!(recording.was_image_destroyed(id));
    assert_eq!(recording.live_image_count(), 0);
}
