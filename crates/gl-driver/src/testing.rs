//! In-memory [`GlDriver`] for tests.
//!
//! [`RecordingDriver`] models the driver objects the sharing subsystem
//! touches — texture names, shared images, fences — without a GPU. Fences
//! never signal on their own; tests advance them with
//! [`RecordingDriver::complete_all_fences`], which is what lets hazard
//! ordering be asserted deterministically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use gl::types::GLuint;

use crate::capabilities::REQUIRED_EXTENSIONS;
use crate::driver::{FenceId, GlDriver, ImageId};
use crate::types::{LevelInfo, MagFilter, MinFilter, TextureTarget, WrapMode};

/// Parameter/level state recorded for one texture name.
#[derive(Debug, Clone, Default)]
pub struct TextureRecord {
    pub target: Option<TextureTarget>,
    pub min_filter: Option<MinFilter>,
    pub mag_filter: Option<MagFilter>,
    pub wrap_s: Option<WrapMode>,
    pub wrap_t: Option<WrapMode>,
    pub levels: HashMap<i32, LevelInfo>,
}

/// State recorded for one shared image.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    /// Texture whose storage the image wraps.
    pub source_texture: GLuint,
    /// Every (texture, target) the image was bound to, in order.
    pub bindings: Vec<(GLuint, TextureTarget)>,
}

#[derive(Debug, Default)]
struct FenceRecord {
    signaled: bool,
    server_waits: u32,
}

#[derive(Default)]
struct State {
    next_texture: GLuint,
    next_image: u64,
    next_fence: u64,
    textures: HashMap<GLuint, TextureRecord>,
    images: HashMap<ImageId, ImageRecord>,
    destroyed_images: Vec<ImageId>,
    fences: HashMap<FenceId, FenceRecord>,
    flushes: u32,
    fail_image_creation: bool,
    fail_texture_allocation: bool,
}

/// In-memory driver with manual fence advancement and failure injection.
pub struct RecordingDriver {
    extensions: Vec<&'static str>,
    state: Mutex<State>,
}

impl RecordingDriver {
    /// Driver advertising the full required extension set.
    pub fn new() -> Self {
        Self {
            extensions: REQUIRED_EXTENSIONS.to_vec(),
            state: Mutex::new(State::default()),
        }
    }

    /// Driver missing one required extension, for capability-gate tests.
    pub fn without_extension(name: &str) -> Self {
        Self {
            extensions: REQUIRED_EXTENSIONS
                .iter()
                .copied()
                .filter(|ext| *ext != name)
                .collect(),
            state: Mutex::new(State::default()),
        }
    }

    /// Borrow the concrete driver back out of an `Arc<dyn GlDriver>`.
    pub fn downcast(driver: &Arc<dyn GlDriver>) -> &RecordingDriver {
        driver
            .as_any()
            .downcast_ref()
            .expect("driver is not a RecordingDriver")
    }

    /// Make every subsequent [`GlDriver::create_image`] call fail.
    pub fn fail_image_creation(&self, fail: bool) {
        self.state.lock().unwrap().fail_image_creation = fail;
    }

    /// Make every subsequent [`GlDriver::gen_texture`] call return 0.
    pub fn fail_texture_allocation(&self, fail: bool) {
        self.state.lock().unwrap().fail_texture_allocation = fail;
    }

    /// Mark all currently outstanding fences signaled.
    pub fn complete_all_fences(&self) {
        for fence in self.state.lock().unwrap().fences.values_mut() {
            fence.signaled = true;
        }
    }

    pub fn fence_alive(&self, fence: FenceId) -> bool {
        self.state.lock().unwrap().fences.contains_key(&fence)
    }

    pub fn server_wait_count(&self, fence: FenceId) -> u32 {
        self.state
            .lock()
            .unwrap()
            .fences
            .get(&fence)
            .map(|f| f.server_waits)
            .unwrap_or(0)
    }

    /// Total GPU-side waits enqueued across all fences, live or deleted.
    pub fn total_server_waits(&self) -> u32 {
        self.state
            .lock()
            .unwrap()
            .fences
            .values()
            .map(|f| f.server_waits)
            .sum()
    }

    pub fn live_fence_count(&self) -> usize {
        self.state.lock().unwrap().fences.len()
    }

    pub fn flush_count(&self) -> u32 {
        self.state.lock().unwrap().flushes
    }

    pub fn live_image_count(&self) -> usize {
        self.state.lock().unwrap().images.len()
    }

    pub fn image_record(&self, image: ImageId) -> Option<ImageRecord> {
        self.state.lock().unwrap().images.get(&image).cloned()
    }

    pub fn texture_record(&self, texture: GLuint) -> Option<TextureRecord> {
        self.state.lock().unwrap().textures.get(&texture).cloned()
    }

    pub fn was_image_destroyed(&self, image: ImageId) -> bool {
        self.state.lock().unwrap().destroyed_images.contains(&image)
    }
}

impl Default for RecordingDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl GlDriver for RecordingDriver {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| *ext == name)
    }

    fn gen_texture(&self) -> GLuint {
        let mut state = self.state.lock().unwrap();
        if state.fail_texture_allocation {
            return 0;
        }
        state.next_texture += 1;
        let id = state.next_texture;
        state.textures.insert(id, TextureRecord::default());
        id
    }

    fn delete_texture(&self, texture: GLuint) {
        self.state.lock().unwrap().textures.remove(&texture);
    }

    fn set_parameters(
        &self,
        texture: GLuint,
        target: TextureTarget,
        min_filter: MinFilter,
        mag_filter: MagFilter,
        wrap_s: WrapMode,
        wrap_t: WrapMode,
    ) {
        let mut state = self.state.lock().unwrap();
        let record = state.textures.entry(texture).or_default();
        record.target = Some(target);
        record.min_filter = Some(min_filter);
        record.mag_filter = Some(mag_filter);
        record.wrap_s = Some(wrap_s);
        record.wrap_t = Some(wrap_t);
    }

    fn set_level_storage(
        &self,
        texture: GLuint,
        target: TextureTarget,
        level: i32,
        info: &LevelInfo,
    ) {
        let mut state = self.state.lock().unwrap();
        let record = state.textures.entry(texture).or_default();
        record.target = Some(target);
        record.levels.insert(level, *info);
    }

    fn create_image(&self, texture: GLuint) -> Option<ImageId> {
        let mut state = self.state.lock().unwrap();
        if state.fail_image_creation {
            return None;
        }
        state.next_image += 1;
        let id = ImageId(state.next_image);
        state.images.insert(
            id,
            ImageRecord {
                source_texture: texture,
                bindings: Vec::new(),
            },
        );
        Some(id)
    }

    fn destroy_image(&self, image: ImageId) {
        let mut state = self.state.lock().unwrap();
        state.images.remove(&image);
        state.destroyed_images.push(image);
    }

    fn bind_image(&self, image: ImageId, texture: GLuint, target: TextureTarget) {
        if let Some(record) = self.state.lock().unwrap().images.get_mut(&image) {
            record.bindings.push((texture, target));
        }
    }

    fn insert_fence(&self) -> FenceId {
        let mut state = self.state.lock().unwrap();
        state.next_fence += 1;
        let id = FenceId(state.next_fence);
        state.fences.insert(id, FenceRecord::default());
        id
    }

    fn server_wait_fence(&self, fence: FenceId) {
        if let Some(record) = self.state.lock().unwrap().fences.get_mut(&fence) {
            record.server_waits += 1;
        }
    }

    fn poll_fence(&self, fence: FenceId) -> bool {
        self.state
            .lock()
            .unwrap()
            .fences
            .get(&fence)
            .map(|f| f.signaled)
            .unwrap_or(true)
    }

    fn delete_fence(&self, fence: FenceId) {
        self.state.lock().unwrap().fences.remove(&fence);
    }

    fn flush(&self) {
        self.state.lock().unwrap().flushes += 1;
    }
}
