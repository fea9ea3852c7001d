//! Per-context texture objects.
//!
//! A texture is exclusively owned by the context that allocated it; only
//! that context's registry mutates its GPU state directly. Sharing never
//! hands a [`SharedTexture`] to another context — each context gets its own
//! object, and only the attached [`NativeImage`] storage is common.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use gl::types::GLuint;
use gl_driver::{LevelInfo, MagFilter, MinFilter, TextureTarget, WrapMode};

use crate::image::{ImageClient, NativeImage};
use crate::registry::RegistryShared;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique texture identity, distinct from the driver texture name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Which allocation pool a texture came from. Managed-pool textures are
/// internal compositor resources and never participate in sharing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryPool {
    Unmanaged,
    Managed,
}

/// Defined storage for one mip level.
#[derive(Debug, Clone, Copy)]
pub struct LevelState {
    pub info: LevelInfo,
    pub cleared: bool,
}

/// A shared image attached to a texture, with the client token the texture
/// holds in the image's hazard tracking.
#[derive(Clone)]
pub struct AttachedImage {
    pub image: Arc<NativeImage>,
    pub client: ImageClient,
}

/// Mutable per-context texture state.
pub struct Texture {
    service_id: GLuint,
    target: TextureTarget,
    min_filter: MinFilter,
    mag_filter: MagFilter,
    wrap_s: WrapMode,
    wrap_t: WrapMode,
    immutable: bool,
    pool: MemoryPool,
    levels: Vec<Option<LevelState>>,
    image: Option<AttachedImage>,
}

impl Texture {
    fn new(service_id: GLuint, target: TextureTarget) -> Self {
        Self {
            service_id,
            target,
            // GL defaults.
            min_filter: MinFilter::NearestMipmapLinear,
            mag_filter: MagFilter::Linear,
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
            immutable: false,
            pool: MemoryPool::Unmanaged,
            levels: Vec::new(),
            image: None,
        }
    }

    pub fn service_id(&self) -> GLuint {
        self.service_id
    }

    pub fn target(&self) -> TextureTarget {
        self.target
    }

    pub fn min_filter(&self) -> MinFilter {
        self.min_filter
    }

    pub fn mag_filter(&self) -> MagFilter {
        self.mag_filter
    }

    pub fn wrap_s(&self) -> WrapMode {
        self.wrap_s
    }

    pub fn wrap_t(&self) -> WrapMode {
        self.wrap_t
    }

    pub fn immutable(&self) -> bool {
        self.immutable
    }

    pub fn pool(&self) -> MemoryPool {
        self.pool
    }

    pub fn set_pool(&mut self, pool: MemoryPool) {
        self.pool = pool;
    }

    /// Whether the current minification filter samples mip levels.
    pub fn needs_mips(&self) -> bool {
        self.min_filter.needs_mips()
    }

    pub fn set_parameters(
        &mut self,
        min_filter: MinFilter,
        mag_filter: MagFilter,
        wrap_s: WrapMode,
        wrap_t: WrapMode,
    ) {
        self.min_filter = min_filter;
        self.mag_filter = mag_filter;
        self.wrap_s = wrap_s;
        self.wrap_t = wrap_t;
    }

    pub fn set_immutable(&mut self, immutable: bool) {
        self.immutable = immutable;
    }

    /// Define storage for a level. A structural redefinition of level 0
    /// orphans any attached shared image: the old storage is no longer what
    /// the texture samples.
    pub fn define_level(&mut self, level: usize, info: LevelInfo) {
        if level == 0 {
            let redefined = self
                .level0_info()
                .is_some_and(|existing| existing != info);
            if redefined {
                self.detach_image();
            }
        }
        if self.levels.len() <= level {
            self.levels.resize_with(level + 1, || None);
        }
        self.levels[level] = Some(LevelState {
            info,
            cleared: false,
        });
    }

    pub fn set_level_cleared(&mut self, level: usize, cleared: bool) {
        if let Some(Some(state)) = self.levels.get_mut(level) {
            state.cleared = cleared;
        }
    }

    pub fn level0_info(&self) -> Option<LevelInfo> {
        self.levels.first().and_then(|l| l.as_ref()).map(|l| l.info)
    }

    pub fn level_cleared(&self, level: usize) -> bool {
        self.levels
            .get(level)
            .and_then(|l| l.as_ref())
            .is_some_and(|l| l.cleared)
    }

    pub fn image(&self) -> Option<&AttachedImage> {
        self.image.as_ref()
    }

    /// Attach a shared image; the texture now aliases the image's storage.
    pub fn attach_image(&mut self, image: Arc<NativeImage>, client: ImageClient) {
        self.detach_image();
        self.image = Some(AttachedImage { image, client });
    }

    /// Drop the image attachment, unregistering from its hazard tracking.
    pub fn detach_image(&mut self) {
        if let Some(attached) = self.image.take() {
            attached.image.remove_client(attached.client);
        }
    }
}

/// Handle to one context's texture: the process-unique id, the mutable
/// state, and a backref to the registry currently owning its mailbox
/// bindings. The owning context holds the strong reference; the
/// synchronizer tracks textures by [`TextureId`] only.
pub struct SharedTexture {
    id: TextureId,
    state: Mutex<Texture>,
    owner: Mutex<Weak<RegistryShared>>,
}

/// Strong reference to a [`SharedTexture`].
pub type TextureRef = Arc<SharedTexture>;

impl SharedTexture {
    pub fn new(service_id: GLuint, target: TextureTarget) -> TextureRef {
        Arc::new(Self {
            id: TextureId::next(),
            state: Mutex::new(Texture::new(service_id, target)),
            owner: Mutex::new(Weak::new()),
        })
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    /// Lock the mutable texture state.
    pub fn state(&self) -> MutexGuard<'_, Texture> {
        self.state.lock().unwrap()
    }

    pub fn service_id(&self) -> GLuint {
        self.state().service_id()
    }

    pub fn target(&self) -> TextureTarget {
        self.state().target()
    }

    pub(crate) fn set_mailbox_registry(&self, registry: Weak<RegistryShared>) {
        *self.owner.lock().unwrap() = registry;
    }

    pub(crate) fn clear_mailbox_registry(&self, registry: &Arc<RegistryShared>) {
        let mut owner = self.owner.lock().unwrap();
        if owner
            .upgrade()
            .is_some_and(|current| Arc::ptr_eq(&current, registry))
        {
            *owner = Weak::new();
        }
    }

    pub(crate) fn mailbox_registry(&self) -> Option<Arc<RegistryShared>> {
        self.owner.lock().unwrap().upgrade()
    }
}

impl std::fmt::Debug for SharedTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("SharedTexture")
            .field("id", &self.id)
            .field("service_id", &state.service_id())
            .field("target", &state.target())
            .finish()
    }
}
