//! Shared native images and their read/write hazard tracking.
//!
//! A [`NativeImage`] wraps one driver shared image whose pixel storage is
//! aliased by texture objects in several contexts. Hazards between those
//! contexts are resolved with GPU fences only — a write waits queue-side on
//! all prior readers, a read waits on the outstanding write — so no CPU
//! blocking is ever introduced.
//!
//! The attachment layer drives the hazard calls in matching pairs:
//! `will_write`/`did_write` around a write, `will_read`/`did_read` around a
//! read, with [`NativeImage::bind_to_texture`] between the `will_*` call and
//! the GPU work it fences.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use gl::types::GLuint;
use gl_driver::{GlDriver, GlFence, ImageId, TextureTarget};
use tracing::error;

static NEXT_CLIENT: AtomicU64 = AtomicU64::new(1);

/// Identifies one consumer (a texture's image attachment) of a
/// [`NativeImage`]. Tokens are process-unique, so a token minted by one
/// image never passes another image's client check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageClient(u64);

struct ClientState {
    /// Fence after this client's most recent read; a later writer waits on it.
    read_fence: Option<GlFence>,
    /// Whether this client must wait on the outstanding write fence before
    /// its next read. Set by a write, cleared by the first read after it.
    awaits_write: bool,
    /// Removed while a read fence was still pending; reaped once it signals.
    tombstoned: bool,
}

struct Hazards {
    clients: HashMap<ImageClient, ClientState>,
    /// Fence after the most recent write, with the client that issued it.
    write_fence: Option<GlFence>,
    writer: Option<ImageClient>,
}

/// Ref-counted handle to one driver shared image, with per-client fence
/// hazard tracking. The hazard lock is independent of the synchronizer's
/// lock and is always acquired after it, never before.
pub struct NativeImage {
    driver: Arc<dyn GlDriver>,
    id: ImageId,
    hazards: Mutex<Hazards>,
}

impl NativeImage {
    /// Wrap a texture's storage in a new shared image.
    ///
    /// An initial write fence is installed: the wrapped texture's content
    /// was produced before the image existed, so every consumer's first read
    /// must wait for it. Returns `None` if the driver refuses the
    /// allocation.
    pub fn create(driver: &Arc<dyn GlDriver>, source_texture: GLuint) -> Option<Arc<Self>> {
        let Some(id) = driver.create_image(source_texture) else {
            error!("shared image creation failed for texture {source_texture}");
            return None;
        };
        Some(Arc::new(Self {
            driver: Arc::clone(driver),
            id,
            hazards: Mutex::new(Hazards {
                clients: HashMap::new(),
                write_fence: Some(GlFence::insert(driver)),
                writer: None,
            }),
        }))
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    /// Register a new consumer. If a write fence is outstanding, the new
    /// client's first read will wait on it.
    pub fn add_client(&self) -> ImageClient {
        let client = ImageClient(NEXT_CLIENT.fetch_add(1, Ordering::Relaxed));
        let mut hazards = self.hazards.lock().unwrap();
        let awaits_write = hazards.write_fence.is_some();
        hazards.clients.insert(
            client,
            ClientState {
                read_fence: None,
                awaits_write,
                tombstoned: false,
            },
        );
        client
    }

    /// Whether `client` is a live registered consumer of this image.
    pub fn is_client(&self, client: ImageClient) -> bool {
        self.hazards
            .lock()
            .unwrap()
            .clients
            .get(&client)
            .is_some_and(|state| !state.tombstoned)
    }

    /// Unregister a consumer.
    ///
    /// If the client holds the outstanding write fence, that slot is
    /// cleared. A client with a still-pending read fence is tombstoned and
    /// reaped lazily once its fence is observed complete, so removal never
    /// waits on the GPU.
    pub fn remove_client(&self, client: ImageClient) {
        let mut hazards = self.hazards.lock().unwrap();
        if hazards.writer == Some(client) {
            hazards.writer = None;
            hazards.write_fence = None;
        }
        let Some(state) = hazards.clients.get_mut(&client) else {
            return;
        };
        let read_pending = state
            .read_fence
            .as_ref()
            .is_some_and(|fence| !fence.is_signaled());
        if read_pending {
            state.tombstoned = true;
        } else {
            hazards.clients.remove(&client);
        }
    }

    /// The client is about to sample from the image.
    ///
    /// The first read after a write pays a queue-side wait on the write
    /// fence; subsequent reads by the same client before the next write do
    /// not.
    pub fn will_read(&self, client: ImageClient) {
        let mut hazards = self.hazards.lock().unwrap();
        debug_assert!(hazards.clients.contains_key(&client));
        let needs_wait = hazards
            .clients
            .get(&client)
            .is_some_and(|state| state.awaits_write);
        if !needs_wait {
            return;
        }
        if let Some(fence) = &hazards.write_fence {
            fence.server_wait();
        }
        if let Some(state) = hazards.clients.get_mut(&client) {
            state.awaits_write = false;
        }
    }

    /// The client's read has been issued; a future writer waits on it.
    pub fn did_read(&self, client: ImageClient) {
        let mut hazards = self.hazards.lock().unwrap();
        debug_assert!(hazards.clients.contains_key(&client));
        let fence = GlFence::insert(&self.driver);
        if let Some(state) = hazards.clients.get_mut(&client) {
            state.read_fence = Some(fence);
        }
    }

    /// The client is about to write to the image.
    ///
    /// Waits on the outstanding write fence if it belongs to another client,
    /// then on every other client's pending read fence. Read fences that
    /// have already signaled are reaped, along with any tombstoned client
    /// whose fence completed.
    pub fn will_write(&self, client: ImageClient) {
        let mut hazards = self.hazards.lock().unwrap();
        if hazards.writer != Some(client) {
            if let Some(fence) = &hazards.write_fence {
                fence.server_wait();
            }
        }
        for (id, state) in hazards.clients.iter_mut() {
            if *id == client {
                continue;
            }
            if let Some(fence) = &state.read_fence {
                fence.server_wait();
                if fence.is_signaled() {
                    state.read_fence = None;
                }
            }
        }
        hazards
            .clients
            .retain(|_, state| !(state.tombstoned && state.read_fence.is_none()));
    }

    /// The client's write has been issued. Every client must wait before
    /// its next read.
    pub fn did_write(&self, client: ImageClient) {
        let mut hazards = self.hazards.lock().unwrap();
        debug_assert!(hazards.clients.contains_key(&client));
        hazards.write_fence = Some(GlFence::insert(&self.driver));
        hazards.writer = Some(client);
        for state in hazards.clients.values_mut() {
            state.awaits_write = true;
        }
    }

    /// Attach the image to a texture object, aliasing its pixel storage.
    /// Must be preceded by the appropriate hazard wait.
    pub fn bind_to_texture(&self, texture: GLuint, target: TextureTarget) {
        self.driver.bind_image(self.id, texture, target);
    }

    /// Whether a write fence is currently outstanding.
    pub fn has_outstanding_write_fence(&self) -> bool {
        self.hazards.lock().unwrap().write_fence.is_some()
    }

    /// Number of registered clients, tombstoned ones included.
    pub fn client_count(&self) -> usize {
        self.hazards.lock().unwrap().clients.len()
    }
}

impl Drop for NativeImage {
    fn drop(&mut self) {
        self.driver.destroy_image(self.id);
    }
}

impl std::fmt::Debug for NativeImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeImage")
            .field("id", &self.id)
            .field("clients", &self.client_count())
            .finish()
    }
}
