//! Per-context mailbox registry.
//!
//! Each rendering context owns one [`MailboxRegistry`]: a bidirectional
//! table between [`TargetName`] keys and locally-owned textures. Produce and
//! consume only touch this table; the global synchronizer is involved at
//! explicit push/pull sync points, and on consume misses.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use gl_driver::TextureTarget;

use crate::mailbox::{Mailbox, TargetName};
use crate::sync::MailboxSynchronizer;
use crate::texture::{TextureId, TextureRef};

#[derive(Default)]
struct BiMap {
    by_name: BTreeMap<TargetName, TextureRef>,
    by_texture: HashMap<TextureId, BTreeSet<TargetName>>,
}

impl BiMap {
    fn assert_bijection(&self) {
        debug_assert_eq!(
            self.by_name.len(),
            self.by_texture.values().map(BTreeSet::len).sum::<usize>(),
        );
    }

    fn unlink(&mut self, name: &TargetName, texture_id: TextureId) {
        if let Some(names) = self.by_texture.get_mut(&texture_id) {
            names.remove(name);
            if names.is_empty() {
                self.by_texture.remove(&texture_id);
            }
        }
    }
}

/// The registry state textures hold a weak backref to.
pub(crate) struct RegistryShared {
    maps: Mutex<BiMap>,
}

impl RegistryShared {
    /// Snapshot of all current bindings, for push/pull iteration.
    pub(crate) fn bindings(&self) -> Vec<(TargetName, TextureRef)> {
        let maps = self.maps.lock().unwrap();
        maps.by_name
            .iter()
            .map(|(name, texture)| (*name, Arc::clone(texture)))
            .collect()
    }
}

/// A context's produce/consume surface for mailbox-named textures.
pub struct MailboxRegistry {
    shared: Arc<RegistryShared>,
    sync: Option<Arc<MailboxSynchronizer>>,
}

impl MailboxRegistry {
    /// A registry with sharing disabled: produce/consume work within this
    /// context, push/pull are no-ops. The fallback when the capability gate
    /// fails.
    pub fn new_local() -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                maps: Mutex::new(BiMap::default()),
            }),
            sync: None,
        }
    }

    /// A registry wired to the process-wide synchronizer.
    pub fn with_synchronizer(sync: Arc<MailboxSynchronizer>) -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                maps: Mutex::new(BiMap::default()),
            }),
            sync: Some(sync),
        }
    }

    /// Whether this registry participates in cross-context sharing.
    pub fn uses_sync(&self) -> bool {
        self.sync.is_some()
    }

    /// Bind a local texture under `(target, mailbox)`.
    ///
    /// Rebinding the same texture is a no-op. Rebinding a different texture
    /// replaces the old binding for this key only; the old texture keeps any
    /// other mailbox bindings it has.
    pub fn produce_texture(&self, target: TextureTarget, mailbox: Mailbox, texture: &TextureRef) {
        // A texture's mailbox bindings live in at most one registry.
        debug_assert!(texture
            .mailbox_registry()
            .map_or(true, |owner| Arc::ptr_eq(&owner, &self.shared)));

        let name = TargetName::new(target, mailbox);
        let mut maps = self.shared.maps.lock().unwrap();

        if let Some(existing) = maps.by_name.get(&name) {
            if Arc::ptr_eq(existing, texture) {
                return;
            }
            let old_id = existing.id();
            maps.unlink(&name, old_id);
        }

        maps.by_name.insert(name, Arc::clone(texture));
        maps.by_texture.entry(texture.id()).or_default().insert(name);
        maps.assert_bijection();
        drop(maps);

        texture.set_mailbox_registry(Arc::downgrade(&self.shared));
    }

    /// Look up the texture bound under `(target, mailbox)`.
    ///
    /// A local binding is returned directly. Otherwise, with a synchronizer
    /// active, a new local texture is materialized from the current merged
    /// snapshot (and produced into this registry). Returns `None` if no
    /// snapshot exists for the mailbox or the target does not match.
    pub fn consume_texture(&self, target: TextureTarget, mailbox: Mailbox) -> Option<TextureRef> {
        let name = TargetName::new(target, mailbox);
        {
            let maps = self.shared.maps.lock().unwrap();
            if let Some(texture) = maps.by_name.get(&name) {
                if texture.target() != target {
                    return None;
                }
                return Some(Arc::clone(texture));
            }
        }

        let sync = self.sync.as_ref()?;
        let texture = sync.create_texture_from_mailbox(target, mailbox)?;
        self.produce_texture(target, mailbox, &texture);
        Some(texture)
    }

    /// The owning context is releasing this texture.
    ///
    /// Every mailbox binding pointing at it is purged, and the synchronizer
    /// folds the texture's final state into its group before forgetting it —
    /// losing the last edit on deletion would break most-recent-write-wins.
    pub fn texture_deleted(&self, texture: &TextureRef) {
        {
            let mut maps = self.shared.maps.lock().unwrap();
            if let Some(names) = maps.by_texture.remove(&texture.id()) {
                for name in names {
                    let removed = maps.by_name.remove(&name);
                    debug_assert!(removed.is_some());
                }
            }
            maps.assert_bijection();
        }
        texture.clear_mailbox_registry(&self.shared);

        if let Some(sync) = &self.sync {
            sync.texture_deleted(texture);
        }
    }

    /// Publish this registry's current bindings into the synchronizer.
    pub fn push_texture_updates(&self) {
        if let Some(sync) = &self.sync {
            sync.push_texture_updates(self);
        }
    }

    /// Refresh this registry's bound textures from the synchronizer's
    /// latest snapshots.
    pub fn pull_texture_updates(&self) {
        if let Some(sync) = &self.sync {
            sync.pull_texture_updates(self);
        }
    }

    pub(crate) fn shared(&self) -> &Arc<RegistryShared> {
        &self.shared
    }

    /// Number of live mailbox bindings in this registry.
    pub fn binding_count(&self) -> usize {
        self.shared.maps.lock().unwrap().by_name.len()
    }
}
