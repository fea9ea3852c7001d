//! Process-wide mailbox synchronizer.
//!
//! One [`MailboxSynchronizer`] instance reconciles the texture state that
//! independent context registries publish under shared mailbox names. Each
//! mailbox alias belongs to exactly one [`TextureGroup`]; a group owns the
//! current [`TextureDefinition`] and orders all pushes by version number —
//! a push that is behind the group's current version is dropped, so the
//! most recent observed write wins regardless of wall-clock interleaving.
//!
//! Lock order: the synchronizer lock, then a texture's state lock, then an
//! image's hazard lock. Never the reverse. Driver calls made while folding
//! or stamping run under the synchronizer lock; unrelated mailboxes stall
//! for the duration of the driver call.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use gl_driver::{check_shared_image_support, GlDriver, TextureTarget};
use tracing::{debug, error, trace};

use crate::definition::TextureDefinition;
use crate::error::TexShareError;
use crate::mailbox::{Mailbox, TargetName};
use crate::registry::MailboxRegistry;
use crate::texture::{MemoryPool, Texture, TextureId, TextureRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GroupId(u64);

/// One shared texture identity: the current definition plus the mailbox
/// aliases pointing at it.
struct TextureGroup {
    definition: TextureDefinition,
    names: BTreeSet<TargetName>,
}

/// Per-texture record: the definition version this texture's context last
/// observed, and the group the texture belongs to.
struct TextureVersion {
    version: u32,
    group: GroupId,
}

struct SyncState {
    next_group: u64,
    textures: HashMap<TextureId, TextureVersion>,
    groups: HashMap<GroupId, TextureGroup>,
    /// Direct alias index; an alias maps to at most one group.
    names: BTreeMap<TargetName, GroupId>,
}

/// Process-wide broker merging per-context texture state into versioned,
/// shared truth per mailbox.
///
/// Constructor-injected into every participating [`MailboxRegistry`];
/// construction performs the one-time driver capability check and fails if
/// shared images or fences are unsupported.
pub struct MailboxSynchronizer {
    driver: Arc<dyn GlDriver>,
    state: Mutex<SyncState>,
}

impl MailboxSynchronizer {
    /// Create the synchronizer, gating on required driver extensions.
    ///
    /// Failure is fatal to enabling sharing for the process lifetime;
    /// callers fall back to [`MailboxRegistry::new_local`].
    pub fn new(driver: Arc<dyn GlDriver>) -> Result<Arc<Self>, TexShareError> {
        check_shared_image_support(driver.as_ref())?;
        Ok(Arc::new(Self {
            driver,
            state: Mutex::new(SyncState {
                next_group: 0,
                textures: HashMap::new(),
                groups: HashMap::new(),
                names: BTreeMap::new(),
            }),
        }))
    }

    pub fn driver(&self) -> &Arc<dyn GlDriver> {
        &self.driver
    }

    /// Materialize a new local texture from the merged snapshot owning
    /// `(target, mailbox)`. Returns `None` if no group owns the name or
    /// the driver cannot allocate the texture.
    pub fn create_texture_from_mailbox(
        &self,
        target: TextureTarget,
        mailbox: Mailbox,
    ) -> Option<TextureRef> {
        let mut guard = self.state.lock().unwrap();
        let st = &mut *guard;

        let name = TargetName::new(target, mailbox);
        let group_id = *st.names.get(&name)?;
        let group = st.groups.get(&group_id)?;
        if group.definition.target() != target {
            return None;
        }

        let version = group.definition.version();
        let texture = group.definition.create_texture(&self.driver)?;
        st.textures.insert(
            texture.id(),
            TextureVersion {
                version,
                group: group_id,
            },
        );
        Some(texture)
    }

    /// Fold every binding of `registry` into the global state.
    pub fn push_texture_updates(&self, registry: &MailboxRegistry) {
        let bindings = registry.shared().bindings();
        let mut guard = self.state.lock().unwrap();
        let st = &mut *guard;

        for (name, texture) in bindings {
            let mut tex_state = texture.state();

            // Only flat 2D textures participate: mip completeness cannot be
            // verified cheaply across contexts.
            if tex_state.needs_mips() && tex_state.target() != TextureTarget::Texture2d {
                continue;
            }

            match st.textures.get(&texture.id()).map(|tv| tv.group) {
                Some(group_id) => {
                    let known_alias = st
                        .groups
                        .get(&group_id)
                        .is_some_and(|group| group.names.contains(&name));
                    if !known_alias {
                        Self::reassociate_locked(st, name, group_id);
                    }
                    if let Err(err) = Self::update_definition_locked(
                        &self.driver,
                        st,
                        texture.id(),
                        &mut tex_state,
                    ) {
                        error!("dropping push for texture {:?}: {err}", texture.id());
                    }
                }
                None => {
                    // Reserved-pool textures are internal compositor
                    // resources, never shared.
                    if tex_state.pool() == MemoryPool::Managed {
                        continue;
                    }
                    let definition =
                        TextureDefinition::from_texture(&self.driver, 1, &mut tex_state);
                    let group_id = Self::insert_group_locked(st, definition);
                    Self::reassociate_locked(st, name, group_id);
                    st.textures.insert(
                        texture.id(),
                        TextureVersion {
                            version: 1,
                            group: group_id,
                        },
                    );
                }
            }
        }
    }

    /// Refresh every binding of `registry` from its group's current
    /// definition. Pulls are idempotent: an unchanged version is a no-op.
    pub fn pull_texture_updates(&self, registry: &MailboxRegistry) {
        let bindings = registry.shared().bindings();
        let mut guard = self.state.lock().unwrap();
        let st = &mut *guard;

        for (_name, texture) in bindings {
            let Some(tv) = st.textures.get_mut(&texture.id()) else {
                continue;
            };
            let Some(group) = st.groups.get(&tv.group) else {
                debug_assert!(false, "tracked texture without a group");
                continue;
            };
            let definition = &group.definition;
            if tv.version == definition.version() {
                continue;
            }
            if definition.is_older_than(tv.version) {
                // Defensive: never stamp state older than what this
                // context already observed.
                trace!("skipping pull behind local version for {:?}", texture.id());
                continue;
            }
            let mut tex_state = texture.state();
            definition.update_texture(&self.driver, &mut tex_state);
            tv.version = definition.version();
        }
    }

    /// Retire a texture: fold its final state into its group, then forget
    /// it. Skipping the fold would lose the last edit on deletion.
    pub fn texture_deleted(&self, texture: &TextureRef) {
        let mut guard = self.state.lock().unwrap();
        let st = &mut *guard;

        if !st.textures.contains_key(&texture.id()) {
            return;
        }
        {
            let mut tex_state = texture.state();
            if let Err(err) =
                Self::update_definition_locked(&self.driver, st, texture.id(), &mut tex_state)
            {
                error!("final fold dropped for texture {:?}: {err}", texture.id());
            }
        }
        if let Some(tv) = st.textures.remove(&texture.id()) {
            Self::collect_group_locked(st, tv.group);
        }
    }

    /// Number of textures currently tracked.
    pub fn tracked_texture_count(&self) -> usize {
        self.state.lock().unwrap().textures.len()
    }

    /// Number of live texture groups.
    pub fn group_count(&self) -> usize {
        self.state.lock().unwrap().groups.len()
    }

    // -----------------------------------------------------------------------
    // Locked helpers
    // -----------------------------------------------------------------------

    fn insert_group_locked(st: &mut SyncState, definition: TextureDefinition) -> GroupId {
        st.next_group += 1;
        let id = GroupId(st.next_group);
        st.groups.insert(
            id,
            TextureGroup {
                definition,
                names: BTreeSet::new(),
            },
        );
        id
    }

    /// Point `name` at `group`, unbinding it from whatever group currently
    /// holds it. An alias belongs to at most one group.
    fn reassociate_locked(st: &mut SyncState, name: TargetName, group: GroupId) {
        if let Some(previous) = st.names.insert(name, group) {
            if previous != group {
                if let Some(old_group) = st.groups.get_mut(&previous) {
                    old_group.names.remove(&name);
                }
                Self::collect_group_locked(st, previous);
                debug!("mailbox alias moved between texture groups");
            }
        }
        if let Some(new_group) = st.groups.get_mut(&group) {
            new_group.names.insert(name);
        }
    }

    /// Fold a texture's live state into its group as a new definition.
    ///
    /// No-ops: the group definition is ahead of what this texture's context
    /// observed (a concurrent writer already published a newer snapshot),
    /// or the fold would be semantically identical to the current
    /// definition. Errors: the texture's attached image does not recognize
    /// it as a client.
    fn update_definition_locked(
        driver: &Arc<dyn GlDriver>,
        st: &mut SyncState,
        texture_id: TextureId,
        tex_state: &mut Texture,
    ) -> Result<(), TexShareError> {
        let Some(tv) = st.textures.get_mut(&texture_id) else {
            debug_assert!(false, "folding an untracked texture");
            return Ok(());
        };
        let Some(group) = st.groups.get_mut(&tv.group) else {
            debug_assert!(false, "tracked texture without a group");
            return Ok(());
        };

        if !group.definition.is_older_than(tv.version) {
            trace!("stale push ignored for texture {texture_id:?}");
            return Ok(());
        }
        if group.definition.matches(tex_state) {
            return Ok(());
        }
        if let Some(attached) = tex_state.image() {
            if !attached.image.is_client(attached.client) {
                return Err(TexShareError::IncompatibleAttachment);
            }
        }

        let version = tv.version.wrapping_add(1);
        group.definition = TextureDefinition::from_texture(driver, version, tex_state);
        tv.version = version;
        Ok(())
    }

    /// Drop a group once nothing points at it: no aliases, and no tracked
    /// texture belongs to it.
    fn collect_group_locked(st: &mut SyncState, group: GroupId) {
        let unreferenced = st
            .groups
            .get(&group)
            .is_some_and(|g| g.names.is_empty())
            && !st.textures.values().any(|tv| tv.group == group);
        if unreferenced {
            st.groups.remove(&group);
        }
    }
}
