//! Cross-context GPU texture sharing via mailboxes.
//!
//! Independent rendering contexts, each with its own texture namespace,
//! publish and consume textures under shared opaque names ("mailboxes")
//! without copying pixels through the CPU.
//!
//! # Overview
//!
//! - [`Mailbox`] / [`TargetName`] name a shareable texture slot.
//! - [`SharedTexture`] is one context's texture object; it is never handed
//!   to another context directly.
//! - [`NativeImage`] is the one thing contexts actually share: a driver
//!   shared image with fence-based read/write hazard tracking.
//! - [`TextureDefinition`] is an immutable, versioned capture of a texture's
//!   parameters plus its [`NativeImage`], replayable onto any local texture.
//! - [`MailboxRegistry`] is the per-context produce/consume table.
//! - [`MailboxSynchronizer`] is the process-wide broker that merges pushed
//!   registry state into versioned groups and republishes it on pull.
//!
//! # Flow
//!
//! A producing context calls [`MailboxRegistry::produce_texture`], then
//! [`MailboxRegistry::push_texture_updates`] at a sync point. A consuming
//! context calls [`MailboxRegistry::pull_texture_updates`] and
//! [`MailboxRegistry::consume_texture`], receiving its own texture object
//! aliasing the same pixel storage. Which concurrent edit wins is decided by
//! per-group version numbers: a push that is behind the group's current
//! version is dropped.

pub mod definition;
pub mod error;
pub mod image;
pub mod mailbox;
pub mod registry;
pub mod sync;
pub mod texture;

pub use definition::TextureDefinition;
pub use error::TexShareError;
pub use image::{ImageClient, NativeImage};
pub use mailbox::{Mailbox, TargetName, MAILBOX_SIZE};
pub use registry::MailboxRegistry;
pub use sync::MailboxSynchronizer;
pub use texture::{MemoryPool, SharedTexture, Texture, TextureId, TextureRef};

#[cfg(test)]
mod tests;
