//! Mailbox names and the compound keys they are bound under.

use gl_driver::TextureTarget;
use rand::rngs::OsRng;
use rand::RngCore;

/// Size of a mailbox token in bytes.
pub const MAILBOX_SIZE: usize = 64;

/// Opaque random token naming a shareable texture slot.
///
/// Purely a name: value-comparable, copyable, no ownership semantics.
/// Tokens come from the OS random source so they are unguessable across
/// processes that exchange them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mailbox {
    bytes: [u8; MAILBOX_SIZE],
}

impl Mailbox {
    /// Generate a fresh random mailbox name.
    pub fn generate() -> Self {
        let mut bytes = [0u8; MAILBOX_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; MAILBOX_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &[u8; MAILBOX_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mailbox(")?;
        for byte in &self.bytes[..8] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..)")
    }
}

/// Compound key: (texture target, mailbox).
///
/// Ordering is field-wise — target first, then mailbox bytes — rather than a
/// raw memory comparison, so there is no dependence on padding contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetName {
    pub target: TextureTarget,
    pub mailbox: Mailbox,
}

impl TargetName {
    pub fn new(target: TextureTarget, mailbox: Mailbox) -> Self {
        Self { target, mailbox }
    }
}
