//! Error taxonomy for the sharing subsystem.
//!
//! Only two conditions surface as typed errors: the one-time capability
//! failure at synchronizer construction, and an incompatible image
//! attachment discovered during a push (logged, and the push for that one
//! texture is dropped). Stale-write rejection is a policy no-op, and driver
//! allocation failure propagates as `None` from the create paths.

use gl_driver::MissingExtension;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TexShareError {
    /// The driver cannot back shared images or fences. Fatal to enabling
    /// sharing for the process lifetime; registries fall back to local-only
    /// operation.
    #[error("shared-image support unavailable: {0}")]
    Capability(#[from] MissingExtension),

    /// A pushed texture carries an image whose handle does not recognize
    /// the texture as a client — the image was not created through the
    /// synchronizer's sharing path.
    #[error("texture image is not a client of its shared image handle")]
    IncompatibleAttachment,
}
