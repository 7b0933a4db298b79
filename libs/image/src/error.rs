//! Error types for the protocol core.

use kimg_caps::CapError;
use kimg_handle::{AddressSpaceHandle, ImageHandle};
use thiserror::Error;

/// Errors that can occur in the builder, teardown, and scenario layers.
///
/// Backend failures are wrapped; protocol-state violations (cloning or
/// binding out of order) get their own variants. All of them abort the
/// enclosing scenario.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// A capability-system operation failed.
    #[error(transparent)]
    Cap(#[from] CapError),

    /// The image has not completed population.
    ///
    /// Cloning into, binding, or executing against an image before full
    /// population is caller error.
    #[error("image {0} is not fully populated")]
    NotPopulated(ImageHandle),

    /// The image is already bound to an address space. Binding a bound
    /// image to a second address space is not supported.
    #[error("image {image} is already bound to {space}")]
    AlreadyBound {
        image: ImageHandle,
        space: AddressSpaceHandle,
    },

    /// Teardown failed partway; the remaining ledger entries are
    /// unprocessed and their resources leaked.
    #[error("teardown of {image} aborted with {remaining} regions still mapped")]
    TeardownAborted {
        image: ImageHandle,
        remaining: usize,
        #[source]
        source: CapError,
    },
}

impl ImageError {
    /// Returns true if the failure originated in the capability system
    /// rather than in protocol-state checks.
    pub fn is_backend(&self) -> bool {
        matches!(self, ImageError::Cap(_) | ImageError::TeardownAborted { .. })
    }
}
