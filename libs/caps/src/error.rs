//! Error types for capability-system operations.

use kimg_handle::{AddressSpaceHandle, ChannelHandle, ImageHandle, RegionHandle};
use thiserror::Error;

use crate::types::ImageId;

/// Errors that can occur at the capability-system boundary.
///
/// Every variant is fatal to the scenario that triggered it; the protocol
/// layers propagate these immediately with no retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapError {
    /// The allocation pool cannot satisfy a request.
    #[error("allocation pool exhausted for {resource}")]
    Exhausted { resource: &'static str },

    /// The kernel rejected mapping a region into an image.
    #[error("mapping rejected: {region} into {image}")]
    MapRejected {
        region: RegionHandle,
        image: ImageHandle,
    },

    /// The kernel rejected unmapping a region.
    #[error("unmap rejected for {region}")]
    UnmapRejected { region: RegionHandle },

    /// Identifier assignment was rejected.
    #[error("identifier assignment rejected: {image} as id {id}")]
    IdentifierRejected { image: ImageHandle, id: ImageId },

    /// The kernel rejected cloning image content.
    #[error("clone rejected: {image} from {origin}")]
    CloneRejected {
        image: ImageHandle,
        origin: ImageHandle,
    },

    /// The kernel rejected binding an image to an address space.
    #[error("bind rejected: {image} to {space}")]
    BindRejected {
        image: ImageHandle,
        space: AddressSpaceHandle,
    },

    /// Addressing-domain assignment was rejected.
    #[error("addressing-domain assignment rejected for {space}")]
    DomainRejected { space: AddressSpaceHandle },

    /// Thread creation against an image failed.
    #[error("thread spawn failed against {image}")]
    SpawnFailed { image: ImageHandle },

    /// A rendezvous channel was torn down while a peer was waiting on it.
    #[error("rendezvous channel {channel} closed")]
    ChannelClosed { channel: ChannelHandle },

    /// An operation referenced a handle the capability table does not hold.
    #[error("unknown handle: {handle}")]
    UnknownHandle { handle: String },
}

impl CapError {
    /// Builds an `UnknownHandle` error from any displayable handle.
    pub fn unknown(handle: impl std::fmt::Display) -> Self {
        CapError::UnknownHandle {
            handle: handle.to_string(),
        }
    }

    /// Returns true if this error is an allocation-pool exhaustion.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, CapError::Exhausted { .. })
    }
}
