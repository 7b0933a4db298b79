//! Shared value types for the capability boundary.

use kimg_handle::{AddressSpaceHandle, ChannelHandle, IdTableHandle, ImageHandle};
use serde::{Deserialize, Serialize};

/// Power-of-two size class of a physical memory region, as a bit width.
///
/// A region of size class `n` backs `1 << n` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SizeBits(u8);

impl SizeBits {
    /// Creates a size class from a bit width.
    #[must_use]
    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// Returns the bit width.
    #[must_use]
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Returns the region size in bytes.
    #[must_use]
    pub const fn bytes(&self) -> u64 {
        1u64 << self.0
    }
}

impl std::fmt::Display for SizeBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "2^{}", self.0)
    }
}

/// Logical identifier assigned to an image in the identifier table.
///
/// A tagging facility for observability, not a security boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(u32);

impl ImageId {
    /// Creates an identifier from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Boot-time capabilities the protocol context is constructed from.
///
/// The caller's own image is the clone source for every scenario; the
/// identifier table receives the logical id of each image built.
#[derive(Debug, Clone, Copy)]
pub struct BootCaps {
    /// The identifier table held by the running context.
    pub id_table: IdTableHandle,

    /// The image the current context itself executes under.
    pub base_image: ImageHandle,
}

/// Configuration for spawning a thread against a bound image.
#[derive(Debug, Clone, Copy)]
pub struct ThreadConfig {
    /// The image the thread's process configuration references.
    pub image: ImageHandle,

    /// The address space the image is bound to.
    pub space: AddressSpaceHandle,

    /// The rendezvous channel the thread signals once started.
    pub channel: ChannelHandle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_bits_bytes() {
        assert_eq!(SizeBits::new(12).bytes(), 4096);
        assert_eq!(SizeBits::new(14).bytes(), 16384);
    }

    #[test]
    fn test_size_bits_display() {
        assert_eq!(SizeBits::new(12).to_string(), "2^12");
    }

    #[test]
    fn test_size_bits_ordered() {
        assert!(SizeBits::new(12) < SizeBits::new(14));
    }

    #[test]
    fn test_image_id_value() {
        let id = ImageId::new(4);
        assert_eq!(id.value(), 4);
        assert_eq!(id.to_string(), "4");
    }
}
