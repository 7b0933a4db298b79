//! The capability-system backend interface.
//!
//! Everything the protocol needs from the kernel goes through this trait:
//! object allocation, region mapping, content cloning, address-space
//! binding, thread creation, and the rendezvous channel primitives.
//!
//! A mock implementation is provided for testing and the scenario runner.

use async_trait::async_trait;
use kimg_handle::{
    AddressSpaceHandle, ChannelHandle, IdTableHandle, ImageHandle, RegionHandle, ThreadHandle,
};

use crate::error::CapError;
use crate::types::{BootCaps, ImageId, SizeBits, ThreadConfig};

/// Capability-system backend interface.
///
/// Fallible operations return `CapError`; release operations return the
/// backing resource to the pool and cannot fail. Allocation calls may block
/// if the pool has internal contention; `wait` blocks until the channel is
/// signalled and is unbounded by design.
#[async_trait]
pub trait CapSystem: Send + Sync {
    /// Boot-time capabilities: the identifier table and the caller's own image.
    async fn boot_caps(&self) -> Result<BootCaps, CapError>;

    /// Allocate a fresh image object.
    async fn allocate_image(&self) -> Result<ImageHandle, CapError>;

    /// Allocate one physical memory region of the given size class.
    async fn allocate_region(&self, size: SizeBits) -> Result<RegionHandle, CapError>;

    /// Map a region into an image.
    async fn map_region(&self, region: RegionHandle, image: ImageHandle) -> Result<(), CapError>;

    /// Unmap a currently-mapped region.
    async fn unmap_region(&self, region: RegionHandle) -> Result<(), CapError>;

    /// Return a region's backing resource to the pool.
    async fn release_region(&self, region: RegionHandle);

    /// Return an image object to the pool.
    async fn release_image(&self, image: ImageHandle);

    /// Return an address-space object to the pool. Any image binding is
    /// implicitly dropped.
    async fn release_address_space(&self, space: AddressSpaceHandle);

    /// Return a rendezvous channel to the pool.
    async fn release_channel(&self, channel: ChannelHandle);

    /// Register an image under a logical identifier.
    async fn assign_identifier(
        &self,
        table: IdTableHandle,
        image: ImageHandle,
        id: ImageId,
    ) -> Result<(), CapError>;

    /// Copy the content of `source` into `image`. Backing storage is not
    /// shared; the destination's mapped regions are untouched.
    async fn clone_image(&self, image: ImageHandle, source: ImageHandle) -> Result<(), CapError>;

    /// Bind an image to an address space.
    async fn bind_image(
        &self,
        image: ImageHandle,
        space: AddressSpaceHandle,
    ) -> Result<(), CapError>;

    /// Allocate an address-space object.
    async fn allocate_address_space(&self) -> Result<AddressSpaceHandle, CapError>;

    /// Associate an address space with an addressing domain.
    async fn assign_addressing_domain(&self, space: AddressSpaceHandle) -> Result<(), CapError>;

    /// Allocate a rendezvous channel.
    async fn allocate_channel(&self) -> Result<ChannelHandle, CapError>;

    /// Spawn a thread whose process configuration references the bound
    /// image. The thread signals the configured channel once and then
    /// blocks indefinitely; it is reclaimed with `destroy_thread`, never by
    /// returning.
    async fn spawn_thread(&self, config: ThreadConfig) -> Result<ThreadHandle, CapError>;

    /// Stop a thread and reclaim its resources.
    async fn destroy_thread(&self, thread: ThreadHandle);

    /// Send one zero-length message on a channel.
    async fn send(&self, channel: ChannelHandle) -> Result<(), CapError>;

    /// Block until one zero-length message arrives on a channel.
    async fn wait(&self, channel: ChannelHandle) -> Result<(), CapError>;

    /// Non-blocking check for a pending message. Returns true if one was
    /// consumed.
    async fn poll(&self, channel: ChannelHandle) -> Result<bool, CapError>;
}
