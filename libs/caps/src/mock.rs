//! In-memory mock capability backend.
//!
//! `MockCaps` keeps a capability table behind a mutex: images with their
//! mapped regions, regions with their size class and mapping, address
//! spaces, channels, and spawned threads. Allocation pools can be given
//! finite quotas so tests can force `Exhausted` at a chosen point.
//!
//! The mock records the order of every map and unmap so tests can verify
//! teardown reverses population exactly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kimg_handle::{
    AddressSpaceHandle, ChannelHandle, IdTableHandle, ImageHandle, RegionHandle, ThreadHandle,
};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::backend::CapSystem;
use crate::error::CapError;
use crate::types::{BootCaps, ImageId, SizeBits, ThreadConfig};

struct ImageRecord {
    identifier: Option<ImageId>,
    mapped: Vec<RegionHandle>,
    cloned_from: Option<ImageHandle>,
    bound_to: Option<AddressSpaceHandle>,
}

impl ImageRecord {
    fn new() -> Self {
        Self {
            identifier: None,
            mapped: Vec::new(),
            cloned_from: None,
            bound_to: None,
        }
    }
}

struct RegionRecord {
    size: SizeBits,
    mapped_into: Option<ImageHandle>,
}

struct SpaceRecord {
    domain_assigned: bool,
}

struct ChannelRecord {
    tx: UnboundedSender<()>,
    // Receiver lives behind its own async lock so `wait` can block without
    // holding the capability table.
    rx: Arc<tokio::sync::Mutex<UnboundedReceiver<()>>>,
}

struct MockState {
    // Slot 0 is the null capability.
    next_slot: u64,
    images: HashMap<ImageHandle, ImageRecord>,
    regions: HashMap<RegionHandle, RegionRecord>,
    spaces: HashMap<AddressSpaceHandle, SpaceRecord>,
    channels: HashMap<ChannelHandle, ChannelRecord>,
    threads: HashMap<ThreadHandle, JoinHandle<()>>,
    map_log: Vec<RegionHandle>,
    unmap_log: Vec<RegionHandle>,
    image_quota: Option<u32>,
    region_quota: Option<u32>,
    boot: BootCaps,
}

impl MockState {
    fn mint(&mut self) -> u64 {
        let slot = self.next_slot;
        self.next_slot += 1;
        slot
    }
}

/// Mock capability backend for testing and the scenario runner.
pub struct MockCaps {
    state: Mutex<MockState>,
}

impl MockCaps {
    /// Create a mock backend with unlimited pools.
    pub fn new() -> Self {
        Self::with_quotas(None, None)
    }

    /// Create a mock backend whose region pool holds exactly `quota`
    /// regions.
    pub fn with_region_quota(quota: u32) -> Self {
        Self::with_quotas(None, Some(quota))
    }

    /// Create a mock backend whose image pool holds exactly `quota` images.
    pub fn with_image_quota(quota: u32) -> Self {
        Self::with_quotas(Some(quota), None)
    }

    fn with_quotas(image_quota: Option<u32>, region_quota: Option<u32>) -> Self {
        let mut state = MockState {
            next_slot: 1,
            images: HashMap::new(),
            regions: HashMap::new(),
            spaces: HashMap::new(),
            channels: HashMap::new(),
            threads: HashMap::new(),
            map_log: Vec::new(),
            unmap_log: Vec::new(),
            image_quota,
            region_quota,
            boot: BootCaps {
                id_table: IdTableHandle::from_slot(0),
                base_image: ImageHandle::from_slot(0),
            },
        };

        // The running context's own capabilities: the identifier table and
        // the image the mock kernel itself executes under. The base image
        // is the clone source and is not drawn from the image quota.
        let id_table = IdTableHandle::from_slot(state.mint());
        let base_image = ImageHandle::from_slot(state.mint());
        state.images.insert(base_image, ImageRecord::new());
        state.boot = BootCaps {
            id_table,
            base_image,
        };

        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock capability table poisoned")
    }

    // =========================================================================
    // Introspection for tests
    // =========================================================================

    /// Number of live image objects (including the base image).
    pub fn live_images(&self) -> usize {
        self.lock().images.len()
    }

    /// Number of live region objects.
    pub fn live_regions(&self) -> usize {
        self.lock().regions.len()
    }

    /// Number of live address-space objects.
    pub fn live_address_spaces(&self) -> usize {
        self.lock().spaces.len()
    }

    /// Number of live rendezvous channels.
    pub fn live_channels(&self) -> usize {
        self.lock().channels.len()
    }

    /// Number of live threads.
    pub fn live_threads(&self) -> usize {
        self.lock().threads.len()
    }

    /// Number of regions currently mapped into an image.
    pub fn mapped_count(&self, image: ImageHandle) -> usize {
        self.lock()
            .images
            .get(&image)
            .map(|record| record.mapped.len())
            .unwrap_or(0)
    }

    /// The logical identifier assigned to an image, if any.
    pub fn identifier_of(&self, image: ImageHandle) -> Option<ImageId> {
        self.lock().images.get(&image).and_then(|r| r.identifier)
    }

    /// The image this image was cloned from, if any.
    pub fn clone_source(&self, image: ImageHandle) -> Option<ImageHandle> {
        self.lock().images.get(&image).and_then(|r| r.cloned_from)
    }

    /// The address space an image is bound to, if any.
    pub fn bound_space(&self, image: ImageHandle) -> Option<AddressSpaceHandle> {
        self.lock().images.get(&image).and_then(|r| r.bound_to)
    }

    /// The size class a live region was allocated with.
    pub fn region_size(&self, region: RegionHandle) -> Option<SizeBits> {
        self.lock().regions.get(&region).map(|r| r.size)
    }

    /// Every map operation, in order.
    pub fn map_sequence(&self) -> Vec<RegionHandle> {
        self.lock().map_log.clone()
    }

    /// Every unmap operation, in order.
    pub fn unmap_sequence(&self) -> Vec<RegionHandle> {
        self.lock().unmap_log.clone()
    }
}

impl Default for MockCaps {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CapSystem for MockCaps {
    async fn boot_caps(&self) -> Result<BootCaps, CapError> {
        Ok(self.lock().boot)
    }

    async fn allocate_image(&self) -> Result<ImageHandle, CapError> {
        let mut state = self.lock();
        if let Some(quota) = state.image_quota.as_mut() {
            if *quota == 0 {
                return Err(CapError::Exhausted { resource: "image" });
            }
            *quota -= 1;
        }
        let image = ImageHandle::from_slot(state.mint());
        state.images.insert(image, ImageRecord::new());
        debug!(image = %image, "[MOCK] image allocated");
        Ok(image)
    }

    async fn allocate_region(&self, size: SizeBits) -> Result<RegionHandle, CapError> {
        let mut state = self.lock();
        if let Some(quota) = state.region_quota.as_mut() {
            if *quota == 0 {
                return Err(CapError::Exhausted { resource: "region" });
            }
            *quota -= 1;
        }
        let region = RegionHandle::from_slot(state.mint());
        state.regions.insert(
            region,
            RegionRecord {
                size,
                mapped_into: None,
            },
        );
        debug!(region = %region, size = %size, "[MOCK] region allocated");
        Ok(region)
    }

    async fn map_region(&self, region: RegionHandle, image: ImageHandle) -> Result<(), CapError> {
        let mut state = self.lock();
        if !state.images.contains_key(&image) {
            return Err(CapError::unknown(image));
        }
        let record = state
            .regions
            .get_mut(&region)
            .ok_or_else(|| CapError::unknown(region))?;
        if record.mapped_into.is_some() {
            return Err(CapError::MapRejected { region, image });
        }
        record.mapped_into = Some(image);
        state
            .images
            .get_mut(&image)
            .expect("image checked above")
            .mapped
            .push(region);
        state.map_log.push(region);
        debug!(region = %region, image = %image, "[MOCK] region mapped");
        Ok(())
    }

    async fn unmap_region(&self, region: RegionHandle) -> Result<(), CapError> {
        let mut state = self.lock();
        let record = state
            .regions
            .get_mut(&region)
            .ok_or_else(|| CapError::unknown(region))?;
        let Some(image) = record.mapped_into.take() else {
            return Err(CapError::UnmapRejected { region });
        };
        if let Some(image_record) = state.images.get_mut(&image) {
            image_record.mapped.retain(|r| *r != region);
        }
        state.unmap_log.push(region);
        debug!(region = %region, image = %image, "[MOCK] region unmapped");
        Ok(())
    }

    async fn release_region(&self, region: RegionHandle) {
        let mut state = self.lock();
        match state.regions.remove(&region) {
            Some(record) => {
                if let Some(image) = record.mapped_into {
                    warn!(region = %region, image = %image, "[MOCK] region released while still mapped");
                }
                debug!(region = %region, "[MOCK] region released");
            }
            None => warn!(region = %region, "[MOCK] released unknown region"),
        }
    }

    async fn release_image(&self, image: ImageHandle) {
        let mut state = self.lock();
        match state.images.remove(&image) {
            Some(record) => {
                if !record.mapped.is_empty() {
                    warn!(
                        image = %image,
                        mapped = record.mapped.len(),
                        "[MOCK] image released with regions still mapped"
                    );
                }
                debug!(image = %image, "[MOCK] image released");
            }
            None => warn!(image = %image, "[MOCK] released unknown image"),
        }
    }

    async fn release_address_space(&self, space: AddressSpaceHandle) {
        let mut state = self.lock();
        if state.spaces.remove(&space).is_none() {
            warn!(space = %space, "[MOCK] released unknown address space");
            return;
        }
        // Releasing an address space implicitly unbinds any image bound to it.
        for record in state.images.values_mut() {
            if record.bound_to == Some(space) {
                record.bound_to = None;
            }
        }
        debug!(space = %space, "[MOCK] address space released");
    }

    async fn release_channel(&self, channel: ChannelHandle) {
        let mut state = self.lock();
        if state.channels.remove(&channel).is_none() {
            warn!(channel = %channel, "[MOCK] released unknown channel");
        } else {
            debug!(channel = %channel, "[MOCK] channel released");
        }
    }

    async fn assign_identifier(
        &self,
        table: IdTableHandle,
        image: ImageHandle,
        id: ImageId,
    ) -> Result<(), CapError> {
        let mut state = self.lock();
        if table != state.boot.id_table {
            return Err(CapError::unknown(table));
        }
        let record = state
            .images
            .get_mut(&image)
            .ok_or_else(|| CapError::unknown(image))?;
        if record.identifier.is_some() {
            return Err(CapError::IdentifierRejected { image, id });
        }
        record.identifier = Some(id);
        debug!(image = %image, id = %id, "[MOCK] identifier assigned");
        Ok(())
    }

    async fn clone_image(&self, image: ImageHandle, source: ImageHandle) -> Result<(), CapError> {
        let mut state = self.lock();
        if image == source {
            return Err(CapError::CloneRejected { image, origin: source });
        }
        if !state.images.contains_key(&source) {
            return Err(CapError::unknown(source));
        }
        let record = state
            .images
            .get_mut(&image)
            .ok_or_else(|| CapError::unknown(image))?;
        record.cloned_from = Some(source);
        debug!(image = %image, source = %source, "[MOCK] image cloned");
        Ok(())
    }

    async fn bind_image(
        &self,
        image: ImageHandle,
        space: AddressSpaceHandle,
    ) -> Result<(), CapError> {
        let mut state = self.lock();
        let domain_assigned = state
            .spaces
            .get(&space)
            .ok_or_else(|| CapError::unknown(space))?
            .domain_assigned;
        let record = state
            .images
            .get_mut(&image)
            .ok_or_else(|| CapError::unknown(image))?;
        // The kernel refuses binding to an unassigned address space and
        // rebinding a bound image.
        if !domain_assigned || record.bound_to.is_some() {
            return Err(CapError::BindRejected { image, space });
        }
        record.bound_to = Some(space);
        debug!(image = %image, space = %space, "[MOCK] image bound");
        Ok(())
    }

    async fn allocate_address_space(&self) -> Result<AddressSpaceHandle, CapError> {
        let mut state = self.lock();
        let space = AddressSpaceHandle::from_slot(state.mint());
        state.spaces.insert(
            space,
            SpaceRecord {
                domain_assigned: false,
            },
        );
        debug!(space = %space, "[MOCK] address space allocated");
        Ok(space)
    }

    async fn assign_addressing_domain(&self, space: AddressSpaceHandle) -> Result<(), CapError> {
        let mut state = self.lock();
        let record = state
            .spaces
            .get_mut(&space)
            .ok_or_else(|| CapError::unknown(space))?;
        if record.domain_assigned {
            return Err(CapError::DomainRejected { space });
        }
        record.domain_assigned = true;
        debug!(space = %space, "[MOCK] addressing domain assigned");
        Ok(())
    }

    async fn allocate_channel(&self) -> Result<ChannelHandle, CapError> {
        let mut state = self.lock();
        let channel = ChannelHandle::from_slot(state.mint());
        let (tx, rx) = mpsc::unbounded_channel();
        state.channels.insert(
            channel,
            ChannelRecord {
                tx,
                rx: Arc::new(tokio::sync::Mutex::new(rx)),
            },
        );
        debug!(channel = %channel, "[MOCK] channel allocated");
        Ok(channel)
    }

    async fn spawn_thread(&self, config: ThreadConfig) -> Result<ThreadHandle, CapError> {
        let (thread, tx) = {
            let mut state = self.lock();
            let bound_to = state
                .images
                .get(&config.image)
                .ok_or_else(|| CapError::unknown(config.image))?
                .bound_to;
            if bound_to != Some(config.space) {
                return Err(CapError::SpawnFailed {
                    image: config.image,
                });
            }
            let tx = state
                .channels
                .get(&config.channel)
                .ok_or_else(|| CapError::unknown(config.channel))?
                .tx
                .clone();
            (ThreadHandle::from_slot(state.mint()), tx)
        };

        let image = config.image;
        let join = tokio::spawn(async move {
            // Signal the spawning context, then block until reclaimed.
            debug!(image = %image, "[MOCK] thread signalling");
            let _ = tx.send(());
            debug!(image = %image, "[MOCK] thread blocking");
            std::future::pending::<()>().await;
        });

        self.lock().threads.insert(thread, join);
        debug!(thread = %thread, image = %image, "[MOCK] thread spawned");
        Ok(thread)
    }

    async fn destroy_thread(&self, thread: ThreadHandle) {
        let join = self.lock().threads.remove(&thread);
        match join {
            Some(join) => {
                join.abort();
                debug!(thread = %thread, "[MOCK] thread destroyed");
            }
            None => warn!(thread = %thread, "[MOCK] destroyed unknown thread"),
        }
    }

    async fn send(&self, channel: ChannelHandle) -> Result<(), CapError> {
        let tx = {
            let state = self.lock();
            state
                .channels
                .get(&channel)
                .ok_or_else(|| CapError::unknown(channel))?
                .tx
                .clone()
        };
        tx.send(()).map_err(|_| CapError::ChannelClosed { channel })
    }

    async fn wait(&self, channel: ChannelHandle) -> Result<(), CapError> {
        let rx = {
            let state = self.lock();
            Arc::clone(
                &state
                    .channels
                    .get(&channel)
                    .ok_or_else(|| CapError::unknown(channel))?
                    .rx,
            )
        };
        let mut rx = rx.lock().await;
        rx.recv()
            .await
            .ok_or(CapError::ChannelClosed { channel })
    }

    async fn poll(&self, channel: ChannelHandle) -> Result<bool, CapError> {
        let rx = {
            let state = self.lock();
            Arc::clone(
                &state
                    .channels
                    .get(&channel)
                    .ok_or_else(|| CapError::unknown(channel))?
                    .rx,
            )
        };
        let mut rx = rx.lock().await;
        match rx.try_recv() {
            Ok(()) => Ok(true),
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => Err(CapError::ChannelClosed { channel }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_boot_caps_stable() {
        let caps = MockCaps::new();
        let boot1 = caps.boot_caps().await.unwrap();
        let boot2 = caps.boot_caps().await.unwrap();
        assert_eq!(boot1.base_image, boot2.base_image);
        assert_eq!(boot1.id_table, boot2.id_table);
    }

    #[tokio::test]
    async fn test_map_unmap_bookkeeping() {
        let caps = MockCaps::new();
        let image = caps.allocate_image().await.unwrap();
        let region = caps.allocate_region(SizeBits::new(12)).await.unwrap();

        caps.map_region(region, image).await.unwrap();
        assert_eq!(caps.mapped_count(image), 1);
        assert_eq!(caps.map_sequence(), vec![region]);

        caps.unmap_region(region).await.unwrap();
        assert_eq!(caps.mapped_count(image), 0);
        assert_eq!(caps.unmap_sequence(), vec![region]);
    }

    #[tokio::test]
    async fn test_double_map_rejected() {
        let caps = MockCaps::new();
        let image = caps.allocate_image().await.unwrap();
        let region = caps.allocate_region(SizeBits::new(12)).await.unwrap();

        caps.map_region(region, image).await.unwrap();
        let result = caps.map_region(region, image).await;
        assert!(matches!(result, Err(CapError::MapRejected { .. })));
    }

    #[tokio::test]
    async fn test_unmap_unmapped_rejected() {
        let caps = MockCaps::new();
        let region = caps.allocate_region(SizeBits::new(12)).await.unwrap();

        let result = caps.unmap_region(region).await;
        assert!(matches!(result, Err(CapError::UnmapRejected { .. })));
    }

    #[tokio::test]
    async fn test_region_quota_exhaustion() {
        let caps = MockCaps::with_region_quota(1);
        caps.allocate_region(SizeBits::new(12)).await.unwrap();

        let result = caps.allocate_region(SizeBits::new(12)).await;
        assert!(matches!(result, Err(CapError::Exhausted { resource: "region" })));
    }

    #[tokio::test]
    async fn test_image_quota_excludes_base_image() {
        let caps = MockCaps::with_image_quota(1);
        caps.allocate_image().await.unwrap();

        let result = caps.allocate_image().await;
        assert!(matches!(result, Err(CapError::Exhausted { resource: "image" })));
    }

    #[tokio::test]
    async fn test_release_returns_to_table() {
        let caps = MockCaps::new();
        let image = caps.allocate_image().await.unwrap();
        let region = caps.allocate_region(SizeBits::new(12)).await.unwrap();
        assert_eq!(caps.live_regions(), 1);

        caps.release_region(region).await;
        caps.release_image(image).await;
        assert_eq!(caps.live_regions(), 0);
        // Only the base image remains.
        assert_eq!(caps.live_images(), 1);
    }

    #[tokio::test]
    async fn test_identifier_assignment() {
        let caps = MockCaps::new();
        let boot = caps.boot_caps().await.unwrap();
        let image = caps.allocate_image().await.unwrap();

        caps.assign_identifier(boot.id_table, image, ImageId::new(4))
            .await
            .unwrap();
        assert_eq!(caps.identifier_of(image), Some(ImageId::new(4)));

        let result = caps
            .assign_identifier(boot.id_table, image, ImageId::new(5))
            .await;
        assert!(matches!(result, Err(CapError::IdentifierRejected { .. })));
    }

    #[tokio::test]
    async fn test_bind_requires_domain_assignment() {
        let caps = MockCaps::new();
        let image = caps.allocate_image().await.unwrap();
        let space = caps.allocate_address_space().await.unwrap();

        let result = caps.bind_image(image, space).await;
        assert!(matches!(result, Err(CapError::BindRejected { .. })));

        caps.assign_addressing_domain(space).await.unwrap();
        caps.bind_image(image, space).await.unwrap();
        assert_eq!(caps.bound_space(image), Some(space));
    }

    #[tokio::test]
    async fn test_release_address_space_unbinds() {
        let caps = MockCaps::new();
        let image = caps.allocate_image().await.unwrap();
        let space = caps.allocate_address_space().await.unwrap();
        caps.assign_addressing_domain(space).await.unwrap();
        caps.bind_image(image, space).await.unwrap();

        caps.release_address_space(space).await;
        assert_eq!(caps.bound_space(image), None);
    }

    #[tokio::test]
    async fn test_channel_send_poll_wait() {
        let caps = MockCaps::new();
        let channel = caps.allocate_channel().await.unwrap();

        assert!(!caps.poll(channel).await.unwrap());
        caps.send(channel).await.unwrap();
        assert!(caps.poll(channel).await.unwrap());
        assert!(!caps.poll(channel).await.unwrap());

        caps.send(channel).await.unwrap();
        caps.wait(channel).await.unwrap();
    }

    #[tokio::test]
    async fn test_spawn_thread_signals_once() {
        let caps = MockCaps::new();
        let image = caps.allocate_image().await.unwrap();
        let space = caps.allocate_address_space().await.unwrap();
        caps.assign_addressing_domain(space).await.unwrap();
        caps.bind_image(image, space).await.unwrap();
        let channel = caps.allocate_channel().await.unwrap();

        let thread = caps
            .spawn_thread(ThreadConfig {
                image,
                space,
                channel,
            })
            .await
            .unwrap();

        caps.wait(channel).await.unwrap();
        // Exactly one signal: nothing further is pending.
        assert!(!caps.poll(channel).await.unwrap());

        caps.destroy_thread(thread).await;
        assert_eq!(caps.live_threads(), 0);
    }

    #[tokio::test]
    async fn test_spawn_unbound_image_rejected() {
        let caps = MockCaps::new();
        let image = caps.allocate_image().await.unwrap();
        let space = caps.allocate_address_space().await.unwrap();
        let channel = caps.allocate_channel().await.unwrap();

        let result = caps
            .spawn_thread(ThreadConfig {
                image,
                space,
                channel,
            })
            .await;
        assert!(matches!(result, Err(CapError::SpawnFailed { .. })));
    }
}
