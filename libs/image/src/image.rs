//! The execution image and its lifecycle state.

use kimg_caps::CapSystem;
use kimg_handle::{AddressSpaceHandle, ImageHandle};
use tracing::info;

use crate::context::Context;
use crate::error::ImageError;
use crate::ledger::{MappedRegion, RegionLedger};

/// An execution image: one capability-table entry referencing a kernel
/// image object, plus the ledger of regions currently mapped into it.
///
/// Created only by the builder; destroyed exactly once by teardown, which
/// takes the image by value. An image built by cloning copies state, not
/// backing storage — the ledger is untouched by cloning.
#[derive(Debug)]
pub struct ExecutionImage {
    handle: ImageHandle,
    ledger: RegionLedger,
    populated: bool,
    bound_to: Option<AddressSpaceHandle>,
}

impl ExecutionImage {
    pub(crate) fn new(handle: ImageHandle) -> Self {
        Self {
            handle,
            ledger: RegionLedger::new(),
            populated: false,
            bound_to: None,
        }
    }

    /// The image's capability handle.
    pub fn handle(&self) -> ImageHandle {
        self.handle
    }

    /// The ledger of regions currently mapped into the image.
    pub fn ledger(&self) -> &RegionLedger {
        &self.ledger
    }

    /// Whether population completed.
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// The address space the image is bound to, if any.
    pub fn bound_to(&self) -> Option<AddressSpaceHandle> {
        self.bound_to
    }

    pub(crate) fn push_region(&mut self, region: MappedRegion) {
        self.ledger.push(region);
    }

    pub(crate) fn mark_populated(&mut self) {
        self.populated = true;
    }

    pub(crate) fn into_parts(self) -> (ImageHandle, RegionLedger) {
        (self.handle, self.ledger)
    }

    /// Copies the content of `source` into this image.
    ///
    /// Requires full population; the ledger is not touched.
    pub async fn clone_from(&self, ctx: &Context, source: ImageHandle) -> Result<(), ImageError> {
        if !self.populated {
            return Err(ImageError::NotPopulated(self.handle));
        }
        ctx.caps().clone_image(self.handle, source).await?;
        info!(image = %self.handle, source = %source, "image content cloned");
        Ok(())
    }

    /// Binds this image to an address space.
    ///
    /// Requires full population. Binding a still-bound image to a second
    /// address space is not supported; unbind is implicit in address-space
    /// release.
    pub async fn bind(
        &mut self,
        ctx: &Context,
        space: AddressSpaceHandle,
    ) -> Result<(), ImageError> {
        if !self.populated {
            return Err(ImageError::NotPopulated(self.handle));
        }
        if let Some(bound) = self.bound_to {
            return Err(ImageError::AlreadyBound {
                image: self.handle,
                space: bound,
            });
        }
        ctx.caps().bind_image(self.handle, space).await?;
        self.bound_to = Some(space);
        info!(image = %self.handle, space = %space, "image bound to address space");
        Ok(())
    }
}
