//! The protocol context.
//!
//! Every operation takes an explicit `Context` instead of reaching for
//! ambient state: the capability backend, the image layout, the identifier
//! table, and the base image used as clone source all travel together.

use std::sync::Arc;

use kimg_caps::CapSystem;
use kimg_handle::{IdTableHandle, ImageHandle};

use crate::error::ImageError;
use crate::layout::ImageLayout;

/// Everything a protocol operation needs from its surroundings.
pub struct Context {
    caps: Arc<dyn CapSystem>,
    layout: ImageLayout,
    id_table: IdTableHandle,
    base_image: ImageHandle,
}

impl Context {
    /// Builds a context by querying the backend's boot-time capabilities.
    pub async fn bootstrap(
        caps: Arc<dyn CapSystem>,
        layout: ImageLayout,
    ) -> Result<Self, ImageError> {
        let boot = caps.boot_caps().await?;
        Ok(Self {
            caps,
            layout,
            id_table: boot.id_table,
            base_image: boot.base_image,
        })
    }

    /// The capability backend.
    pub fn caps(&self) -> &dyn CapSystem {
        self.caps.as_ref()
    }

    /// The image layout scenarios build against.
    pub fn layout(&self) -> &ImageLayout {
        &self.layout
    }

    /// The identifier table images are registered in.
    pub fn id_table(&self) -> IdTableHandle {
        self.id_table
    }

    /// The image the running context executes under; the clone source for
    /// every clone scenario.
    pub fn base_image(&self) -> ImageHandle {
        self.base_image
    }
}
