//! Image teardown.
//!
//! Drains the ledger in strict reverse-of-allocation order, unmapping each
//! region before releasing it, then releases the image object. Reverse
//! order matters: in hierarchical images a later-mapped region's validity
//! may depend on an earlier one remaining mapped during teardown.

use kimg_caps::CapSystem;
use tracing::{debug, info};

use crate::context::Context;
use crate::error::ImageError;
use crate::image::ExecutionImage;

/// Destroys an execution image, draining its ledger completely.
///
/// Takes the image by value: an image is destroyed exactly once. Works on
/// partially built images too — the ledger holds exactly what was mapped,
/// however far population got.
///
/// An unmap failure aborts teardown; the popped region and every entry
/// still in the ledger are reported leaked via
/// [`ImageError::TeardownAborted`], never silently dropped.
pub async fn destroy_image(ctx: &Context, image: ExecutionImage) -> Result<(), ImageError> {
    let caps = ctx.caps();
    let (handle, mut ledger) = image.into_parts();

    while !ledger.is_empty() {
        let region = ledger.pop();

        if let Err(source) = caps.unmap_region(region.handle).await {
            return Err(ImageError::TeardownAborted {
                image: handle,
                remaining: ledger.len() + 1,
                source,
            });
        }
        caps.release_region(region.handle).await;
        debug!(image = %handle, region = %region.handle, "region unmapped and released");
    }

    caps.release_image(handle).await;
    info!(image = %handle, "execution image destroyed");
    Ok(())
}
