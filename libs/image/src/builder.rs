//! Image creation and population.
//!
//! The builder allocates an image object, registers it in the identifier
//! table, then walks the layout level by level allocating and mapping
//! regions. Mapping order is the layout's hierarchy contract: level 0
//! first, each level's full count before the next.

use kimg_caps::{CapSystem, ImageId};
use thiserror::Error;
use tracing::{debug, info};

use crate::context::Context;
use crate::error::ImageError;
use crate::image::ExecutionImage;
use crate::ledger::MappedRegion;

/// The fixed logical identifier every scenario-built image registers under.
pub const SCENARIO_IMAGE_ID: ImageId = ImageId::new(4);

/// A failed build, carrying whatever was built before the failure.
///
/// The builder never unwinds: the partial image's ledger reflects exactly
/// the regions that were successfully mapped, and the caller is responsible
/// for passing it to teardown.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct BuildFailure {
    /// The failure that aborted the build.
    pub error: ImageError,

    /// The image as far as it got. `None` only when the image object
    /// itself could not be allocated.
    pub partial: Option<ExecutionImage>,
}

/// Creates and fully populates an execution image per the context's layout.
///
/// On success the image is populated and its ledger length equals the
/// layout's total region count. A zero-level layout yields a valid image
/// with no backing regions. Any allocation or mapping failure aborts the
/// build immediately; see [`BuildFailure`].
pub async fn create_image(ctx: &Context) -> Result<ExecutionImage, BuildFailure> {
    let caps = ctx.caps();

    let handle = match caps.allocate_image().await {
        Ok(handle) => handle,
        Err(error) => {
            return Err(BuildFailure {
                error: error.into(),
                partial: None,
            })
        }
    };
    let mut image = ExecutionImage::new(handle);
    debug!(image = %handle, "image object allocated");

    if let Err(error) = caps
        .assign_identifier(ctx.id_table(), handle, SCENARIO_IMAGE_ID)
        .await
    {
        return Err(BuildFailure {
            error: error.into(),
            partial: Some(image),
        });
    }

    for (level, descriptor) in ctx.layout().levels().iter().enumerate() {
        for _ in 0..descriptor.count {
            let region = match caps.allocate_region(descriptor.size).await {
                Ok(region) => region,
                Err(error) => {
                    return Err(BuildFailure {
                        error: error.into(),
                        partial: Some(image),
                    })
                }
            };

            if let Err(error) = caps.map_region(region, handle).await {
                return Err(BuildFailure {
                    error: error.into(),
                    partial: Some(image),
                });
            }

            image.push_region(MappedRegion {
                handle: region,
                size: descriptor.size,
            });
            debug!(image = %handle, region = %region, level, "region mapped into image");
        }
    }

    image.mark_populated();
    info!(
        image = %handle,
        regions = image.ledger().len(),
        levels = ctx.layout().num_levels(),
        "execution image populated"
    );
    Ok(image)
}
