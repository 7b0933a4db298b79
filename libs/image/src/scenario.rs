//! Image lifecycle scenarios.
//!
//! Each scenario is a linear sequence over one freshly built image:
//! create/destroy, clone, bind, and execute. A scenario either reaches
//! `Destroyed` and passes, or aborts at the first failure. A build failure
//! is the one case with explicit cleanup: the partial image is handed to
//! teardown before the scenario reports failure.

use kimg_caps::{CapSystem, ThreadConfig};
use serde::Serialize;
use tracing::{error, info};

use crate::builder::{create_image, BuildFailure};
use crate::context::Context;
use crate::error::ImageError;
use crate::image::ExecutionImage;
use crate::teardown::destroy_image;

/// Which lifecycle sequence a scenario exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Build an image, then tear it down.
    CreateDestroy,

    /// Build, clone content from the base image, tear down.
    Clone,

    /// Build, clone, bind to a fresh address space, tear down.
    Bind,

    /// Build, clone, bind, run a thread against the image, tear down.
    Execute,
}

impl ScenarioKind {
    /// Runs the scenario to completion or first failure.
    pub async fn run(&self, ctx: &Context) -> Result<(), ImageError> {
        match self {
            ScenarioKind::CreateDestroy => create_destroy(ctx).await,
            ScenarioKind::Clone => clone_into(ctx).await,
            ScenarioKind::Bind => bind_address_space(ctx).await,
            ScenarioKind::Execute => execute_thread(ctx).await,
        }
    }
}

/// A registered scenario: stable name, human title, and the sequence to run.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScenarioSpec {
    /// Stable scenario name, e.g. `IMG0001`.
    pub name: &'static str,

    /// One-line description.
    pub title: &'static str,

    /// The sequence this scenario runs.
    pub kind: ScenarioKind,
}

/// One scenario's verdict.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: &'static str,
    pub title: &'static str,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScenarioSpec {
    /// Runs the scenario and folds the outcome into a report.
    pub async fn report(&self, ctx: &Context) -> ScenarioReport {
        info!(scenario = self.name, title = self.title, "running scenario");
        match self.kind.run(ctx).await {
            Ok(()) => {
                info!(scenario = self.name, "scenario passed");
                ScenarioReport {
                    name: self.name,
                    title: self.title,
                    passed: true,
                    error: None,
                }
            }
            Err(e) => {
                error!(scenario = self.name, error = %e, "scenario failed");
                ScenarioReport {
                    name: self.name,
                    title: self.title,
                    passed: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Every registered scenario, in execution order.
pub fn all() -> &'static [ScenarioSpec] {
    &[
        ScenarioSpec {
            name: "IMG0001",
            title: "Create and destroy an execution image",
            kind: ScenarioKind::CreateDestroy,
        },
        ScenarioSpec {
            name: "IMG0002",
            title: "Clone into a fresh execution image",
            kind: ScenarioKind::Clone,
        },
        ScenarioSpec {
            name: "IMG0003",
            title: "Bind an execution image to an address space",
            kind: ScenarioKind::Bind,
        },
        ScenarioSpec {
            name: "IMG0004",
            title: "Execute a thread against a bound execution image",
            kind: ScenarioKind::Execute,
        },
    ]
}

/// Looks up a scenario by name, case-insensitively.
pub fn find(name: &str) -> Option<ScenarioSpec> {
    all()
        .iter()
        .copied()
        .find(|spec| spec.name.eq_ignore_ascii_case(name))
}

/// Builds an image; on failure, tears down whatever was built, then
/// propagates the build error.
async fn build(ctx: &Context) -> Result<ExecutionImage, ImageError> {
    match create_image(ctx).await {
        Ok(image) => Ok(image),
        Err(BuildFailure { error, partial }) => {
            if let Some(partial) = partial {
                // Cleanup failure must not mask the build failure; it is
                // reported on its own.
                if let Err(cleanup) = destroy_image(ctx, partial).await {
                    error!(error = %cleanup, "teardown of partially built image failed");
                }
            }
            Err(error)
        }
    }
}

async fn create_destroy(ctx: &Context) -> Result<(), ImageError> {
    let image = build(ctx).await?;
    destroy_image(ctx, image).await
}

async fn clone_into(ctx: &Context) -> Result<(), ImageError> {
    let image = build(ctx).await?;
    image.clone_from(ctx, ctx.base_image()).await?;
    destroy_image(ctx, image).await
}

async fn bind_address_space(ctx: &Context) -> Result<(), ImageError> {
    let mut image = build(ctx).await?;
    let caps = ctx.caps();

    let space = caps.allocate_address_space().await?;
    caps.assign_addressing_domain(space).await?;

    image.clone_from(ctx, ctx.base_image()).await?;
    image.bind(ctx, space).await?;

    caps.release_address_space(space).await;
    destroy_image(ctx, image).await
}

async fn execute_thread(ctx: &Context) -> Result<(), ImageError> {
    let mut image = build(ctx).await?;
    image.clone_from(ctx, ctx.base_image()).await?;

    let caps = ctx.caps();
    let space = caps.allocate_address_space().await?;
    caps.assign_addressing_domain(space).await?;
    image.bind(ctx, space).await?;

    let channel = caps.allocate_channel().await?;
    let thread = caps
        .spawn_thread(ThreadConfig {
            image: image.handle(),
            space,
            channel,
        })
        .await?;

    info!(thread = %thread, channel = %channel, "waiting for spawned thread");
    caps.wait(channel).await?;

    caps.destroy_thread(thread).await;
    caps.release_channel(channel).await;
    caps.release_address_space(space).await;
    destroy_image(ctx, image).await
}
