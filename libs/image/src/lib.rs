//! # kimg-image
//!
//! Client-side lifecycle protocol for capability-kernel execution images.
//!
//! An execution image is backed by a hierarchy of physical memory regions.
//! The builder allocates and maps those regions level by level; the ledger
//! records every mapping in order; teardown drains the ledger in strict
//! reverse order, unmapping then releasing each region before the image
//! object itself is released. No region is ever leaked or freed while still
//! mapped.
//!
//! ## Modules
//!
//! - `layout`: level descriptors and environment-driven configuration
//! - `ledger`: the LIFO record of mapped regions
//! - `image`: `ExecutionImage` and its lifecycle-state checks
//! - `builder`: image creation and population
//! - `teardown`: reverse-order unmapping and release
//! - `context`: the explicit protocol context passed to every operation
//! - `scenario`: the four lifecycle scenarios and their registry

pub mod builder;
pub mod context;
pub mod error;
pub mod image;
pub mod layout;
pub mod ledger;
pub mod scenario;
pub mod teardown;

// Re-export commonly used types
pub use builder::{create_image, BuildFailure, SCENARIO_IMAGE_ID};
pub use context::Context;
pub use error::ImageError;
pub use image::ExecutionImage;
pub use layout::{ImageLayout, LayoutError, LevelDescriptor};
pub use ledger::{MappedRegion, RegionLedger};
pub use scenario::{ScenarioKind, ScenarioReport, ScenarioSpec};
pub use teardown::destroy_image;
