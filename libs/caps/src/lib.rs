//! # kimg-caps
//!
//! The capability-system boundary for the kimg execution-image protocol.
//!
//! The protocol core never talks to a kernel directly; every object
//! allocation, mapping, release, and rendezvous operation goes through the
//! [`CapSystem`] trait. A real backend would issue capability invocations;
//! [`MockCaps`] provides an in-memory capability table with quota-based
//! failure injection for tests and the scenario runner.
//!
//! ## Modules
//!
//! - `backend`: the `CapSystem` trait (the full external interface)
//! - `error`: the `CapError` taxonomy
//! - `mock`: the in-memory mock backend
//! - `types`: shared value types (`SizeBits`, `ImageId`, `ThreadConfig`)

mod backend;
mod error;
mod mock;
mod types;

pub use backend::CapSystem;
pub use error::CapError;
pub use mock::MockCaps;
pub use types::{BootCaps, ImageId, SizeBits, ThreadConfig};
