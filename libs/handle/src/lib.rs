//! # kimg-handle
//!
//! Typed capability-slot handles for the kimg execution-image protocol.
//!
//! ## Design Principles
//!
//! - Handles are opaque references to kernel objects; the raw value is a
//!   capability-table slot minted by the backend, never by clients
//! - All handles have a canonical string representation with strict parsing
//! - Handles support roundtrip serialization (parse → format → parse)
//! - Handles are typed to prevent mixing different kernel object types
//!
//! ## Handle Format
//!
//! All handles use a prefixed format: `{prefix}_{slot:08x}`
//!
//! Examples:
//! - `img_0000002a`
//! - `mem_00000107`
//! - `aspc_00000004`
//!
//! This format provides:
//! - Type safety (prefix indicates kernel object type)
//! - Stable log/report output (fixed-width hex slots)
//! - Human readability (clear prefixes)

mod error;
mod macros;
mod types;

pub use error::HandleError;
pub use types::*;
