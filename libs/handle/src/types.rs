//! Typed handle definitions for all kernel object types the protocol touches.
//!
//! Each handle type has a unique prefix that identifies the object type.
//! The raw value is the capability-table slot the backend minted the
//! object into.

use crate::define_handle;

// =============================================================================
// Images and Backing Memory
// =============================================================================

define_handle!(ImageHandle, "img");
define_handle!(RegionHandle, "mem");

// =============================================================================
// Addressing
// =============================================================================

define_handle!(AddressSpaceHandle, "aspc");

// =============================================================================
// Execution and Rendezvous
// =============================================================================

define_handle!(ThreadHandle, "thrd");
define_handle!(ChannelHandle, "chan");

// =============================================================================
// Tables
// =============================================================================

define_handle!(IdTableHandle, "idt");

// =============================================================================
// Tests
// =============================================================================
