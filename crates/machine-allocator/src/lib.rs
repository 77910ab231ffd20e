//! Machine Allocator
//!
//! Enforces exclusive machine-to-session binding and isolation-only
//! machine constraints.

mod allocator;

pub use allocator::{AllocatorError, MachineAllocator};
