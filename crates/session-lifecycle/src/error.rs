//! Lifecycle Error Types

use crate::vitals::VitalsError;
use machine_allocator::AllocatorError;
use storage::{SessionStatus, StorageError};
use thiserror::Error;

/// Errors from session lifecycle operations.
///
/// Every guard failure is returned to the caller as a typed error so the
/// presentation layer can surface a clinically meaningful message; nothing
/// is silently swallowed or auto-retried.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The session's current status does not allow the attempted operation
    #[error("Cannot {attempted} a session that is {from}")]
    InvalidStateTransition {
        from: SessionStatus,
        attempted: &'static str,
    },

    /// Cancellation requires an explicit reason
    #[error("A cancellation reason is required")]
    ReasonRequired,

    /// The patient requires isolation (or no machine was supplied at all)
    /// and no isolation-capable machine was provided
    #[error("A suitable machine must be supplied to start this session")]
    MachineRequired,

    #[error(transparent)]
    Validation(#[from] VitalsError),

    #[error(transparent)]
    Allocator(#[from] AllocatorError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
