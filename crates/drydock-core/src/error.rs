//! Error taxonomy for fitting operations.
//!
//! Every public operation in this crate fails with exactly one of three
//! kinds:
//!
//! - [`Error::NotFound`] — the referenced slot, entity, or relationship does
//!   not exist at call time. Expected and recoverable by the caller.
//! - [`Error::NotApplicable`] — the operation is well-formed but the
//!   addressed entity does not support it. Expected and recoverable.
//! - [`Error::EngineFault`] — the engine answered outside its documented
//!   tri-state, or the model and the engine disagree about shared state.
//!   This is a programming or synchronization bug: the operation aborts, no
//!   repair of graph state is attempted, and the fault is not meant to be
//!   caught by normal control flow.

use thiserror::Error;

use tenet::{EngineHandle, EngineStatus};

/// Unrecoverable inconsistency between the model and the engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum EngineFault {
    /// The engine returned a status outside the documented tri-state.
    #[error("engine returned undocumented status {0}")]
    UnexpectedStatus(u32),
    /// Bulk capacitor result size disagrees with the local relevant set.
    #[error("capacitor record count {actual} does not match relevant-set size {expected}")]
    CapacitorCount {
        /// Size of the locally computed relevant set.
        expected: usize,
        /// Number of records the engine returned.
        actual: usize,
    },
    /// A capacitor record's identity token matches no relevant context.
    #[error("capacitor record origin {0} matches no relevant context")]
    UnmatchedCapacitorOrigin(EngineHandle),
    /// Two capacitor records carried the same identity token.
    #[error("capacitor record origin {0} was already claimed by an earlier record")]
    DuplicateCapacitorOrigin(EngineHandle),
    /// Local fleet bookkeeping and the engine disagree about membership.
    #[error("fleet membership disagreement: local says {local}, engine says {engine}")]
    FleetDesync {
        /// Whether the local scan removed anything.
        local: bool,
        /// Whether the engine reported a removal.
        engine: bool,
    },
}

/// Failure of one fitting operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The referenced slot, entity, or relationship does not exist.
    #[error("referenced entity, slot, or relationship does not exist")]
    NotFound,
    /// The operation does not apply to the addressed entity.
    #[error("operation does not apply to the addressed entity")]
    NotApplicable,
    /// Unrecoverable model/engine inconsistency.
    #[error("unrecoverable engine fault: {0}")]
    EngineFault(#[from] EngineFault),
}

impl From<EngineStatus> for Error {
    fn from(status: EngineStatus) -> Self {
        match status {
            EngineStatus::NotFound => Self::NotFound,
            EngineStatus::NotApplicable => Self::NotApplicable,
            EngineStatus::Internal(code) => Self::EngineFault(EngineFault::UnexpectedStatus(code)),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
