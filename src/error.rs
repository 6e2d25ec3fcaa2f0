//! Error taxonomy shared by every primitive in the kernel.
//!
//! Only [`Error::Poisoned`] is meant to be routine control flow (processes
//! that cooperate with poison catch it, propagate it, and return). The other
//! variants indicate a programming error or internal corruption and are
//! expected to be fatal to whatever called into the kernel.

use std::fmt;

/// The four error kinds a core primitive can raise.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A channel operation was attempted on a channel that has been
    /// poisoned. Carries the poison strength, which is monotonically
    /// non-decreasing across the channel's lifetime.
    #[error("channel poisoned with strength {0}")]
    Poisoned(u32),

    /// A primitive was used in a way that violates its call protocol:
    /// `end_read` without a matching `start_read`, `start_read` while a read
    /// is already extended, a pre-condition mask of the wrong length, or a
    /// pre-condition referring to a non-existent guard index.
    #[error("protocol violation: {0}")]
    ProtocolViolation(ProtocolViolation),

    /// A primitive that tracks a single owning task was used from another
    /// task: an alt shared across tasks, or an alting-barrier front-end used
    /// by a task other than the one that called `mark()`/first used it.
    #[error("ownership violation: {0}")]
    OwnershipViolation(OwnershipViolation),

    /// Internal bookkeeping was found in a state that should be
    /// unreachable under correct use: alting-barrier coordination counters
    /// out of range, a barrier firing twice in one alt sequence, or a
    /// `contract` of a front-end the base never registered. Indicates
    /// corruption; treat the owning process as unrecoverable.
    #[error("invariant violation: {0}")]
    InvariantViolation(InvariantViolation),
}

/// Reason an operation violated its call protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// `end_read` called without a preceding `start_read`.
    EndReadNotStarted,
    /// `start_read` called while a previous extended read is still open.
    ReadAlreadyExtended,
    /// The pre-condition mask passed to `select` did not have one entry per
    /// guard.
    PreConditionLengthMismatch { expected: usize, got: usize },
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolViolation::EndReadNotStarted => {
                write!(f, "end_read called without a matching start_read")
            }
            ProtocolViolation::ReadAlreadyExtended => {
                write!(f, "start_read called while a read is already extended")
            }
            ProtocolViolation::PreConditionLengthMismatch { expected, got } => write!(
                f,
                "pre-condition mask has {got} entries, expected {expected}"
            ),
        }
    }
}

/// Reason an operation violated single-owner usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipViolation {
    /// An alting-barrier front-end was used from a task other than its
    /// recorded owner.
    NotOwner,
    /// An alt's internal state was touched from more than one task.
    SharedAlt,
}

impl fmt::Display for OwnershipViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnershipViolation::NotOwner => {
                write!(f, "alting-barrier front-end used from a non-owning task")
            }
            OwnershipViolation::SharedAlt => write!(f, "alt used from more than one task"),
        }
    }
}

/// Reason internal bookkeeping was found corrupted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Two alting-barrier guards both reported a firing within the same
    /// enable/disable sequence of one alt.
    DoubleBarrierFiring { first: usize, second: usize },
    /// A front-end was passed to `contract` that the base never enrolled.
    UnknownFrontEnd,
    /// An alting-barrier base's countdown fell outside `0..=enrolled`.
    CountdownOutOfRange,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::DoubleBarrierFiring { first, second } => write!(
                f,
                "second alting barrier completed in alt sequence: {first} and {second}"
            ),
            InvariantViolation::UnknownFrontEnd => {
                write!(f, "contract called with a front-end unknown to the base")
            }
            InvariantViolation::CountdownOutOfRange => {
                write!(f, "alting-barrier countdown out of range")
            }
        }
    }
}

/// Shorthand result type used throughout the kernel.
pub type Result<T> = std::result::Result<T, Error>;
