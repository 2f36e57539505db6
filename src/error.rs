//! The typed error hierarchy shared by every layer of the engine.
//!
//! Display follows `"GraphError: <kind> (<detail>)"` so that callers embedding
//! this library get a stable, greppable error string regardless of which
//! operation failed.

use std::fmt;

/// The broad category of a [`GraphError`], used both for `Display` and for
/// callers that want to branch on failure class without string-matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An invariant (I1-I4, I6) was violated. The operation was aborted
    /// without side effects.
    InvalidData,
    /// A storage slot lookup failed.
    AccessComponent,
    /// A storage read failed.
    Reading,
    /// A storage write failed.
    Writing,
    /// A secondary-index mutation failed after the primary write already
    /// succeeded. The primary model is left consistent; the index is
    /// lagging, not corrupt (see invariant I8).
    IndexError,
    /// A storage flush failed after a commit already applied in memory.
    /// Callers that see this kind should treat the graph as possibly
    /// corrupt; the engine itself turns this into a panic rather than
    /// returning it (see [`GraphError::Flushing`] doc).
    Flushing,
    /// A rollback attempt itself failed. Treated as fatal for the
    /// transaction that triggered it.
    Rollback,
    /// A subscribed rule returned a non-sentinel error.
    Rule,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidData => "InvalidData",
            ErrorKind::AccessComponent => "AccessComponent",
            ErrorKind::Reading => "Reading",
            ErrorKind::Writing => "Writing",
            ErrorKind::IndexError => "IndexError",
            ErrorKind::Flushing => "Flushing",
            ErrorKind::Rollback => "Rollback",
            ErrorKind::Rule => "Rule",
        };
        f.write_str(s)
    }
}

/// The engine's error type. Every fallible public operation returns
/// `Result<T, GraphError>`.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("GraphError: InvalidData ({0})")]
    InvalidData(String),

    #[error("GraphError: AccessComponent ({0})")]
    AccessComponent(String),

    #[error("GraphError: Reading ({0})")]
    Reading(String),

    #[error("GraphError: Writing ({0})")]
    Writing(String),

    #[error("GraphError: IndexError ({0})")]
    IndexError(String),

    /// Present for completeness of the [`ErrorKind`] taxonomy. The engine
    /// never constructs this variant itself: per spec, a flush failure
    /// after a successful commit means in-memory state has diverged from
    /// disk, which is unrecoverable, so the engine panics instead (see
    /// `txn::Transaction::commit`). Kept so downstream wrappers (e.g. a
    /// cluster-replication layer) have a slot to report flush failures
    /// they catch before they would otherwise propagate as a panic.
    #[error("GraphError: Flushing ({0})")]
    Flushing(String),

    #[error("GraphError: Rollback ({0})")]
    Rollback(String),

    #[error("GraphError: Rule ({0})")]
    Rule(String),

    /// An aggregate of failures from a batch of operations (transaction
    /// commit, import). Renders each inner error in `Display`.
    #[error("GraphError: Composite ({})", join_composite(.0))]
    Composite(Vec<GraphError>),
}

fn join_composite(errs: &[GraphError]) -> String {
    errs.iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl GraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::InvalidData(_) => ErrorKind::InvalidData,
            GraphError::AccessComponent(_) => ErrorKind::AccessComponent,
            GraphError::Reading(_) => ErrorKind::Reading,
            GraphError::Writing(_) => ErrorKind::Writing,
            GraphError::IndexError(_) => ErrorKind::IndexError,
            GraphError::Flushing(_) => ErrorKind::Flushing,
            GraphError::Rollback(_) => ErrorKind::Rollback,
            GraphError::Rule(_) => ErrorKind::Rule,
            // A composite reports itself through its inner errors; callers
            // wanting a single kind should inspect `.composite()` instead.
            GraphError::Composite(errs) => {
                errs.first().map(|e| e.kind()).unwrap_or(ErrorKind::InvalidData)
            }
        }
    }

    pub fn invalid_data(detail: impl Into<String>) -> Self {
        GraphError::InvalidData(detail.into())
    }

    pub fn composite(errs: Vec<GraphError>) -> Self {
        if errs.len() == 1 {
            errs.into_iter().next().unwrap()
        } else {
            GraphError::Composite(errs)
        }
    }
}

/// A rule's signal that it has fully handled an event and the caller
/// should short-circuit default processing for the current operation.
/// Distinct from [`GraphError`] on purpose: it is not a failure, so it is
/// never aggregated into a [`GraphError::Composite`], and a rule bus must
/// be able to tell "stop, but everything is fine" apart from "stop, and
/// something broke".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventHandled;

impl fmt::Display for EventHandled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("event handled")
    }
}

/// The outcome of dispatching one event to the rule bus: either every
/// subscriber ran to completion (possibly mutating the transaction), or
/// one of them raised [`EventHandled`] and the caller should stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    Continue,
    Handled,
}

pub type GraphResult<T> = Result<T, GraphError>;
