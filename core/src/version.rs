//! Aggregate version for optimistic concurrency control.
//!
//! Every mutating command executes as a read-validate-write cycle: the
//! caller reads the aggregate at some version, applies a transition, and
//! commits with that version as the expected value. If another writer got
//! there first the commit fails with a conflict and the whole cycle is
//! retried against the freshly re-read state.
//!
//! The version covers the Order *and* all of its return requests; they are
//! one aggregate for locking purposes, so a command touching either side
//! serializes against both.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonically increasing aggregate version.
///
/// Starts at 0 when an order is created and increments by 1 on every
/// committed mutation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// The initial version (0) for a newly created aggregate.
    pub const INITIAL: Self = Self(0);

    /// Create a new `Version` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next version (current + 1).
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Whether this is the initial version (0).
    #[must_use]
    pub const fn is_initial(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Version> for u64 {
    fn from(version: Version) -> Self {
        version.0
    }
}
