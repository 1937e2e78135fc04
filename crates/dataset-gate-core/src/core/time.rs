// crates/dataset-gate-core/src/core/time.rs
// ============================================================================
// Module: Dataset Gate Time Model
// Description: Timestamp representation for checkout records.
// Purpose: Keep checkout times explicit and serializable.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Checkout records carry unix-epoch milliseconds. The core never reads the
//! wall clock itself; the gateway supplies timestamps when it records.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Unix-epoch timestamp in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp from unix-epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix-epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> u64 {
        self.0
    }
}
