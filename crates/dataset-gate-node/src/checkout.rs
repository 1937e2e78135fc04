// crates/dataset-gate-node/src/checkout.rs
// ============================================================================
// Module: Checkout Recorder
// Description: Audit records for delivered dataset content.
// Purpose: Submit one checkout per successful content delivery.
// Dependencies: dataset-gate-core, tracing
// ============================================================================

//! ## Overview
//! [`CheckoutRecorder`] stamps a [`DatasetCheckout`] with the current wall
//! clock and hands it to the checkout ledger. The router calls it only after
//! the content handler has produced a successful response; a ledger failure
//! replaces that response with a 500.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use dataset_gate_core::CheckoutError;
use dataset_gate_core::CheckoutManager;
use dataset_gate_core::Client;
use dataset_gate_core::DatasetCheckout;
use dataset_gate_core::DatasetId;
use dataset_gate_core::Timestamp;

// ============================================================================
// SECTION: Recorder
// ============================================================================

/// Submits checkout records to the ledger.
#[derive(Clone)]
pub struct CheckoutRecorder {
    /// Ledger collaborator.
    ledger: Arc<dyn CheckoutManager>,
}

impl CheckoutRecorder {
    /// Creates a recorder over the given ledger.
    #[must_use]
    pub fn new(ledger: Arc<dyn CheckoutManager>) -> Self {
        Self {
            ledger,
        }
    }

    /// Records that `client` received `dataset_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] when the ledger refuses the record.
    pub fn record(
        &self,
        dataset_id: &DatasetId,
        client: &Client,
    ) -> Result<DatasetCheckout, CheckoutError> {
        let checkout = DatasetCheckout {
            dataset_id: dataset_id.clone(),
            client: client.clone(),
            checked_out_at: now(),
        };
        self.ledger.checkout(&checkout).inspect_err(|err| {
            tracing::error!(
                dataset_id = %dataset_id,
                client_id = %client.id,
                error = %err,
                "checkout not recorded"
            );
        })?;
        tracing::info!(
            event = "dataset.checkout",
            dataset_id = %dataset_id,
            client_id = %client.id,
            checked_out_at = checkout.checked_out_at.as_unix_millis(),
            "dataset checked out"
        );
        Ok(checkout)
    }

    /// Lists checkouts recorded for a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] when the ledger cannot be read.
    pub fn history(&self, dataset_id: &DatasetId) -> Result<Vec<DatasetCheckout>, CheckoutError> {
        self.ledger.dataset_checkouts(dataset_id)
    }
}

/// Returns the current wall-clock time; clocks before the epoch read as zero.
fn now() -> Timestamp {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
    Timestamp::from_unix_millis(millis)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap for clarity."
    )]

    use dataset_gate_core::ClientId;
    use dataset_gate_core::InMemoryCheckoutLedger;

    use super::*;

    /// Ledger that refuses every record.
    struct RefusingLedger;

    impl CheckoutManager for RefusingLedger {
        fn checkout(&self, _checkout: &DatasetCheckout) -> Result<(), CheckoutError> {
            Err(CheckoutError::Rejected("ledger is read-only".to_string()))
        }

        fn dataset_checkouts(
            &self,
            _id: &DatasetId,
        ) -> Result<Vec<DatasetCheckout>, CheckoutError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn records_are_stamped_and_persisted() {
        let ledger = Arc::new(InMemoryCheckoutLedger::new());
        let recorder = CheckoutRecorder::new(Arc::clone(&ledger) as Arc<dyn CheckoutManager>);
        let client = Client::new(ClientId::new("client-1"));
        let id = DatasetId::new("ds");

        let checkout = recorder.record(&id, &client).unwrap();
        assert_eq!(checkout.client, client);
        assert!(checkout.checked_out_at.as_unix_millis() > 0);
        assert_eq!(recorder.history(&id).unwrap(), vec![checkout]);
        assert_eq!(ledger.all().unwrap().len(), 1);
    }

    #[test]
    fn ledger_rejection_is_surfaced() {
        let recorder = CheckoutRecorder::new(Arc::new(RefusingLedger));
        let result = recorder.record(&DatasetId::new("ds"), &Client::new(ClientId::new("c")));
        assert!(matches!(result, Err(CheckoutError::Rejected(_))));
    }
}
