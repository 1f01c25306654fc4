use crate::domain::ports::{PaymentGateway, PaymentReceipt, PaymentRequest};
use crate::error::{Result, WorkflowError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

/// Gateway adapter that accepts every payment and keeps a log of the
/// requests it saw.
///
/// Stands in for the external processor in the batch runner and in tests;
/// `fail_next` flips the next call into a gateway failure so settlement
/// retry behavior can be exercised. The request log uses a std mutex held
/// only for the push/clone, never across an await.
#[derive(Default, Clone)]
pub struct RecordingGateway {
    requests: Arc<Mutex<Vec<PaymentRequest>>>,
    fail_next: Arc<AtomicBool>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `process_payment` call fail once.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// The requests processed so far, in call order.
    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn process_payment(&self, request: PaymentRequest) -> Result<PaymentReceipt> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(WorkflowError::Gateway(
                "payment processor unavailable".to_string(),
            ));
        }

        let receipt = PaymentReceipt {
            transaction_id: format!("TXN-{}", Uuid::new_v4()),
            idempotency_key: request.idempotency_key.clone(),
            status: "SUCCESS".to_string(),
        };
        info!(
            amount = %request.amount,
            idempotency_key = %request.idempotency_key,
            "processed payment"
        );
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        Ok(receipt)
    }
}
