//! Glue between the settlement channel and the workflow engine: decode the
//! delivery, dispatch it to `process_settlement`, and translate the outcome
//! into ack / redeliver / dead-letter.

use crate::application::engine::ExpenseEngine;
use crate::domain::expense::ExpenseStatus;
use crate::domain::settlement::SettlementMessage;
use crate::infrastructure::channel::{Delivery, SettlementConsumer};
use tracing::{debug, error, warn};

/// Handles a single delivery. Returns the delivery itself when it should be
/// redelivered; `None` means it was acknowledged (processed, terminally
/// invalid, or poison).
pub async fn handle_delivery(engine: &ExpenseEngine, delivery: Delivery) -> Option<Delivery> {
    let message: SettlementMessage = match serde_json::from_slice(&delivery.body) {
        Ok(message) => message,
        Err(err) => {
            // Poison: redelivering an undecodable payload can never help.
            error!(error = %err, "dropping undecodable settlement payload");
            return None;
        }
    };

    debug!(
        expense_id = message.expense_id,
        approver_id = message.approver_id,
        status = ExpenseStatus::label_for(message.status),
        attempt = delivery.attempt,
        "settlement delivery received"
    );

    match engine.process_settlement(&message).await {
        Ok(()) => None,
        Err(err) if !err.is_retryable() => {
            // Already finalized: acknowledge, a retry cannot succeed.
            warn!(
                expense_id = message.expense_id,
                error = %err,
                "acknowledging settlement for finalized expense"
            );
            None
        }
        Err(err) => {
            warn!(
                expense_id = message.expense_id,
                attempt = delivery.attempt,
                error = %err,
                "settlement attempt failed"
            );
            Some(delivery)
        }
    }
}

/// Drains every delivery currently in the channel, applying the
/// ack/redeliver/dead-letter protocol. Used by the batch runner after the
/// command replay; redeliveries are retried within the same drain.
pub async fn drain_settlements(engine: &ExpenseEngine, consumer: &mut SettlementConsumer) {
    // Detached submit-path publishes may still be in flight, so an empty
    // channel only counts after a few idle probes in a row.
    let mut idle_probes = 0;
    while idle_probes < 3 {
        let Some(delivery) = consumer.try_recv() else {
            idle_probes += 1;
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            continue;
        };
        idle_probes = 0;
        if let Some(failed) = handle_delivery(engine, delivery).await
            && !consumer.redeliver(failed)
        {
            error!(
                max_attempts = consumer.max_attempts(),
                "settlement dead-lettered after exhausting redeliveries"
            );
        }
    }
}

/// Long-running consumer loop for service deployments: blocks on the
/// channel until every publisher is dropped.
pub async fn run_consumer(engine: &ExpenseEngine, mut consumer: SettlementConsumer) {
    while let Some(delivery) = consumer.recv().await {
        if let Some(failed) = handle_delivery(engine, delivery).await
            && !consumer.redeliver(failed)
        {
            error!(
                max_attempts = consumer.max_attempts(),
                "settlement dead-lettered after exhausting redeliveries"
            );
        }
    }
}
