use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::domain::event::{EgressPayload, decode_event};
use crate::domain::repository::{DeliveryLogRepository, EgressDispatcher, EventSubscription};
use crate::domain::types::{DeliveryAttempt, DeliveryOutcome, InboundMessage};

/// Pause before re-pulling after a subscription error, so a dead broker
/// connection does not spin the loop.
const PULL_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// What the consumer decided to do with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Remove the message from the redelivery set.
    Ack,
    /// Leave it unacked; the channel redelivers after the lease expires.
    Hold,
}

/// Long-running relay: pulls events from the subscription, drives the egress
/// dispatcher, and acks or withholds acks based on the outcome.
///
/// Messages are processed one at a time per subscription, so acks never
/// reorder. Multiple instances can run against the same consumer group; the
/// channel's per-message leases keep them from stepping on each other.
pub struct RelayConsumer<S, D, L>
where
    S: EventSubscription,
    D: EgressDispatcher,
    L: DeliveryLogRepository,
{
    pub subscription: S,
    pub dispatcher: D,
    pub deliveries: L,
    pub callback_url: String,
}

impl<S, D, L> RelayConsumer<S, D, L>
where
    S: EventSubscription,
    D: EgressDispatcher,
    L: DeliveryLogRepository,
{
    /// Run until the shutdown signal flips. In-flight messages from the
    /// current batch finish their dispatch-and-ack cycle before exit;
    /// anything still unacked is redelivered later, so an abrupt kill is
    /// also safe.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(callback_url = %self.callback_url, "relay consumer started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            let batch = tokio::select! {
                _ = shutdown.changed() => break,
                pulled = self.subscription.pull() => match pulled {
                    Ok(batch) => batch,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to pull from subscription");
                        tokio::time::sleep(PULL_ERROR_BACKOFF).await;
                        continue;
                    }
                },
            };
            for message in &batch {
                if self.process(message).await == Disposition::Ack {
                    if let Err(e) = self.subscription.ack(&message.handle).await {
                        // The dispatch already happened; a lost ack only means
                        // a redundant redelivery, which at-least-once allows.
                        tracing::error!(
                            message_id = %message.handle,
                            error = %e,
                            "failed to ack message"
                        );
                    }
                }
            }
        }
        tracing::info!("relay consumer stopped");
    }

    /// Handle one message: decode, dispatch, record, decide.
    pub async fn process(&self, message: &InboundMessage) -> Disposition {
        let event = match decode_event(&message.payload) {
            Ok(event) => event,
            Err(e) => {
                // Poison message: it will never parse, redelivering it
                // forever helps no one. Ack and leave a distinct trace.
                tracing::warn!(
                    message_id = %message.handle,
                    error = %e,
                    "poison message, acknowledging without delivery"
                );
                return Disposition::Ack;
            }
        };

        let payload = EgressPayload::from_event(&event, Utc::now());
        let report = self.dispatcher.deliver(&payload, &self.callback_url).await;

        let attempt = DeliveryAttempt {
            id: Uuid::now_v7(),
            message_id: message.handle.0.clone(),
            order_ref: event.order_id.clone(),
            http_status: report.last_status.map(|s| s as i16),
            attempts: report.attempts as i32,
            outcome: report.outcome,
            created_at: Utc::now(),
        };
        if let Err(e) = self.deliveries.record(&attempt).await {
            // Ledger is observability, not correctness; do not fail delivery
            // bookkeeping into a redelivery loop.
            tracing::error!(order_ref = %event.order_id, error = %e, "failed to record delivery attempt");
        }

        match report.outcome {
            DeliveryOutcome::Delivered => {
                tracing::info!(
                    order_ref = %event.order_id,
                    attempts = report.attempts,
                    "delivered order.created downstream"
                );
                Disposition::Ack
            }
            DeliveryOutcome::PermanentFailure => {
                tracing::error!(
                    order_ref = %event.order_id,
                    status = ?report.last_status,
                    "downstream rejected order.created, not retrying"
                );
                Disposition::Ack
            }
            DeliveryOutcome::RetryableFailure => {
                tracing::warn!(
                    order_ref = %event.order_id,
                    attempts = report.attempts,
                    "transient delivery failure, leaving message for redelivery"
                );
                Disposition::Hold
            }
        }
    }
}
