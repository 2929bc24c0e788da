use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rust_decimal::Decimal;

use orderbus_orders::domain::event::{EgressPayload, OrderEvent, encode_event};
use orderbus_orders::domain::repository::{
    DeliveryLogRepository, EgressDispatcher, EventPublisher, EventSubscription, OrderRepository,
};
use orderbus_orders::domain::types::{
    DeliveryAttempt, DeliveryOutcome, DeliveryReport, InboundMessage, MessageHandle, Order,
    OrderItem,
};
use orderbus_orders::error::{ChannelError, OrdersServiceError};
use orderbus_orders::usecase::ingest::{IngestItem, IngestOrderInput};

// ── MockOrderRepo ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockOrderRepo {
    pub orders: Arc<Mutex<Vec<(Order, Vec<OrderItem>)>>>,
    pub fail: bool,
}

impl MockOrderRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            orders: Arc::default(),
            fail: true,
        }
    }

    /// Shared handle to the stored orders for post-execution inspection.
    pub fn orders_handle(&self) -> Arc<Mutex<Vec<(Order, Vec<OrderItem>)>>> {
        Arc::clone(&self.orders)
    }
}

impl OrderRepository for MockOrderRepo {
    async fn create_with_items(
        &self,
        order: &Order,
        items: &[OrderItem],
    ) -> Result<(), OrdersServiceError> {
        if self.fail {
            return Err(OrdersServiceError::Internal(anyhow::anyhow!(
                "store unavailable"
            )));
        }
        let mut orders = self.orders.lock().unwrap();
        if orders
            .iter()
            .any(|(stored, _)| stored.external_ref == order.external_ref)
        {
            return Err(OrdersServiceError::DuplicateOrder);
        }
        orders.push((order.clone(), items.to_vec()));
        Ok(())
    }
}

// ── MockPublisher ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockPublisher {
    pub published: Arc<Mutex<Vec<OrderEvent>>>,
    pub fail: bool,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            published: Arc::default(),
            fail: true,
        }
    }

    pub fn published_handle(&self) -> Arc<Mutex<Vec<OrderEvent>>> {
        Arc::clone(&self.published)
    }
}

impl EventPublisher for MockPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<MessageHandle, ChannelError> {
        if self.fail {
            return Err(ChannelError::Timeout);
        }
        let mut published = self.published.lock().unwrap();
        published.push(event.clone());
        Ok(MessageHandle(format!("m-{}", published.len())))
    }
}

// ── InMemoryChannel ──────────────────────────────────────────────────────────
// Test double for the durable channel with the contract's semantics: publish
// appends durably, pull leases unacked entries, ack removes them, and
// `expire_leases` simulates a lease timeout so held messages come back.

struct Entry {
    id: String,
    payload: Vec<u8>,
    acked: bool,
    leased: bool,
}

#[derive(Clone, Default)]
pub struct InMemoryChannel {
    entries: Arc<Mutex<Vec<Entry>>>,
}

impl InMemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_raw(&self, payload: Vec<u8>) -> MessageHandle {
        let mut entries = self.entries.lock().unwrap();
        let id = format!("{}-0", entries.len() + 1);
        entries.push(Entry {
            id: id.clone(),
            payload,
            acked: false,
            leased: false,
        });
        MessageHandle(id)
    }

    pub fn subscription(&self) -> InMemorySubscription {
        InMemorySubscription {
            channel: self.clone(),
        }
    }

    /// Simulate the lease timeout elapsing: every unacked entry becomes
    /// pullable again (channel-driven redelivery).
    pub fn expire_leases(&self) {
        for entry in self.entries.lock().unwrap().iter_mut() {
            entry.leased = false;
        }
    }

    pub fn published_payloads(&self) -> Vec<Vec<u8>> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.payload.clone())
            .collect()
    }

    pub fn unacked_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| !e.acked)
            .count()
    }
}

impl EventPublisher for InMemoryChannel {
    async fn publish(&self, event: &OrderEvent) -> Result<MessageHandle, ChannelError> {
        let payload =
            encode_event(event).map_err(|e| ChannelError::Backend(anyhow::Error::new(e)))?;
        Ok(self.publish_raw(payload))
    }
}

pub struct InMemorySubscription {
    channel: InMemoryChannel,
}

impl EventSubscription for InMemorySubscription {
    async fn pull(&self) -> Result<Vec<InboundMessage>, ChannelError> {
        let batch: Vec<InboundMessage> = {
            let mut entries = self.channel.entries.lock().unwrap();
            entries
                .iter_mut()
                .filter(|e| !e.acked && !e.leased)
                .map(|e| {
                    e.leased = true;
                    InboundMessage {
                        handle: MessageHandle(e.id.clone()),
                        payload: e.payload.clone(),
                    }
                })
                .collect()
        };
        if batch.is_empty() {
            // Mimic a blocking pull so a consumer loop does not spin.
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(batch)
    }

    async fn ack(&self, handle: &MessageHandle) -> Result<(), ChannelError> {
        let mut entries = self.channel.entries.lock().unwrap();
        if let Some(entry) = entries.iter_mut().find(|e| e.id == handle.0) {
            entry.acked = true;
        }
        Ok(())
    }
}

// ── MockDispatcher ───────────────────────────────────────────────────────────

pub struct MockDispatcher {
    script: Mutex<VecDeque<DeliveryOutcome>>,
    pub calls: Arc<Mutex<Vec<(EgressPayload, String)>>>,
}

impl MockDispatcher {
    /// Outcomes returned in order; `Delivered` once the script runs out.
    pub fn scripted(outcomes: impl IntoIterator<Item = DeliveryOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            calls: Arc::default(),
        }
    }

    pub fn delivering() -> Self {
        Self::scripted([])
    }

    pub fn calls_handle(&self) -> Arc<Mutex<Vec<(EgressPayload, String)>>> {
        Arc::clone(&self.calls)
    }
}

impl EgressDispatcher for MockDispatcher {
    async fn deliver(&self, payload: &EgressPayload, url: &str) -> DeliveryReport {
        self.calls
            .lock()
            .unwrap()
            .push((payload.clone(), url.to_owned()));
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(DeliveryOutcome::Delivered);
        match outcome {
            DeliveryOutcome::Delivered => DeliveryReport {
                outcome,
                attempts: 1,
                last_status: Some(200),
            },
            DeliveryOutcome::RetryableFailure => DeliveryReport {
                outcome,
                attempts: 3,
                last_status: Some(500),
            },
            DeliveryOutcome::PermanentFailure => DeliveryReport {
                outcome,
                attempts: 1,
                last_status: Some(400),
            },
        }
    }
}

// ── MockDeliveryLog ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockDeliveryLog {
    pub attempts: Arc<Mutex<Vec<DeliveryAttempt>>>,
}

impl MockDeliveryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts_handle(&self) -> Arc<Mutex<Vec<DeliveryAttempt>>> {
        Arc::clone(&self.attempts)
    }
}

impl DeliveryLogRepository for MockDeliveryLog {
    async fn record(&self, attempt: &DeliveryAttempt) -> Result<(), OrdersServiceError> {
        self.attempts.lock().unwrap().push(attempt.clone());
        Ok(())
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

/// Canonical ingest payload: SO-10045, 2 × 150.00 = 300.00.
pub fn sample_input() -> IngestOrderInput {
    IngestOrderInput {
        order_id: "SO-10045".to_owned(),
        customer_name: "Jane Doe".to_owned(),
        customer_email: "jane@example.com".to_owned(),
        items: vec![IngestItem {
            sku: "ABC123".to_owned(),
            name: "Solar Panel".to_owned(),
            quantity: 2,
            unit_price: Decimal::new(15000, 2),
        }],
        shipping_address: "123 Main St".to_owned(),
        total: Decimal::new(30000, 2),
    }
}
