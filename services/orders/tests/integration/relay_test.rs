use std::time::Duration;

use tokio::sync::watch;

use orderbus_orders::consumer::{Disposition, RelayConsumer};
use orderbus_orders::domain::repository::EventSubscription;
use orderbus_orders::domain::types::DeliveryOutcome;
use orderbus_orders::usecase::ingest::IngestOrderUseCase;

use crate::helpers::{
    InMemoryChannel, MockDeliveryLog, MockDispatcher, MockOrderRepo, sample_input,
};

const CALLBACK_URL: &str = "http://downstream.example/hook";

fn consumer_over(
    channel: &InMemoryChannel,
    dispatcher: MockDispatcher,
    deliveries: MockDeliveryLog,
) -> RelayConsumer<crate::helpers::InMemorySubscription, MockDispatcher, MockDeliveryLog> {
    RelayConsumer {
        subscription: channel.subscription(),
        dispatcher,
        deliveries,
        callback_url: CALLBACK_URL.to_owned(),
    }
}

async fn publish_sample(channel: &InMemoryChannel) {
    let repo = MockOrderRepo::new();
    let uc = IngestOrderUseCase {
        orders: repo,
        publisher: channel.clone(),
    };
    uc.execute(sample_input()).await.unwrap();
}

#[tokio::test]
async fn should_deliver_and_ack_on_success() {
    let channel = InMemoryChannel::new();
    publish_sample(&channel).await;

    let dispatcher = MockDispatcher::delivering();
    let calls = dispatcher.calls_handle();
    let deliveries = MockDeliveryLog::new();
    let attempts = deliveries.attempts_handle();
    let consumer = consumer_over(&channel, dispatcher, deliveries);

    let batch = consumer.subscription.pull().await.unwrap();
    assert_eq!(batch.len(), 1);
    let disposition = consumer.process(&batch[0]).await;
    assert_eq!(disposition, Disposition::Ack);
    consumer.subscription.ack(&batch[0].handle).await.unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (payload, url) = &calls[0];
    assert_eq!(url, CALLBACK_URL);
    assert_eq!(payload.event, "order.created");
    assert_eq!(payload.order_id, "SO-10045");
    assert_eq!(payload.total, "300.00");

    let attempts = attempts.lock().unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].outcome, DeliveryOutcome::Delivered);
    assert_eq!(attempts[0].http_status, Some(200));

    assert_eq!(channel.unacked_count(), 0);
}

#[tokio::test]
async fn should_hold_message_on_retryable_failure_until_redelivery() {
    let channel = InMemoryChannel::new();
    publish_sample(&channel).await;

    let dispatcher = MockDispatcher::scripted([DeliveryOutcome::RetryableFailure]);
    let calls = dispatcher.calls_handle();
    let consumer = consumer_over(&channel, dispatcher, MockDeliveryLog::new());

    let batch = consumer.subscription.pull().await.unwrap();
    let disposition = consumer.process(&batch[0]).await;
    assert_eq!(
        disposition,
        Disposition::Hold,
        "a transient failure must not be acknowledged"
    );
    assert_eq!(channel.unacked_count(), 1);

    // The lease expires; the channel redelivers the same message.
    channel.expire_leases();
    let redelivered = consumer.subscription.pull().await.unwrap();
    assert_eq!(redelivered.len(), 1);
    assert_eq!(redelivered[0].handle, batch[0].handle);

    // Script exhausted: second attempt delivers, message leaves the channel.
    let disposition = consumer.process(&redelivered[0]).await;
    assert_eq!(disposition, Disposition::Ack);
    consumer
        .subscription
        .ack(&redelivered[0].handle)
        .await
        .unwrap();

    assert_eq!(calls.lock().unwrap().len(), 2, "second delivery attempt observed");
    assert_eq!(channel.unacked_count(), 0);
}

#[tokio::test]
async fn should_ack_exactly_once_on_permanent_failure() {
    let channel = InMemoryChannel::new();
    publish_sample(&channel).await;

    let dispatcher = MockDispatcher::scripted([DeliveryOutcome::PermanentFailure]);
    let calls = dispatcher.calls_handle();
    let deliveries = MockDeliveryLog::new();
    let attempts = deliveries.attempts_handle();
    let consumer = consumer_over(&channel, dispatcher, deliveries);

    let batch = consumer.subscription.pull().await.unwrap();
    let disposition = consumer.process(&batch[0]).await;
    assert_eq!(
        disposition,
        Disposition::Ack,
        "a rejected payload must be acknowledged to stop redelivery"
    );
    consumer.subscription.ack(&batch[0].handle).await.unwrap();

    // Even after a lease expiry nothing comes back.
    channel.expire_leases();
    assert!(consumer.subscription.pull().await.unwrap().is_empty());
    assert_eq!(calls.lock().unwrap().len(), 1, "no further delivery attempts");

    let attempts = attempts.lock().unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].outcome, DeliveryOutcome::PermanentFailure);
    assert_eq!(attempts[0].http_status, Some(400));
}

#[tokio::test]
async fn should_ack_poison_message_without_dispatching() {
    let channel = InMemoryChannel::new();
    channel.publish_raw(b"not an event at all".to_vec());

    let dispatcher = MockDispatcher::delivering();
    let calls = dispatcher.calls_handle();
    let deliveries = MockDeliveryLog::new();
    let attempts = deliveries.attempts_handle();
    let consumer = consumer_over(&channel, dispatcher, deliveries);

    let batch = consumer.subscription.pull().await.unwrap();
    let disposition = consumer.process(&batch[0]).await;

    assert_eq!(
        disposition,
        Disposition::Ack,
        "an unparseable message must not be redelivered forever"
    );
    assert!(calls.lock().unwrap().is_empty(), "poison is never dispatched");
    assert!(attempts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_relay_end_to_end_from_ingest_to_downstream() {
    // Ingest half: webhook payload → stored order + published event.
    let channel = InMemoryChannel::new();
    let repo = MockOrderRepo::new();
    let orders = repo.orders_handle();
    let uc = IngestOrderUseCase {
        orders: repo,
        publisher: channel.clone(),
    };
    let receipt = uc.execute(sample_input()).await.unwrap();
    assert_eq!(receipt.order_id, "SO-10045");

    {
        let orders = orders.lock().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].1.len(), 1);
    }
    let payloads = channel.published_payloads();
    assert_eq!(payloads.len(), 1);
    let event: serde_json::Value = serde_json::from_slice(&payloads[0]).unwrap();
    assert_eq!(event["event"], "order.created");
    assert_eq!(event["total"], "300.00");

    // Relay half: consumer pulls, dispatches downstream, acks.
    let dispatcher = MockDispatcher::delivering();
    let calls = dispatcher.calls_handle();
    let consumer = consumer_over(&channel, dispatcher, MockDeliveryLog::new());

    let batch = consumer.subscription.pull().await.unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(consumer.process(&batch[0]).await, Disposition::Ack);
    consumer.subscription.ack(&batch[0].handle).await.unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.order_id, "SO-10045");
    assert_eq!(calls[0].0.total, "300.00");
    assert_eq!(channel.unacked_count(), 0);
}

#[tokio::test]
async fn should_stop_pulling_after_shutdown_signal() {
    let channel = InMemoryChannel::new();
    let consumer = consumer_over(&channel, MockDispatcher::delivering(), MockDeliveryLog::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { consumer.run(shutdown_rx).await });

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("consumer must exit promptly after shutdown")
        .unwrap();
}
