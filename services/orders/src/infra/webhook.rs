use std::time::Duration;

use reqwest::StatusCode;

use crate::domain::event::EgressPayload;
use crate::domain::repository::EgressDispatcher;
use crate::domain::types::{
    BACKOFF_BASE_MS, DeliveryOutcome, DeliveryReport, EGRESS_TIMEOUT_SECS, MAX_DELIVERY_ATTEMPTS,
};

/// HTTP egress dispatcher: POSTs the payload to the downstream callback with
/// a bounded per-request timeout and a small local retry budget. Anything
/// beyond that budget is the channel's problem (redelivery), which keeps the
/// message lease short and the retry loop bounded.
#[derive(Clone)]
pub struct HttpEgressDispatcher {
    client: reqwest::Client,
}

impl HttpEgressDispatcher {
    /// Panics if the TLS backend cannot initialize; that is a startup fault,
    /// not a runtime one.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(EGRESS_TIMEOUT_SECS))
            .build()
            .expect("failed to build egress http client");
        Self { client }
    }
}

impl Default for HttpEgressDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EgressDispatcher for HttpEgressDispatcher {
    async fn deliver(&self, payload: &EgressPayload, url: &str) -> DeliveryReport {
        let mut last_status = None;
        for attempt in 1..=MAX_DELIVERY_ATTEMPTS {
            match self.client.post(url).json(payload).send().await {
                Ok(response) => {
                    let status = response.status();
                    last_status = Some(status.as_u16());
                    match classify(status) {
                        Class::Success => {
                            return DeliveryReport {
                                outcome: DeliveryOutcome::Delivered,
                                attempts: attempt,
                                last_status,
                            };
                        }
                        Class::Permanent => {
                            return DeliveryReport {
                                outcome: DeliveryOutcome::PermanentFailure,
                                attempts: attempt,
                                last_status,
                            };
                        }
                        Class::Retryable => {
                            tracing::debug!(
                                status = status.as_u16(),
                                attempt,
                                "retryable downstream status"
                            );
                        }
                    }
                }
                Err(e) => {
                    // Connect errors and timeouts: transient by definition.
                    tracing::debug!(error = %e, attempt, "egress request failed");
                }
            }
            if attempt < MAX_DELIVERY_ATTEMPTS {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }
        }
        DeliveryReport {
            outcome: DeliveryOutcome::RetryableFailure,
            attempts: MAX_DELIVERY_ATTEMPTS,
            last_status,
        }
    }
}

enum Class {
    Success,
    Retryable,
    Permanent,
}

/// 2xx delivered; 5xx and 429 retryable; every other status (including
/// redirects) is a rejection that retrying will not fix.
fn classify(status: StatusCode) -> Class {
    if status.is_success() {
        Class::Success
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Class::Retryable
    } else {
        Class::Permanent
    }
}

/// Doubling backoff: 200ms, 400ms, ... for attempts 1, 2, ...
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(BACKOFF_BASE_MS << (attempt - 1))
}
