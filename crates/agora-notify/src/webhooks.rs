use std::time::Duration;

use tracing::{debug, warn};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Deliver a webhook payload. Best effort: failures are logged, never
/// retried, and never propagate to the caller.
pub async fn deliver(client: &reqwest::Client, url: &str, payload: &serde_json::Value) {
    let result = client
        .post(url)
        .timeout(WEBHOOK_TIMEOUT)
        .json(payload)
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => {
            debug!("Webhook delivered to {}", url);
        }
        Ok(response) => {
            warn!("Webhook to {} returned {}", url, response.status());
        }
        Err(e) => {
            warn!("Webhook to {} failed: {}", url, e);
        }
    }
}
