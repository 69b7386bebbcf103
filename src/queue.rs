use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::errors::{ForwarderError, Result};

const SEND_MESSAGE_TARGET: &str = "AmazonSQS.SendMessage";
const AMZ_JSON: &str = "application/x-amz-json-1.0";

/// Client for publishing alert messages to an SQS-compatible FIFO queue.
///
/// The forwarder hands each finished message body to this client together
/// with a group id and a deduplication id; retry and backoff policy belong
/// here (or further down the transport), never in the normalization core.
#[derive(Clone)]
pub struct QueueClient {
    client: ClientWithMiddleware,
    endpoint: Url,
    queue_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendMessageRequest<'a> {
    queue_url: &'a str,
    message_body: &'a str,
    message_group_id: &'a str,
    message_deduplication_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    #[serde(rename = "MessageId")]
    message_id: String,
    #[serde(rename = "MD5OfMessageBody", default)]
    body_md5: String,
}

/// Receipt returned by the queue for a published message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Queue-assigned message identifier.
    pub message_id: String,
    /// Checksum of the message body as computed by the queue.
    pub body_md5: String,
}

impl QueueClient {
    /// Create a new queue client.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Queue service endpoint the `SendMessage` calls go to
    /// * `queue_url` - Full URL of the destination queue
    /// * `timeout` - Request timeout duration
    /// * `proxy` - Optional outbound proxy as `host:port`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the proxy
    /// address is invalid.
    pub fn new(
        endpoint: Url,
        queue_url: impl Into<String>,
        timeout: Duration,
        proxy: Option<&str>,
    ) -> Result<Self> {
        let mut builder = Client::builder().timeout(timeout);
        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(format!("http://{proxy}"))
                .map_err(ForwarderError::InvalidProxy)?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build().map_err(ForwarderError::BuildHttpClient)?;
        let client = ClientBuilder::new(client).build();

        Ok(Self {
            client,
            endpoint,
            queue_url: queue_url.into(),
        })
    }

    /// Create a new client with a custom reqwest middleware client
    ///
    /// This allows you to add custom middleware (retry, logging, etc.)
    pub fn with_client(client: ClientWithMiddleware, endpoint: Url, queue_url: String) -> Self {
        Self {
            client,
            endpoint,
            queue_url,
        }
    }

    /// Publish one message to the queue.
    ///
    /// The deduplication id must be deterministic for identical alerts so
    /// that repeats within the queue's dedup window collapse to a single
    /// delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The HTTP request fails
    /// - The queue returns a non-success status code
    #[instrument(
        name = "QueueClient::publish",
        skip_all,
        fields(group_id = %group_id, dedup_id = %dedup_id)
    )]
    pub async fn publish(
        &self,
        body: &str,
        group_id: &str,
        dedup_id: &str,
    ) -> Result<PublishReceipt> {
        let request = SendMessageRequest {
            queue_url: &self.queue_url,
            message_body: body,
            message_group_id: group_id,
            message_deduplication_id: dedup_id,
        };

        debug!(endpoint = %self.endpoint, queue_url = %self.queue_url, "Publishing alert message");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("X-Amz-Target", SEND_MESSAGE_TARGET)
            .header("Content-Type", AMZ_JSON)
            .json(&request)
            .send()
            .await
            .map_err(ForwarderError::Request)?;

        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ForwarderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let response: SendMessageResponse = response
            .json()
            .await
            .map_err(|err| ForwarderError::Request(reqwest_middleware::Error::Reqwest(err)))?;

        debug!(message_id = %response.message_id, "Message published");
        Ok(PublishReceipt {
            message_id: response.message_id,
            body_md5: response.body_md5,
        })
    }

    /// Get the queue service endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}
