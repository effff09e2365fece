use std::fmt::{self, Display};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{ChatError, PublishError};
use crate::publisher::Publisher;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A markdown message posted to a chat channel.
pub struct ChatMessage {
    pub channel: String,
    pub text: String,
}

#[async_trait]
/// A client able to post messages to a chat service.
pub trait ChatClient: Send + Sync + 'static {
    async fn post_message(&self, message: &ChatMessage) -> anyhow::Result<()>;
}

/// The values a notification message is rendered from.
pub struct RenderContext<'a> {
    pub name: &'a str,
    pub endpoints: &'a [String],
}

impl Display for RenderContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IPs for {} ", self.name)?;

        if self.endpoints.is_empty() {
            return f.write_str("were deleted");
        }

        write!(f, "changed:\n_{}_", self.endpoints.join("\t"))
    }
}

/// Renders the notification for a changed endpoint set.
///
/// Endpoints are written in the order given.
pub fn render_message(name: &str, endpoints: &[String]) -> String {
    RenderContext { name, endpoints }.to_string()
}

/// Posts a notification to a chat channel whenever the endpoints change.
pub struct ChatPublisher<C> {
    client: Arc<C>,
    channel: String,
    dns_label: String,
}

impl<C: ChatClient> ChatPublisher<C> {
    pub fn new(client: C, channel: impl Into<String>, dns_label: impl Into<String>) -> Self {
        Self::from_shared(Arc::new(client), channel, dns_label)
    }

    pub fn from_shared(
        client: Arc<C>,
        channel: impl Into<String>,
        dns_label: impl Into<String>,
    ) -> Self {
        Self {
            client,
            channel: channel.into(),
            dns_label: dns_label.into(),
        }
    }

    #[inline]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    #[inline]
    pub fn dns_label(&self) -> &str {
        &self.dns_label
    }

    /// Renders and posts the notification for the given endpoints.
    pub async fn notify(&self, endpoints: &[String]) -> Result<(), ChatError> {
        let message = ChatMessage {
            channel: self.channel.clone(),
            text: render_message(&self.dns_label, endpoints),
        };

        self.client
            .post_message(&message)
            .await
            .map_err(ChatError::Send)?;

        info!(
            channel = %self.channel,
            dns_label = %self.dns_label,
            num_endpoints = endpoints.len(),
            "Posted endpoint notification."
        );

        Ok(())
    }
}

#[async_trait]
impl<C: ChatClient> Publisher for ChatPublisher<C> {
    fn name(&self) -> &str {
        "chat"
    }

    async fn publish(
        &self,
        cancel: &CancellationToken,
        endpoints: &[String],
    ) -> Result<(), PublishError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PublishError::Cancelled),
            res = self.notify(endpoints) => res.map_err(PublishError::from),
        }
    }
}
