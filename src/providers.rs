use axum::async_trait;
use tracing::info;

/// Outbound message delivery (SMS or similar). OTP codes are handed to this
/// collaborator and never returned to the HTTP caller.
#[async_trait]
pub trait MessageProvider: Send + Sync {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

/// Logs the message instead of delivering it.
pub struct MockMessageProvider;

#[async_trait]
impl MessageProvider for MockMessageProvider {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()> {
        info!(provider = "mock", %to, %body, "message not actually sent");
        Ok(())
    }
}
