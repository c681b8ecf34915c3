//! Outbound notification collaborators.
//!
//! Everything here is best-effort: callers dispatch after their primary
//! write commits, failures are logged and never surface as the request's
//! error.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::aggregates::{Order, Product};
use crate::domain::events::DomainEvent;

/// Outbound email seam. Address resolution for bare user ids is the
/// collaborator's problem; identity lives outside this service.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_order_confirmation(
        &self,
        to: &str,
        order: &Order,
        invoice: Option<&std::path::Path>,
    ) -> anyhow::Result<()>;

    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()>;

    async fn send_price_drop(
        &self,
        user_id: Uuid,
        product: &Product,
        rate: Decimal,
    ) -> anyhow::Result<()>;
}

/// Default mailer: logs what would have been sent. Stands in until a real
/// delivery provider is wired up.
#[derive(Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_order_confirmation(
        &self,
        to: &str,
        order: &Order,
        invoice: Option<&std::path::Path>,
    ) -> anyhow::Result<()> {
        tracing::info!(
            to,
            order_id = %order.id,
            invoice = ?invoice,
            "order confirmation email"
        );
        Ok(())
    }

    async fn send_email(&self, to: &str, subject: &str, _html_body: &str) -> anyhow::Result<()> {
        tracing::info!(to, subject, "email");
        Ok(())
    }

    async fn send_price_drop(
        &self,
        user_id: Uuid,
        product: &Product,
        rate: Decimal,
    ) -> anyhow::Result<()> {
        tracing::info!(%user_id, product = %product.name, %rate, "price drop email");
        Ok(())
    }
}

/// Publishes domain events to NATS when configured, otherwise logs them.
/// Publishing is fire-and-forget on a spawned task.
#[derive(Clone, Default)]
pub struct EventBus {
    nats: Option<async_nats::Client>,
}

impl EventBus {
    pub fn new(nats: Option<async_nats::Client>) -> Self {
        Self { nats }
    }

    pub fn disabled() -> Self {
        Self { nats: None }
    }

    pub fn publish(&self, event: DomainEvent) {
        let nats = self.nats.clone();
        tokio::spawn(async move {
            let subject = event.subject().to_string();
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(error = %e, subject, "failed to serialize event");
                    return;
                }
            };
            match nats {
                Some(client) => {
                    if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                        tracing::warn!(error = %e, subject, "failed to publish event");
                    }
                }
                None => tracing::debug!(subject, "event bus disabled, dropping event"),
            }
        });
    }
}
