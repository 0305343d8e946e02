//! Order notifications.
//!
//! Notifications run after the order transaction has committed. A failed
//! send is logged by the caller and never touches order state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use stockroom_core::{Money, OrderId};

use crate::config::EmailConfig;
use crate::models::OrderItem;

/// Errors that can occur when sending a notification.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// What a customer is told about a cancelled order.
#[derive(Debug, Clone)]
pub struct CancellationNotice {
    pub order_id: OrderId,
    pub email: String,
    pub total: Money,
    pub cancelled_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// Outbound customer notifications about orders.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    /// Tell the customer their order was cancelled.
    async fn send_order_cancellation_email(
        &self,
        notice: &CancellationNotice,
    ) -> Result<(), NotificationError>;
}

/// Sends notifications over SMTP.
#[derive(Clone)]
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    base_url: String,
}

impl EmailNotifier {
    /// Create a notifier from SMTP configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, base_url: &str) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl OrderNotifier for EmailNotifier {
    async fn send_order_cancellation_email(
        &self,
        notice: &CancellationNotice,
    ) -> Result<(), NotificationError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotificationError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(notice
                .email
                .parse()
                .map_err(|_| NotificationError::InvalidAddress(notice.email.clone()))?)
            .subject(format!("Order #{} has been cancelled", notice.order_id))
            .header(ContentType::TEXT_PLAIN)
            .body(cancellation_text(notice, &self.base_url))?;

        self.mailer.send(email).await?;
        Ok(())
    }
}

/// Notifier that only writes a log line. Used when SMTP is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl OrderNotifier for LogNotifier {
    async fn send_order_cancellation_email(
        &self,
        notice: &CancellationNotice,
    ) -> Result<(), NotificationError> {
        tracing::info!(
            order_id = %notice.order_id,
            items = notice.items.len(),
            "order cancellation notice (email not configured)"
        );
        Ok(())
    }
}

fn cancellation_text(notice: &CancellationNotice, base_url: &str) -> String {
    let units: i32 = notice.items.iter().map(|item| item.quantity).sum();
    format!(
        "Your order #{id} was cancelled on {date}.\n\n\
         {units} item(s) totalling {total} will not be shipped.\n\n\
         View your orders: {base_url}/account/orders/{id}\n",
        id = notice.order_id,
        date = notice.cancelled_at.format("%Y-%m-%d %H:%M UTC"),
        total = notice.total,
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use stockroom_core::{OrderItemId, ProductId};

    use super::*;

    fn notice() -> CancellationNotice {
        let item = |id, quantity| OrderItem {
            id: OrderItemId::new(id),
            order_id: OrderId::new(12),
            product_id: ProductId::new(id),
            variant_id: None,
            quantity,
            unit_price: Money::from_units(100),
        };
        CancellationNotice {
            order_id: OrderId::new(12),
            email: "shopper@example.com".to_string(),
            total: Money::from_units(500),
            cancelled_at: Utc
                .with_ymd_and_hms(2026, 3, 4, 10, 30, 0)
                .single()
                .unwrap_or_default(),
            items: vec![item(1, 2), item(2, 3)],
        }
    }

    #[test]
    fn test_cancellation_text() {
        let text = cancellation_text(&notice(), "https://shop.test");
        assert!(text.contains("order #12 was cancelled on 2026-03-04 10:30 UTC"));
        assert!(text.contains("5 item(s) totalling 500.00"));
        assert!(text.contains("https://shop.test/account/orders/12"));
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        assert!(LogNotifier.send_order_cancellation_email(&notice()).await.is_ok());
    }
}
