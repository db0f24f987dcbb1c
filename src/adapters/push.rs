use crate::config::PushSettings;
use crate::domain::model::{ExpiryAlert, NotificationTarget};
use crate::domain::ports::NotificationSink;
use crate::utils::error::{Result, TrackerError};
use async_trait::async_trait;
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushMessageBuilder,
};

fn dispatch_err(target: &NotificationTarget, err: impl std::fmt::Display) -> TrackerError {
    TrackerError::DispatchFailure {
        target: target.label(),
        message: err.to_string(),
    }
}

/// JSON payload the service worker turns into a notification.
pub fn payload(alert: &ExpiryAlert) -> Result<Vec<u8>> {
    let body = serde_json::json!({
        "title": alert.subject(),
        "body": alert.body(),
        "productName": alert.product_name,
        "expiryDate": alert.expiry_date,
    });
    Ok(serde_json::to_vec(&body)?)
}

/// Web Push (RFC 8030) sink signed with the VAPID private key.
pub struct WebPushSink {
    private_key: String,
    client: IsahcWebPushClient,
}

impl WebPushSink {
    pub fn new(settings: &PushSettings) -> Result<Self> {
        let client = IsahcWebPushClient::new().map_err(|e| TrackerError::ConfigError {
            message: format!("push client: {}", e),
        })?;
        Ok(Self {
            private_key: settings.private_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl NotificationSink for WebPushSink {
    fn accepts(&self, target: &NotificationTarget) -> bool {
        matches!(target, NotificationTarget::Push(_))
    }

    async fn deliver(&self, target: &NotificationTarget, alert: &ExpiryAlert) -> Result<()> {
        let NotificationTarget::Push(subscription) = target else {
            return Err(dispatch_err(target, "not a push target"));
        };

        let info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.keys.p256dh,
            &subscription.keys.auth,
        );
        let content = payload(alert)?;

        let message = {
            let signature = VapidSignatureBuilder::from_base64(&self.private_key, &info)
                .map_err(|e| dispatch_err(target, e))?
                .build()
                .map_err(|e| dispatch_err(target, e))?;

            let mut builder = WebPushMessageBuilder::new(&info);
            builder.set_payload(ContentEncoding::Aes128Gcm, &content);
            builder.set_vapid_signature(signature);
            builder.build().map_err(|e| dispatch_err(target, e))?
        };

        self.client
            .send(message)
            .await
            .map_err(|e| dispatch_err(target, e))?;

        tracing::info!("🔔 Sent push alert for {} to {}", alert.product_name, target.label());
        Ok(())
    }
}
