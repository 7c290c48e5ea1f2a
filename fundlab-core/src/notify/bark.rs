//! Bark push notifications: `GET {base}/{title}/{body}`.

use std::time::Duration;

use reqwest::Url;
use tracing::{info, warn};

use super::{Notification, NotificationSink, NotifyError};

pub struct BarkSink {
    client: reqwest::blocking::Client,
    base: Url,
}

impl BarkSink {
    pub fn new(base_url: &str) -> Result<Self, NotifyError> {
        let base =
            Url::parse(base_url).map_err(|_| NotifyError::InvalidEndpoint(base_url.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(NotifyError::InvalidEndpoint(base_url.to_string()));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| NotifyError::Network(e.to_string()))?;
        Ok(Self { client, base })
    }

    /// Title and body become percent-encoded path segments.
    pub fn request_url(&self, notification: &Notification) -> Result<Url, NotifyError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| NotifyError::InvalidEndpoint(self.base.to_string()))?
            .pop_if_empty()
            .push(&notification.title)
            .push(&notification.body);
        Ok(url)
    }
}

impl NotificationSink for BarkSink {
    fn name(&self) -> &str {
        "bark"
    }

    fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let url = self.request_url(notification)?;
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| NotifyError::Network(e.to_string()))?;
        let status = resp.status();
        if status == reqwest::StatusCode::OK {
            info!(title = %notification.title, "notification sent");
            Ok(())
        } else {
            warn!(title = %notification.title, %status, "notification rejected");
            Err(NotifyError::Rejected(status.as_u16()))
        }
    }
}
