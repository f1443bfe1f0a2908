//! OneSignal REST 推送实现

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{NotificationMessage, NotificationReceipt, NotificationTarget, Notifier};
use crate::config::NotificationConfig;
use crate::errors::{EvalBookError, Result};

pub struct OneSignalNotifier {
    client: Client,
    endpoint: String,
    app_id: String,
    api_key: String,
}

/// OneSignal 响应
#[derive(Debug, Deserialize)]
struct OneSignalResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    recipients: i64,
    #[serde(default)]
    errors: Option<Value>,
}

impl OneSignalNotifier {
    pub fn new(config: &NotificationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.provider_url.clone(),
            app_id: config.app_id.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// 构建请求体
    fn payload(&self, message: &NotificationMessage) -> Result<Value> {
        let mut payload = json!({
            "app_id": self.app_id,
            "headings": { "en": message.heading },
            "contents": { "en": message.body },
        });

        match &message.target {
            NotificationTarget::Tag {
                key,
                relation,
                value,
            } => {
                payload["filters"] = json!([
                    { "field": "tag", "key": key, "relation": relation, "value": value }
                ]);
            }
            NotificationTarget::ExternalIds(ids) => {
                let ids: Vec<&str> = ids
                    .iter()
                    .map(|id| id.trim())
                    .filter(|id| !id.is_empty())
                    .collect();
                if ids.is_empty() {
                    return Err(EvalBookError::notification("No recipients for notification"));
                }
                payload["include_external_user_ids"] = json!(ids);
            }
        }

        if let Some(data) = &message.data {
            payload["data"] = data.clone();
        }

        Ok(payload)
    }
}

#[async_trait::async_trait]
impl Notifier for OneSignalNotifier {
    async fn send(&self, message: &NotificationMessage) -> Result<NotificationReceipt> {
        let payload = self.payload(message)?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .header(AUTHORIZATION, format!("Basic {}", self.api_key))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body: OneSignalResponse = response.json().await?;

        if !status.is_success() {
            return Err(EvalBookError::notification(format!(
                "OneSignal returned {status}: {}",
                body.errors.unwrap_or(Value::Null)
            )));
        }

        if let Some(errors) = &body.errors {
            warn!("OneSignal accepted \"{}\" with errors: {}", message.heading, errors);
        }
        info!(
            "OneSignal delivered \"{}\" to {} recipients",
            message.heading, body.recipients
        );

        Ok(NotificationReceipt {
            id: body.id,
            recipients: body.recipients,
        })
    }
}
