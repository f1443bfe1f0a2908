//! 推送通知
//!
//! 通知是提交流程之外的协作者：处理器在事务提交后投递事件，
//! 后台任务异步发送，发送失败只记录日志。

pub mod dispatcher;
pub mod onesignal;

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::config::NotificationConfig;
use crate::errors::Result;

pub use dispatcher::{NotificationDispatcher, NotificationEvent, run_worker, run_worker_until};
pub use onesignal::OneSignalNotifier;

/// 推送目标
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationTarget {
    /// 按标签过滤，例如 role = student
    Tag {
        key: String,
        relation: String,
        value: String,
    },
    /// 按外部用户 ID 推送
    ExternalIds(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    pub heading: String,
    pub body: String,
    pub target: NotificationTarget,
    pub data: Option<Value>,
}

/// 推送服务返回的回执
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationReceipt {
    pub id: Option<String>,
    pub recipients: i64,
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &NotificationMessage) -> Result<NotificationReceipt>;
}

/// 未启用推送时使用，只记录日志
pub struct DisabledNotifier;

#[async_trait::async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, message: &NotificationMessage) -> Result<NotificationReceipt> {
        info!(
            "Notifications disabled, skipping \"{}\" ({:?})",
            message.heading, message.target
        );
        Ok(NotificationReceipt::default())
    }
}

/// 根据配置选择推送实现
pub fn build_notifier(config: &NotificationConfig) -> Result<Arc<dyn Notifier>> {
    if !config.enabled {
        return Ok(Arc::new(DisabledNotifier));
    }
    if config.app_id.trim().is_empty() || config.api_key.trim().is_empty() {
        warn!("Notifications enabled but app_id or api_key is missing, falling back to disabled");
        return Ok(Arc::new(DisabledNotifier));
    }
    Ok(Arc::new(OneSignalNotifier::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool, api_key: &str) -> NotificationConfig {
        NotificationConfig {
            enabled,
            provider_url: "http://127.0.0.1:9/notifications".to_string(),
            app_id: "app".to_string(),
            api_key: api_key.to_string(),
            timeout_ms: 100,
            queue_capacity: 4,
        }
    }

    #[tokio::test]
    async fn test_disabled_notifier_returns_empty_receipt() {
        let notifier = build_notifier(&config(false, "key")).unwrap();
        let receipt = notifier
            .send(&NotificationMessage {
                heading: "h".into(),
                body: "b".into(),
                target: NotificationTarget::ExternalIds(vec!["T1".into()]),
                data: None,
            })
            .await
            .unwrap();
        assert_eq!(receipt, NotificationReceipt::default());
    }

    #[test]
    fn test_missing_credentials_fall_back() {
        assert!(build_notifier(&config(true, "")).is_ok());
        assert!(build_notifier(&config(true, "key")).is_ok());
    }
}
