//! 通知事件队列
//!
//! `emit` 从不阻塞也从不失败：队列满或已关闭时直接丢弃事件并告警。
//! 单个后台任务消费事件，查询测评信息后调用推送服务。

use std::future::Future;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tracing::{debug, info, warn};

use super::{NotificationMessage, NotificationTarget, Notifier};
use crate::errors::Result;
use crate::storage::Storage;

/// 已提交的业务事件
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    /// 学生完成一次评价，通知测评所属教师
    EvaluationSubmitted {
        assessment_id: i64,
        student_id: String,
    },
    /// 新测评发布，通知全部学生
    AssessmentCreated { title: String },
}

#[derive(Clone, Default)]
pub struct NotificationDispatcher {
    sender: Option<Sender<NotificationEvent>>,
}

impl NotificationDispatcher {
    /// 创建有界队列，返回投递端和消费端
    pub fn channel(capacity: usize) -> (Self, Receiver<NotificationEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// 丢弃所有事件的投递端
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn emit(&self, event: NotificationEvent) {
        let Some(sender) = &self.sender else {
            debug!("Notification dispatcher disabled, dropping {:?}", event);
            return;
        };

        match sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("Notification queue full, dropping {:?}", event);
            }
            Err(TrySendError::Closed(event)) => {
                warn!("Notification queue closed, dropping {:?}", event);
            }
        }
    }
}

/// 根据事件构建推送消息，测评已不存在时返回 None
pub async fn build_message(
    storage: &dyn Storage,
    event: &NotificationEvent,
) -> Result<Option<NotificationMessage>> {
    match event {
        NotificationEvent::EvaluationSubmitted {
            assessment_id,
            student_id,
        } => {
            let Some(assessment) = storage.get_assessment_by_id(*assessment_id).await? else {
                return Ok(None);
            };
            let teacher_id = assessment.created_by.trim();
            if teacher_id.is_empty() {
                return Ok(None);
            }

            Ok(Some(NotificationMessage {
                heading: "New Evaluation Submitted".to_string(),
                body: format!(
                    "{student_id} submitted evaluation for: {}",
                    assessment.title
                ),
                target: NotificationTarget::ExternalIds(vec![teacher_id.to_string()]),
                data: Some(json!({ "type": "evaluation_submitted", "student": student_id })),
            }))
        }
        NotificationEvent::AssessmentCreated { title } => Ok(Some(NotificationMessage {
            heading: "New Assessment Available!".to_string(),
            body: format!("Assessment: {title}"),
            target: NotificationTarget::Tag {
                key: "role".to_string(),
                relation: "=".to_string(),
                value: "student".to_string(),
            },
            data: Some(json!({ "type": "new_assessment", "title": title })),
        })),
    }
}

async fn deliver(storage: &dyn Storage, notifier: &dyn Notifier, event: NotificationEvent) {
    let message = match build_message(storage, &event).await {
        Ok(Some(message)) => message,
        Ok(None) => {
            debug!("No recipients for {:?}, skipped", event);
            return;
        }
        Err(e) => {
            warn!("Failed to prepare notification for {:?}: {}", event, e);
            return;
        }
    };

    match notifier.send(&message).await {
        Ok(receipt) => info!(
            "Notification \"{}\" sent (id={:?}, recipients={})",
            message.heading, receipt.id, receipt.recipients
        ),
        Err(e) => warn!("Notification \"{}\" failed: {}", message.heading, e),
    }
}

/// 后台消费循环，所有投递端释放后退出
pub async fn run_worker(
    receiver: Receiver<NotificationEvent>,
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
) {
    run_worker_until(receiver, storage, notifier, std::future::pending()).await;
}

/// 后台消费循环，`shutdown` 完成后关闭队列，投递完已入队事件后退出
///
/// 投递端可能仍被 HTTP worker 持有，关闭时不能依赖它们全部释放。
pub async fn run_worker_until<F>(
    mut receiver: Receiver<NotificationEvent>,
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    info!("Notification worker started");

    tokio::pin!(shutdown);
    let mut closing = false;

    loop {
        let event = if closing {
            receiver.recv().await
        } else {
            tokio::select! {
                event = receiver.recv() => event,
                _ = &mut shutdown => {
                    debug!("Notification worker closing, draining queued events");
                    receiver.close();
                    closing = true;
                    continue;
                }
            }
        };

        let Some(event) = event else {
            break;
        };
        deliver(storage.as_ref(), notifier.as_ref(), event).await;
    }

    info!("Notification worker stopped");
}
