use crate::config::AppConfig;
use crate::services::evaluations::SessionPolicy;
use crate::services::notifications::{
    DisabledNotifier, NotificationDispatcher, Notifier, build_notifier, run_worker_until,
};
use crate::storage::Storage;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct StartupContext {
    pub storage: Arc<dyn Storage>,
    pub dispatcher: NotificationDispatcher,
    pub session_policy: SessionPolicy,
    pub notification_worker: NotificationWorker,
}

/// 通知后台任务句柄
pub struct NotificationWorker {
    pub handle: JoinHandle<()>,
    /// 发送（或丢弃）后任务关闭队列并排空
    pub shutdown: oneshot::Sender<()>,
}

/// 启动通知后台任务，返回投递端
fn start_notification_worker(
    storage: Arc<dyn Storage>,
) -> (NotificationDispatcher, NotificationWorker) {
    let config = AppConfig::get();

    let notifier: Arc<dyn Notifier> = match build_notifier(&config.notification) {
        Ok(notifier) => notifier,
        Err(e) => {
            warn!("Failed to create notifier: {}, notifications disabled", e);
            Arc::new(DisabledNotifier)
        }
    };

    let (dispatcher, receiver) =
        NotificationDispatcher::channel(config.notification.queue_capacity);
    let (shutdown, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(run_worker_until(receiver, storage, notifier, async move {
        let _ = stopped.await;
    }));

    debug!(
        "Notification queue started (enabled: {}, capacity: {})",
        config.notification.enabled, config.notification.queue_capacity
    );

    (dispatcher, NotificationWorker { handle, shutdown })
}

/// 准备服务器启动的上下文
/// 包括存储、通知队列和提交策略
pub async fn prepare_server_startup() -> StartupContext {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = AppConfig::get();

    let storage = crate::storage::create_storage()
        .await
        .expect("Failed to create storage backend");
    warn!("Storage backend initialized and migrations completed");

    let (dispatcher, notification_worker) = start_notification_worker(storage.clone());
    warn!("Notification dispatcher initialized");

    let session_policy = SessionPolicy::from(&config.evaluation);
    if !session_policy.require_session_timestamp {
        warn!("Submissions without session_timestamp fall back to server time and cannot be deduplicated");
    }

    StartupContext {
        storage,
        dispatcher,
        session_policy,
        notification_worker,
    }
}
