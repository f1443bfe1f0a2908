use std::time::Duration;

use tokio::signal;
use tracing::warn;

use super::startup::NotificationWorker;

pub async fn listen_for_shutdown() {
    // 等待 Ctrl+C 信号
    signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
    warn!("Shutdown signal received, initiating graceful shutdown...");
}

/// 通知后台任务关闭队列，并在超时内等待已入队事件发送完毕
pub async fn drain_notifications(worker: NotificationWorker, timeout: Duration) {
    let _ = worker.shutdown.send(());
    match tokio::time::timeout(timeout, worker.handle).await {
        Ok(Ok(())) => warn!("Notification queue drained"),
        Ok(Err(e)) => warn!("Notification worker aborted: {}", e),
        Err(_) => warn!(
            "Notification queue not drained within {} ms, pending events dropped",
            timeout.as_millis()
        ),
    }
}
