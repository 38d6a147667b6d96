//! 订单快照校验调度器
//!
//! 周期性地把队列中订单的快照与事件重放结果比对，不一致时记录告警。
//! 校验只读，不修正数据。

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::manager::{ManagerResult, OrdersManager};

/// One verification pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub checked: usize,
    /// Orders whose stored snapshot differs from the replay
    pub mismatched: Vec<String>,
}

impl VerifyReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatched.is_empty()
    }
}

/// Compare every open order against a replay of its events
pub fn verify_active_orders(manager: &OrdersManager) -> ManagerResult<VerifyReport> {
    let mut report = VerifyReport::default();
    for order in manager.get_active_orders()? {
        report.checked += 1;
        if !manager.verify_order(&order.order_id)? {
            report.mismatched.push(order.order_id);
        }
    }
    Ok(report)
}

/// 快照校验调度器
///
/// 在 `ServerState::start_background_tasks()` 中注册启动。
pub struct VerifyScheduler {
    manager: OrdersManager,
    interval: Duration,
    shutdown: CancellationToken,
}

impl VerifyScheduler {
    pub fn new(manager: OrdersManager, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            manager,
            interval,
            shutdown,
        }
    }

    /// 主循环：按周期触发，收到 shutdown 信号退出
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Verify scheduler started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // 第一次 tick 立即返回，跳过
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => self.run_once().await,
            }
        }

        tracing::info!("Verify scheduler stopped");
    }

    async fn run_once(&self) {
        let manager = self.manager.clone();
        let result = tokio::task::spawn_blocking(move || verify_active_orders(&manager)).await;

        match result {
            Ok(Ok(report)) if report.is_consistent() => {
                tracing::debug!(checked = report.checked, "Order snapshots verified");
            }
            Ok(Ok(report)) => {
                tracing::warn!(
                    checked = report.checked,
                    mismatched = ?report.mismatched,
                    "Order snapshots differ from event replay"
                );
            }
            Ok(Err(e)) => tracing::error!(error = %e, "Order verification failed"),
            Err(e) => tracing::error!(error = %e, "Order verification task failed"),
        }
    }
}
