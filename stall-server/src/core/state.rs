use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::bus::ChangeBus;
use crate::core::tasks::BackgroundTasks;
use crate::core::{Config, Result};
use crate::orders::{OrderStorage, OrdersManager, VerifyScheduler};
use crate::services::StaticMenu;
use crate::utils::{SharedClock, SystemClock};

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | orders | OrdersManager | 订单生命周期引擎 |
/// | menu | Arc<StaticMenu> | 菜单 (下单时读取价格) |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub orders: OrdersManager,
    pub menu: Arc<StaticMenu>,
    /// 关闭信号 (结束长连接的推送流)
    pub shutdown: CancellationToken,
    started_at: Instant,
}

impl ServerState {
    /// 创建服务器状态 (手动构造)
    ///
    /// 通常使用 [`ServerState::initialize`] 代替
    pub fn new(config: Config, orders: OrdersManager, menu: Arc<StaticMenu>) -> Self {
        Self {
            config,
            orders,
            menu,
            shutdown: CancellationToken::new(),
            started_at: Instant::now(),
        }
    }

    /// 初始化服务器状态
    ///
    /// 1. 创建工作目录
    /// 2. 加载菜单 (MENU_FILE)
    /// 3. 打开订单数据库，首次启动写入默认设置
    pub fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;

        let menu = match &config.menu_file {
            Some(path) => {
                let menu = StaticMenu::from_json_file(path)?;
                tracing::info!(path = %path, items = menu.len(), "Menu loaded");
                menu
            }
            None => {
                tracing::warn!("MENU_FILE not set, starting with an empty menu");
                StaticMenu::new()
            }
        };
        let menu = Arc::new(menu);

        let db_path = config.database_path();
        let storage = OrderStorage::open(&db_path)?;
        let settings = storage.ensure_settings(&config.default_settings())?;
        tracing::info!(
            path = %db_path.display(),
            shop_open = settings.is_shop_open,
            ban_system = settings.is_ban_system_active,
            "Order storage opened"
        );

        let clock: SharedClock = Arc::new(SystemClock);
        let orders = OrdersManager::with_storage(storage, menu.clone(), clock)
            .with_bus(ChangeBus::new(config.event_channel_capacity));

        Ok(Self::new(config.clone(), orders, menu))
    }

    pub fn orders_manager(&self) -> &OrdersManager {
        &self.orders
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// 启动后台任务
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        if self.config.verify_interval_secs > 0 {
            let scheduler = VerifyScheduler::new(
                self.orders.clone(),
                Duration::from_secs(self.config.verify_interval_secs),
                tasks.shutdown_token(),
            );
            tasks.spawn("verify_scheduler", scheduler.run());
        }

        tracing::info!(count = tasks.len(), "Background tasks started");
        tasks
    }
}
