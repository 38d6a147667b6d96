//! Stall Order Server - 小吃摊订单生命周期服务
//!
//! # 架构概述
//!
//! - **订单引擎** (`orders`): 状态机、乐观并发 (版本号 CAS)、事件溯源存储 (redb)
//! - **防滥用** (`abuse`): 取消次数计数与自动封禁
//! - **变更总线** (`bus`): 已提交变更的广播
//! - **HTTP API** (`api`): 命令、查询、SSE 推送
//!
//! # 模块结构
//!
//! ```text
//! stall-server/src/
//! ├── core/          # 配置、状态、错误、后台任务
//! ├── orders/        # 订单事件溯源
//! ├── abuse/         # 封禁
//! ├── bus.rs         # 变更广播
//! ├── services/      # 菜单
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 时钟、错误、日志、校验
//! ```

pub mod abuse;
pub mod api;
pub mod bus;
pub mod core;
pub mod orders;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use abuse::AbuseGuard;
pub use bus::ChangeBus;
pub use core::{Config, Server, ServerState};
pub use orders::{OrderStorage, OrdersManager, SyncSession};
pub use services::{MenuLookup, StaticMenu};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境: 加载 .env，读取配置，准备工作目录，初始化日志
pub fn setup_environment() -> std::io::Result<Config> {
    // .env 不存在时忽略
    let _ = dotenv::dotenv();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)?;
    init_logger_with_file(
        Some(&config.log_level),
        Some(config.log_json),
        config.log_dir.as_deref(),
    );
    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
   _____ __        ____
  / ___// /_____ _/ / /
  \__ \/ __/ __ `/ / /
 ___/ / /_/ /_/ / / /
/____/\__/\__,_/_/_/
    "#
    );
}
