use std::path::PathBuf;

use shared::models::{DEFAULT_BAN_DURATION_SECS, DEFAULT_CANCELLATION_THRESHOLD, SystemSettings};

use crate::bus::DEFAULT_CHANNEL_CAPACITY;

/// 服务器配置 - 摊位订单服务的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (无) | 日志文件目录，未设置时只输出到终端 |
/// | LOG_JSON | false | JSON 格式日志 |
/// | EVENT_CHANNEL_CAPACITY | 65536 | 变更广播缓冲区大小 |
/// | CANCELLATION_THRESHOLD | 3 | 触发封禁的取消次数 |
/// | BAN_DURATION_SECS | 3600 | 封禁时长(秒) |
/// | VENDOR_PHONE | (空) | 商家电话 |
/// | MENU_FILE | (无) | 菜单 JSON 文件 |
/// | VERIFY_INTERVAL_SECS | 300 | 订单快照校验周期(秒)，0 表示关闭 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/stall HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub log_json: bool,
    /// 变更广播缓冲区大小
    pub event_channel_capacity: usize,
    /// 首次启动时写入的设置默认值
    pub cancellation_threshold: u32,
    pub ban_duration_secs: u64,
    pub vendor_phone: String,
    /// 菜单 JSON 文件
    pub menu_file: Option<String>,
    /// 订单快照校验周期 (秒)，0 表示关闭
    pub verify_interval_secs: u64,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: env_parse("HTTP_PORT", 3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: env_opt("LOG_DIR"),
            log_json: env_parse("LOG_JSON", false),
            event_channel_capacity: env_parse("EVENT_CHANNEL_CAPACITY", DEFAULT_CHANNEL_CAPACITY),
            cancellation_threshold: env_parse(
                "CANCELLATION_THRESHOLD",
                DEFAULT_CANCELLATION_THRESHOLD,
            ),
            ban_duration_secs: env_parse("BAN_DURATION_SECS", DEFAULT_BAN_DURATION_SECS),
            vendor_phone: std::env::var("VENDOR_PHONE").unwrap_or_default(),
            menu_file: env_opt("MENU_FILE"),
            verify_interval_secs: env_parse("VERIFY_INTERVAL_SECS", 300),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 订单数据库路径
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("orders.redb")
    }

    /// 首次启动写入的系统设置
    pub fn default_settings(&self) -> SystemSettings {
        SystemSettings {
            vendor_phone_number: self.vendor_phone.clone(),
            cancellation_threshold: self.cancellation_threshold.max(1),
            ban_duration_secs: self.ban_duration_secs,
            ..SystemSettings::default()
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
