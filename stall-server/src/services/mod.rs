//! 服务层 - 订单引擎的外部协作者
//!
//! # 服务列表
//!
//! - [`MenuLookup`] - 下单时读取菜单 (名称、价格、是否可售)
//! - [`StaticMenu`] - 内存菜单实现 (DashMap)

pub mod menu;

pub use menu::{MenuError, MenuLookup, StaticMenu};
