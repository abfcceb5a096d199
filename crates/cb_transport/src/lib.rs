// crates/cb_transport/src/lib.rs

//! Cinnabar 输运域
//!
//! 在域网格之上叠加单元模拟状态与截面缓存，并提供把完整域
//! 迁移为设备常驻镜像的构建器。
//!
//! # 模块结构
//!
//! - [`state`] - 单元状态与材料库接口
//! - [`domain`] - 域描述符（网格 + 状态 + 截面缓存）
//! - [`gpu`] - 设备队列抽象、远程切片、镜像记录与迁移构建器
//!
//! # 数据流
//!
//! ```text
//! MeshDomain (宿主)
//!      |
//!      v  (+ 单元状态 / 截面缓存)
//!   Domain (宿主)
//!      |
//!      v  migrate_domains
//! DomainMirrors (设备常驻) -> 输运内核只读访问
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod gpu;
pub mod state;

// 核心类型重导出
pub use domain::Domain;
pub use state::{CellState, Material, MaterialDatabase};
