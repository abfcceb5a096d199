// crates/cb_transport/src/gpu/mod.rs

//! 设备迁移模块
//!
//! 把宿主域集合迁移为加速器常驻镜像，供大规模并行输运内核
//! 只读访问。
//!
//! # 架构
//!
//! ```text
//! +------------------+
//! |   DeviceQueue    |  <- 分配 / 拷贝 / 同步 / 释放 四原语
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |    AllocSet      |  <- 作用域所有权与失败回滚
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |  DomainMirror    |  <- 远程切片组成的 POD 镜像记录
//! +------------------+
//! ```
//!
//! # 模块结构
//!
//! - `queue` - 设备执行队列抽象与宿主参考实现
//! - `wgpu_queue` - 基于 wgpu 的设备队列
//! - `buffer` - 远程切片与分配回滚集合
//! - `mirror` - 设备镜像 POD 记录
//! - `migrate` - 镜像构建器（子先于父的两阶段折平）
//!
//! # 使用示例
//!
//! ```
//! use cb_transport::gpu::{migrate_domains, HostQueue};
//!
//! let queue = HostQueue::new();
//! let mirrors = migrate_domains(&queue, &[], 6).unwrap();
//! assert_eq!(mirrors.domain_count(), 0);
//! mirrors.release(&queue).unwrap();
//! ```

pub mod buffer;
pub mod migrate;
pub mod mirror;
pub mod queue;
pub mod wgpu_queue;

// 核心类型重导出
pub use buffer::{AllocSet, DeviceSlice};
pub use migrate::{migrate_domains, DomainMirrors, MigrateError};
pub use mirror::{
    CellConnectivityMirror, CellGeometryMirror, CellStateMirror, DomainMirror, MeshDomainMirror,
};
pub use queue::{
    CopyDirection, DeviceError, DevicePtr, DeviceQueue, DeviceResult, HostQueue, TransferStats,
};
pub use wgpu_queue::WgpuQueue;
