// crates/cb_foundation/src/lib.rs

//! Cinnabar Foundation Layer
//!
//! 基础层，提供整个项目共享的基础抽象。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型与校验辅助
//! - [`memory`]: 对齐大块存储（缓存行 / 设备友好对齐）
//!
//! # 设计原则
//!
//! 1. **最小依赖**: 仅依赖 thiserror、bytemuck、rayon
//! 2. **类型安全**: 校验失败返回错误而非 panic
//! 3. **零开销抽象**: release 模式下最小化运行时开销
//!
//! # 示例
//!
//! ```
//! use cb_foundation::{
//!     error::{CbError, CbResult},
//!     memory::{BulkVec, GpuAlign},
//! };
//!
//! // 对齐的大块零初始化存储
//! let cache: BulkVec<f64, GpuAlign> = BulkVec::zeros(1024);
//! assert_eq!(cache.len(), 1024);
//!
//! // 大小校验
//! assert!(CbError::check_size("cells", 10, 10).is_ok());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod memory;

// 重导出常用类型
pub use error::{CbError, CbResult};
pub use memory::{Alignment, BulkVec, CpuAlign, DefaultAlign, GpuAlign};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{CbError, CbResult};
    pub use crate::memory::{BulkVec, CpuAlign, GpuAlign};
    pub use crate::{ensure, require};
}
