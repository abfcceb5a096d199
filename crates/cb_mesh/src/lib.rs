// crates/cb_mesh/src/lib.rs

//! Cinnabar 宿主端网格域
//!
//! 管理一个空间子域的网格几何与拓扑数据：节点坐标、单元连接关系、
//! 面几何平面与邻居域信息。
//!
//! # 模块结构
//!
//! - [`types`] - 跨越设备边界的 POD 值类型（节点、面邻接、平面）
//! - [`records`] - 变长单元记录（每单元独立拥有的点表 / 面表）
//! - [`partition`] - 网格剖分协作方的输出接口
//! - [`domain`] - 域网格描述符及其一次性构建
//!
//! # 数据流
//!
//! ```text
//! MeshPartition + GlobalGrid + Decomposition
//!          |
//!          v  (一次性冻结)
//!     MeshDomain   <- 构建后只读
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod partition;
pub mod records;
pub mod types;

// 核心类型重导出
pub use domain::MeshDomain;
pub use partition::{Decomposition, GlobalGrid, MeshPartition, PartitionCell};
pub use records::{CellConnectivity, CellGeometry, RecordBuf};
pub use types::{FacetAdjacency, FacetEvent, GeneralPlane, Node, INVALID_INDEX};
