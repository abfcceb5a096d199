// crates/cb_transport/src/gpu/mirror.rs

//! 设备镜像记录
//!
//! 宿主域结构在加速器上的对应物：每个变长字段折平为
//! 「设备地址 + 元素数量」的远程切片，定形聚合折平为定长记录的
//! 连续设备数组。镜像不拥有任何宿主内存；内核按域、再按单元
//! 索引，用内嵌数量约束迭代，不传输额外的边界元数据。
//!
//! 全部记录为 `#[repr(C)]` + `Pod`，与宿主端一字节不差地往返。

use bytemuck::{Pod, Zeroable};
use cb_mesh::{FacetAdjacency, GeneralPlane, Node};

use super::buffer::DeviceSlice;

/// 单元连接记录的设备镜像
///
/// `num_points` / `num_facets` 由两个切片的内嵌长度恢复。
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CellConnectivityMirror {
    /// 点索引缓冲区
    pub point: DeviceSlice<u32>,
    /// 面邻接缓冲区
    pub facet: DeviceSlice<FacetAdjacency>,
}

impl CellConnectivityMirror {
    /// 点数量
    #[inline]
    pub fn num_points(&self) -> u32 {
        self.point.len()
    }

    /// 面数量
    #[inline]
    pub fn num_facets(&self) -> u32 {
        self.facet.len()
    }
}

/// 单元几何记录的设备镜像
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CellGeometryMirror {
    /// 面平面缓冲区
    pub facet: DeviceSlice<GeneralPlane>,
}

impl CellGeometryMirror {
    /// 面数量
    #[inline]
    pub fn num_facets(&self) -> u32 {
        self.facet.len()
    }
}

/// 单元状态的设备镜像
///
/// 定长字段按值拷贝；能群合计折平为独立设备缓冲区。
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CellStateMirror {
    /// 单元全局标识
    pub id: u64,
    /// 单元体积
    pub volume: f64,
    /// 原子数密度
    pub cell_number_density: f64,
    /// 源粒子计数
    pub source_tally: u64,
    /// 材料索引
    pub material: u32,
    /// 填充
    pub _pad: u32,
    /// 每能群合计缓冲区，长度 = 能群数
    pub total: DeviceSlice<f64>,
}

/// 域网格的设备镜像
///
/// `nbr_domain_gid` 仅宿主端使用，不迁移。
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshDomainMirror {
    /// 域全局编号
    pub domain_gid: u32,
    /// 填充
    pub _pad: u32,
    /// 邻居 rank 缓冲区
    pub nbr_rank: DeviceSlice<u32>,
    /// 节点坐标缓冲区
    pub node: DeviceSlice<Node>,
    /// 每单元连接镜像数组
    pub cell_connectivity: DeviceSlice<CellConnectivityMirror>,
    /// 每单元几何镜像数组
    pub cell_geometry: DeviceSlice<CellGeometryMirror>,
}

/// 域的设备镜像
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DomainMirror {
    /// 域序号（与宿主域保持一致）
    pub domain_index: u32,
    /// 域全局编号
    pub global_domain: u32,
    /// 每单元状态镜像数组
    pub cell_state: DeviceSlice<CellStateMirror>,
    /// 域网格镜像
    pub mesh: MeshDomainMirror,
}

impl DomainMirror {
    /// 单元数量
    #[inline]
    pub fn cell_count(&self) -> u32 {
        self.cell_state.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 镜像记录整块按字节拷贝，布局漂移即镜像损坏
    #[test]
    fn test_mirror_layouts() {
        assert_eq!(std::mem::size_of::<CellConnectivityMirror>(), 32);
        assert_eq!(std::mem::size_of::<CellGeometryMirror>(), 16);
        assert_eq!(std::mem::size_of::<CellStateMirror>(), 56);
        assert_eq!(std::mem::size_of::<MeshDomainMirror>(), 72);
        assert_eq!(std::mem::size_of::<DomainMirror>(), 96);
    }

    #[test]
    fn test_zeroed_mirror_is_null() {
        let mirror: DomainMirror = Zeroable::zeroed();
        assert_eq!(mirror.cell_count(), 0);
        assert!(mirror.cell_state.addr().is_null());
        assert!(mirror.mesh.node.addr().is_null());
    }
}
