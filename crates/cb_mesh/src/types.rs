// crates/cb_mesh/src/types.rs

//! 跨越设备边界的 POD 值类型
//!
//! 这里的类型会以原始字节形式拷贝到加速器内存，因此全部为
//! `#[repr(C)]` + `bytemuck::Pod`，填充字段显式声明。

use bytemuck::{Pod, Zeroable};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// 无效索引哨兵（无邻居 / 越过网格边界）
pub const INVALID_INDEX: u32 = u32::MAX;

/// 三维节点坐标
///
/// 网格构建完成后不可变；连接记录按索引引用。
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct Node {
    /// X 坐标
    pub x: f64,
    /// Y 坐标
    pub y: f64,
    /// Z 坐标
    pub z: f64,
}

impl Node {
    /// 创建节点
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 转换为 glam 向量
    #[inline]
    pub fn to_dvec3(self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }
}

impl From<DVec3> for Node {
    fn from(v: DVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Node> for DVec3 {
    fn from(n: Node) -> Self {
        n.to_dvec3()
    }
}

/// 面事件类别（粒子穿越该面时的处理方式）
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacetEvent {
    /// 未定义
    Undefined = 0,
    /// 进程内转移（邻单元在同一 rank）
    TransitOnRank = 1,
    /// 跨进程转移（邻单元在其他 rank）
    TransitOffRank = 2,
    /// 边界逃逸
    BoundaryEscape = 3,
    /// 边界反射
    BoundaryReflection = 4,
}

impl FacetEvent {
    /// 数值编码（设备端存储形式）
    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// 从数值编码还原，未知编码返回 `None`
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Undefined),
            1 => Some(Self::TransitOnRank),
            2 => Some(Self::TransitOffRank),
            3 => Some(Self::BoundaryEscape),
            4 => Some(Self::BoundaryReflection),
            _ => None,
        }
    }
}

/// 面邻接记录
///
/// 标识一个面的邻居拓扑：邻单元 / 邻域 / 邻 rank 与事件标签，
/// 以及该面的三个角点索引。无邻居的字段取 [`INVALID_INDEX`]。
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct FacetAdjacency {
    /// 事件编码（见 [`FacetEvent`]）
    pub event: u32,
    /// 邻单元局部索引
    pub adjacent_cell: u32,
    /// 邻域全局编号
    pub adjacent_domain: u32,
    /// 邻域所属 rank
    pub adjacent_rank: u32,
    /// 三个角点的局部节点索引
    pub point: [u32; 3],
    /// 填充
    pub _pad: u32,
}

impl FacetAdjacency {
    /// 创建内部面邻接（进程内转移）
    pub fn interior(adjacent_cell: u32, adjacent_domain: u32, adjacent_rank: u32, point: [u32; 3]) -> Self {
        Self {
            event: FacetEvent::TransitOnRank.code(),
            adjacent_cell,
            adjacent_domain,
            adjacent_rank,
            point,
            _pad: 0,
        }
    }

    /// 创建边界面邻接（事件待边界条件敲定）
    pub fn boundary(point: [u32; 3]) -> Self {
        Self {
            event: FacetEvent::Undefined.code(),
            adjacent_cell: INVALID_INDEX,
            adjacent_domain: INVALID_INDEX,
            adjacent_rank: INVALID_INDEX,
            point,
            _pad: 0,
        }
    }

    /// 事件标签
    #[inline]
    pub fn event(&self) -> Option<FacetEvent> {
        FacetEvent::from_code(self.event)
    }

    /// 是否为网格外边界面（无邻域）
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.adjacent_domain == INVALID_INDEX
    }
}

impl Default for FacetAdjacency {
    fn default() -> Self {
        Self::boundary([INVALID_INDEX; 3])
    }
}

/// 面几何平面（平面方程 ax + by + cz + d = 0）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct GeneralPlane {
    /// 法向 X 分量
    pub a: f64,
    /// 法向 Y 分量
    pub b: f64,
    /// 法向 Z 分量
    pub c: f64,
    /// 原点偏移
    pub d: f64,
}

impl GeneralPlane {
    /// 由三个角点构建平面，法向归一化
    ///
    /// 三点共线时退化为零平面。
    pub fn from_points(r0: DVec3, r1: DVec3, r2: DVec3) -> Self {
        let n = (r1 - r0).cross(r2 - r0);
        let mag = n.length();
        let n = if mag > 0.0 { n / mag } else { n };
        Self {
            a: n.x,
            b: n.y,
            c: n.z,
            d: -n.dot(r0),
        }
    }

    /// 点到平面的有向距离（法向已归一化时）
    #[inline]
    pub fn signed_distance(&self, p: DVec3) -> f64 {
        self.a * p.x + self.b * p.y + self.c * p.z + self.d
    }
}
