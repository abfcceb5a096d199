// crates/cb_mesh/src/partition.rs

//! 网格剖分协作方的输出接口
//!
//! 域网格由外部剖分模块构建；本模块只定义其输出的数据载体，
//! 具体几何算法不在此处。`MeshDomain` 的一次性构建消费这些载体。

use cb_foundation::error::{CbError, CbResult};
use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::types::{FacetAdjacency, GeneralPlane};

/// 全局网格：剖分前的节点坐标表
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalGrid {
    /// 全局节点坐标
    pub node: Vec<DVec3>,
}

impl GlobalGrid {
    /// 创建全局网格
    pub fn new(node: Vec<DVec3>) -> Self {
        Self { node }
    }

    /// 按全局编号取节点坐标
    pub fn node(&self, gid: u32) -> CbResult<DVec3> {
        CbError::check_index("GlobalNode", gid as usize, self.node.len())?;
        Ok(self.node[gid as usize])
    }

    /// 全局节点数量
    pub fn num_nodes(&self) -> usize {
        self.node.len()
    }
}

/// 域分解：域编号到所属 rank 的映射
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Decomposition {
    /// 按域全局编号索引的 rank 表
    pub rank: Vec<u32>,
}

impl Decomposition {
    /// 创建域分解
    pub fn new(rank: Vec<u32>) -> Self {
        Self { rank }
    }

    /// 查询域所属 rank
    pub fn rank_of(&self, domain_gid: u32) -> CbResult<u32> {
        CbError::check_index("Domain", domain_gid as usize, self.rank.len())?;
        Ok(self.rank[domain_gid as usize])
    }

    /// 域数量
    pub fn num_domains(&self) -> usize {
        self.rank.len()
    }
}

/// 剖分输出的单个单元
///
/// 点索引为域内局部节点编号；面邻接的 `adjacent_rank` 与边界事件
/// 留待 `MeshDomain` 构建时解析。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartitionCell {
    /// 单元点索引（局部节点编号）
    pub point: Vec<u32>,
    /// 面邻接记录
    pub facet: Vec<FacetAdjacency>,
    /// 面几何平面，与 `facet` 形状平行
    pub plane: Vec<GeneralPlane>,
}

/// 剖分输出：一个域的全部网格数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshPartition {
    /// 本域全局编号
    pub domain_gid: u32,
    /// 邻居域全局编号
    pub nbr_domain_gid: Vec<u32>,
    /// 本域引用的全局节点编号（局部编号 -> 全局编号）
    pub node_gid: Vec<u32>,
    /// 单元列表
    pub cell: Vec<PartitionCell>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_grid_lookup() {
        let grid = GlobalGrid::new(vec![DVec3::ZERO, DVec3::ONE]);
        assert_eq!(grid.num_nodes(), 2);
        assert_eq!(grid.node(1).unwrap(), DVec3::ONE);
        assert!(grid.node(2).is_err());
    }

    #[test]
    fn test_decomposition_lookup() {
        let ddc = Decomposition::new(vec![0, 0, 1]);
        assert_eq!(ddc.num_domains(), 3);
        assert_eq!(ddc.rank_of(2).unwrap(), 1);
        assert!(ddc.rank_of(3).is_err());
    }
}
