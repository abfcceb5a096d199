// crates/cb_mesh/src/domain.rs

//! 域网格描述符
//!
//! 聚合一个空间子域的节点坐标、单元连接记录、单元几何记录与
//! 邻居域信息。由剖分输出一次性构建（冻结），此后只读；
//! 重建路径只整体销毁重来，不做增量修改。

use cb_foundation::error::{CbError, CbResult};
use cb_foundation::require;
use serde::{Deserialize, Serialize};

use crate::partition::{Decomposition, GlobalGrid, MeshPartition};
use crate::records::{CellConnectivity, CellGeometry};
use crate::types::{FacetEvent, Node, INVALID_INDEX};

/// 域网格描述符
///
/// 不变量：`cell_connectivity.len() == cell_geometry.len()`，
/// 且每个单元的几何面数与连接面数一致（见 [`MeshDomain::validate`]）。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshDomain {
    /// 本域全局编号
    pub domain_gid: u32,
    /// 邻居域全局编号（仅宿主端使用，不迁移到设备）
    pub nbr_domain_gid: Vec<u32>,
    /// 邻居域所属 rank
    pub nbr_rank: Vec<u32>,
    /// 节点坐标
    pub node: Vec<Node>,
    /// 每单元连接记录
    pub cell_connectivity: Vec<CellConnectivity>,
    /// 每单元几何记录
    pub cell_geometry: Vec<CellGeometry>,
}

impl MeshDomain {
    /// 由剖分输出一次性构建域网格
    ///
    /// - 节点按 `node_gid` 从全局网格取坐标
    /// - 邻居 rank 通过域分解解析
    /// - 内部面按邻域 rank 标记进程内 / 跨进程转移
    /// - 边界面按单元内面序号套用边界条件序列
    pub fn from_partition(
        partition: &MeshPartition,
        grid: &GlobalGrid,
        ddc: &Decomposition,
        boundary_condition: &[FacetEvent],
    ) -> CbResult<Self> {
        let own_rank = ddc.rank_of(partition.domain_gid)?;

        let node = partition
            .node_gid
            .iter()
            .map(|&gid| grid.node(gid).map(Node::from))
            .collect::<CbResult<Vec<_>>>()?;

        let nbr_rank = partition
            .nbr_domain_gid
            .iter()
            .map(|&gid| ddc.rank_of(gid))
            .collect::<CbResult<Vec<_>>>()?;

        let mut cell_connectivity = Vec::with_capacity(partition.cell.len());
        let mut cell_geometry = Vec::with_capacity(partition.cell.len());

        for (cell_idx, cell) in partition.cell.iter().enumerate() {
            // 几何面序列与连接面序列形状平行
            CbError::check_size("cell_plane", cell.facet.len(), cell.plane.len())?;

            for &p in &cell.point {
                CbError::check_index("CellPoint", p as usize, node.len())?;
            }

            let mut facets = cell.facet.clone();
            for (facet_idx, facet) in facets.iter_mut().enumerate() {
                for &p in &facet.point {
                    if p != INVALID_INDEX {
                        CbError::check_index("FacetPoint", p as usize, node.len())?;
                    }
                }

                if facet.is_boundary() {
                    let event = require!(
                        boundary_condition.get(facet_idx),
                        CbError::invalid_mesh(format!(
                            "单元 {cell_idx} 的边界面 {facet_idx} 缺少边界条件"
                        ))
                    );
                    facet.event = event.code();
                } else {
                    facet.adjacent_rank = ddc.rank_of(facet.adjacent_domain)?;
                    facet.event = if facet.adjacent_rank == own_rank {
                        FacetEvent::TransitOnRank.code()
                    } else {
                        FacetEvent::TransitOffRank.code()
                    };
                }
            }

            cell_connectivity.push(CellConnectivity::new(cell.point.clone(), facets));
            cell_geometry.push(CellGeometry::new(cell.plane.clone()));
        }

        let mesh = Self {
            domain_gid: partition.domain_gid,
            nbr_domain_gid: partition.nbr_domain_gid.clone(),
            nbr_rank,
            node,
            cell_connectivity,
            cell_geometry,
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// 单元数量
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cell_connectivity.len()
    }

    /// 节点数量
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.node.len()
    }

    /// 校验网格不变量
    ///
    /// 连接记录与几何记录一一对应，且每个单元两者的面数一致。
    pub fn validate(&self) -> CbResult<()> {
        CbError::check_size(
            "cell_geometry",
            self.cell_connectivity.len(),
            self.cell_geometry.len(),
        )?;
        for (conn, geom) in self.cell_connectivity.iter().zip(&self.cell_geometry) {
            CbError::check_size("cell_facets", conn.num_facets(), geom.num_facets())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::PartitionCell;
    use crate::types::{FacetAdjacency, GeneralPlane};
    use glam::DVec3;

    fn tetra_cell(adjacent: Option<(u32, u32)>) -> PartitionCell {
        // 四面体：4 点 4 面
        let facets = (0..4u32)
            .map(|j| match adjacent {
                Some((cell, domain)) if j == 0 => {
                    FacetAdjacency::interior(cell, domain, INVALID_INDEX, [0, 1, 2])
                }
                _ => FacetAdjacency::boundary([j, (j + 1) % 4, (j + 2) % 4]),
            })
            .collect();
        PartitionCell {
            point: vec![0, 1, 2, 3],
            facet: facets,
            plane: vec![GeneralPlane::default(); 4],
        }
    }

    fn unit_grid() -> GlobalGrid {
        GlobalGrid::new(vec![
            DVec3::ZERO,
            DVec3::X,
            DVec3::Y,
            DVec3::Z,
            DVec3::ONE,
        ])
    }

    fn reflecting_bc() -> Vec<FacetEvent> {
        vec![FacetEvent::BoundaryReflection; 8]
    }

    #[test]
    fn test_from_partition_basic() {
        let partition = MeshPartition {
            domain_gid: 0,
            nbr_domain_gid: vec![1],
            node_gid: vec![0, 1, 2, 3],
            cell: vec![tetra_cell(Some((0, 1)))],
        };
        let ddc = Decomposition::new(vec![0, 1]);
        let mesh =
            MeshDomain::from_partition(&partition, &unit_grid(), &ddc, &reflecting_bc()).unwrap();

        assert_eq!(mesh.cell_count(), 1);
        assert_eq!(mesh.num_nodes(), 4);
        assert_eq!(mesh.nbr_rank, vec![1]);

        let conn = &mesh.cell_connectivity[0];
        assert_eq!(conn.num_points(), 4);
        assert_eq!(conn.num_facets(), 4);

        // 面 0 为跨进程转移（域 1 在 rank 1），其余为反射边界
        assert_eq!(conn.facet[0].event(), Some(FacetEvent::TransitOffRank));
        assert_eq!(conn.facet[0].adjacent_rank, 1);
        assert_eq!(conn.facet[1].event(), Some(FacetEvent::BoundaryReflection));
    }

    #[test]
    fn test_on_rank_transit() {
        let partition = MeshPartition {
            domain_gid: 0,
            nbr_domain_gid: vec![1],
            node_gid: vec![0, 1, 2, 3],
            cell: vec![tetra_cell(Some((0, 1)))],
        };
        // 两个域同属 rank 0
        let ddc = Decomposition::new(vec![0, 0]);
        let mesh =
            MeshDomain::from_partition(&partition, &unit_grid(), &ddc, &reflecting_bc()).unwrap();
        assert_eq!(
            mesh.cell_connectivity[0].facet[0].event(),
            Some(FacetEvent::TransitOnRank)
        );
    }

    #[test]
    fn test_plane_facet_mismatch_rejected() {
        let mut cell = tetra_cell(None);
        cell.plane.pop();
        let partition = MeshPartition {
            domain_gid: 0,
            nbr_domain_gid: vec![],
            node_gid: vec![0, 1, 2, 3],
            cell: vec![cell],
        };
        let ddc = Decomposition::new(vec![0]);
        let result = MeshDomain::from_partition(&partition, &unit_grid(), &ddc, &reflecting_bc());
        assert!(matches!(result, Err(CbError::SizeMismatch { .. })));
    }

    #[test]
    fn test_missing_boundary_condition_rejected() {
        let partition = MeshPartition {
            domain_gid: 0,
            nbr_domain_gid: vec![],
            node_gid: vec![0, 1, 2, 3],
            cell: vec![tetra_cell(None)],
        };
        let ddc = Decomposition::new(vec![0]);
        let result = MeshDomain::from_partition(&partition, &unit_grid(), &ddc, &[]);
        assert!(matches!(result, Err(CbError::InvalidMesh { .. })));
    }

    #[test]
    fn test_bad_point_index_rejected() {
        let mut cell = tetra_cell(None);
        cell.point[0] = 99;
        let partition = MeshPartition {
            domain_gid: 0,
            nbr_domain_gid: vec![],
            node_gid: vec![0, 1, 2, 3],
            cell: vec![cell],
        };
        let ddc = Decomposition::new(vec![0]);
        let result = MeshDomain::from_partition(&partition, &unit_grid(), &ddc, &reflecting_bc());
        assert!(matches!(result, Err(CbError::IndexOutOfBounds { .. })));
    }

    #[test]
    fn test_validate_catches_shape_drift() {
        let partition = MeshPartition {
            domain_gid: 0,
            nbr_domain_gid: vec![],
            node_gid: vec![0, 1, 2, 3],
            cell: vec![tetra_cell(None)],
        };
        let ddc = Decomposition::new(vec![0]);
        let mut mesh =
            MeshDomain::from_partition(&partition, &unit_grid(), &ddc, &reflecting_bc()).unwrap();
        mesh.cell_geometry.pop();
        assert!(mesh.validate().is_err());
    }
}
