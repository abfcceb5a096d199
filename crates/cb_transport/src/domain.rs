// crates/cb_transport/src/domain.rs

//! 域描述符
//!
//! 聚合一个域网格、每单元模拟状态与截面缓存。截面缓存大小为
//! `单元数 × 能群数`，能群数变化时整块重建，循环中途不隐式扩缩。

use cb_foundation::ensure;
use cb_foundation::error::{CbError, CbResult};
use cb_foundation::memory::{BulkVec, GpuAlign};
use cb_mesh::MeshDomain;

use crate::state::{CellState, MaterialDatabase};

/// 域描述符
///
/// 宿主端所有缓冲区的唯一所有者；迁移产生的设备镜像持有独立的
/// 设备缓冲区，两者之间一律按值拷贝、从不共享内存。
#[derive(Debug)]
pub struct Domain {
    /// 域序号（保留字段，输运路径未使用）
    pub domain_index: u32,
    /// 域全局编号
    pub global_domain: u32,
    /// 每单元状态，与网格单元一一对应
    pub cell_state: Vec<CellState>,
    /// 域网格
    pub mesh: MeshDomain,
    /// 截面缓存，`单元数 × 能群数`，零值表示未计算
    cross_section_cache: BulkVec<f64, GpuAlign>,
    /// 当前能群数
    num_energy_groups: usize,
}

impl Domain {
    /// 创建域描述符
    ///
    /// 每个网格单元生成一条零初始化状态；截面缓存整块分配并清零。
    pub fn new(
        domain_index: u32,
        mesh: MeshDomain,
        material_database: &MaterialDatabase,
        num_energy_groups: usize,
    ) -> CbResult<Self> {
        mesh.validate()?;
        ensure!(
            !material_database.is_empty(),
            CbError::invalid_input("材料库为空，无法初始化单元状态")
        );

        // 单材料初值取表首条；多材料分布由物理模块覆写
        let number_density = material_database.mat[0].number_density;
        let global_domain = mesh.domain_gid;

        let cell_state = (0..mesh.cell_count())
            .map(|cell| {
                let id = ((global_domain as u64) << 32) | cell as u64;
                CellState::new(id, 0, number_density, num_energy_groups)
            })
            .collect();

        let cross_section_cache = BulkVec::zeros(mesh.cell_count() * num_energy_groups);

        Ok(Self {
            domain_index,
            global_domain,
            cell_state,
            mesh,
            cross_section_cache,
            num_energy_groups,
        })
    }

    /// 单元数量
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.cell_state.len()
    }

    /// 当前能群数
    #[inline]
    pub fn num_energy_groups(&self) -> usize {
        self.num_energy_groups
    }

    /// 清空截面缓存
    ///
    /// 重建为 `单元数 × num_energy_groups` 并把所有条目重置为
    /// 未计算哨兵（零）。旧内容无条件丢弃，不做部分失效。
    /// 能群数变化或新计算循环使缓存失效时必须调用。
    pub fn clear_cross_section_cache(&mut self, num_energy_groups: usize) {
        let wanted = self.num_cells() * num_energy_groups;
        if self.cross_section_cache.len() == wanted {
            self.cross_section_cache.par_fill(0.0);
        } else {
            self.cross_section_cache = BulkVec::zeros(wanted);
        }
        self.num_energy_groups = num_energy_groups;
    }

    /// 截面缓存只读视图
    #[inline]
    pub fn cross_section_cache(&self) -> &[f64] {
        &self.cross_section_cache
    }

    /// 截面缓存可写视图（物理模块就地覆写）
    #[inline]
    pub fn cross_section_cache_mut(&mut self) -> &mut [f64] {
        &mut self.cross_section_cache
    }

    /// 缓存中 (单元, 能群) 条目的线性下标
    #[inline]
    pub fn cache_index(&self, cell: usize, group: usize) -> usize {
        cell * self.num_energy_groups + group
    }

    /// 校验域不变量
    ///
    /// 连接 / 几何 / 状态三表一一对应，且每条状态的能群合计长度
    /// 等于给定能群数。迁移在任何设备分配之前调用此校验。
    pub fn validate(&self, num_energy_groups: usize) -> CbResult<()> {
        self.mesh.validate()?;
        CbError::check_size("cell_state", self.mesh.cell_count(), self.cell_state.len())?;
        for state in &self.cell_state {
            CbError::check_size("cell_total", num_energy_groups, state.total.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Material;
    use cb_mesh::{CellConnectivity, CellGeometry, FacetAdjacency, GeneralPlane};

    fn test_mesh(num_cells: usize) -> MeshDomain {
        let cell_connectivity = (0..num_cells)
            .map(|_| {
                CellConnectivity::new(vec![0, 1, 2, 3], vec![FacetAdjacency::default(); 4])
            })
            .collect();
        let cell_geometry = (0..num_cells)
            .map(|_| CellGeometry::new(vec![GeneralPlane::default(); 4]))
            .collect();
        MeshDomain {
            domain_gid: 7,
            node: vec![cb_mesh::Node::new(0.0, 0.0, 0.0); 4],
            cell_connectivity,
            cell_geometry,
            ..Default::default()
        }
    }

    fn test_mdb() -> MaterialDatabase {
        let mut mdb = MaterialDatabase::new();
        mdb.add_material(Material::new("default", 10.0));
        mdb
    }

    #[test]
    fn test_domain_new() {
        let domain = Domain::new(0, test_mesh(3), &test_mdb(), 6).unwrap();
        assert_eq!(domain.num_cells(), 3);
        assert_eq!(domain.global_domain, 7);
        assert_eq!(domain.cross_section_cache().len(), 18);
        assert_eq!(domain.cell_state[2].id, (7u64 << 32) | 2);
        assert!(domain.validate(6).is_ok());
    }

    #[test]
    fn test_empty_material_database_rejected() {
        let result = Domain::new(0, test_mesh(1), &MaterialDatabase::new(), 6);
        assert!(matches!(result, Err(CbError::InvalidInput { .. })));
    }

    #[test]
    fn test_clear_cache_idempotent() {
        let mut domain = Domain::new(0, test_mesh(4), &test_mdb(), 2).unwrap();
        domain.cross_section_cache_mut()[5] = 3.25;

        domain.clear_cross_section_cache(6);
        assert_eq!(domain.cross_section_cache().len(), 24);
        assert!(domain.cross_section_cache().iter().all(|&x| x == 0.0));

        // 同一能群数再次清空，结果不变
        domain.cross_section_cache_mut()[0] = 1.0;
        domain.clear_cross_section_cache(6);
        assert_eq!(domain.cross_section_cache().len(), 24);
        assert!(domain.cross_section_cache().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_cache_index() {
        let domain = Domain::new(0, test_mesh(4), &test_mdb(), 6).unwrap();
        assert_eq!(domain.cache_index(0, 0), 0);
        assert_eq!(domain.cache_index(2, 3), 15);
    }

    #[test]
    fn test_validate_total_length() {
        let mut domain = Domain::new(0, test_mesh(2), &test_mdb(), 6).unwrap();
        assert!(domain.validate(6).is_ok());
        domain.cell_state[1].total.pop();
        assert!(matches!(
            domain.validate(6),
            Err(CbError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_state_count() {
        let mut domain = Domain::new(0, test_mesh(2), &test_mdb(), 6).unwrap();
        domain.cell_state.pop();
        assert!(domain.validate(6).is_err());
    }
}
