// crates/cb_transport/src/gpu/migrate.rs

//! 设备镜像构建器
//!
//! 把一组宿主域迁移为设备常驻镜像。每个域分两阶段折平：
//!
//! 1. **变长子记录先行**: 逐单元为点表、面表、平面表与能群合计
//!    分配设备缓冲区并拷贝，地址与数量记入宿主端暂存记录
//! 2. **定形父聚合其次**: 暂存记录拼成每集合一个的连续数组整块
//!    上传，最后全部域镜像以单次传输拷入设备
//!
//! 顺序不变量：父聚合上传前，其内嵌的每个地址都必须已指向
//! 存在的设备缓冲区（子先于父）。暂存数组为瞬态，聚合拷贝
//! 完成即丢弃。
//!
//! 失败策略：任何分配或拷贝失败中止整组迁移，已产生的设备
//! 缓冲区在错误传播前全部释放；无部分成功，内部不重试。

use log::{debug, info};
use thiserror::Error;

use cb_foundation::error::CbError;

use super::buffer::{AllocSet, DeviceSlice};
use super::mirror::{
    CellConnectivityMirror, CellGeometryMirror, CellStateMirror, DomainMirror, MeshDomainMirror,
};
use super::queue::{DeviceError, DevicePtr, DeviceQueue, DeviceResult};
use crate::domain::Domain;

/// 迁移错误
#[derive(Error, Debug)]
pub enum MigrateError {
    /// 前置校验失败（在任何设备分配之前拒绝）
    #[error("迁移前置校验失败: {0}")]
    Precondition(#[from] CbError),

    /// 设备操作失败
    #[error("设备操作失败: {0}")]
    Device(#[from] DeviceError),
}

/// 迁移产物：一组设备常驻域镜像
///
/// 每次模拟装配构建一次，拆除或域重建时整体销毁，从不部分
/// 重建。持有全部设备分配的清单以便对称释放。
pub struct DomainMirrors {
    table: DeviceSlice<DomainMirror>,
    host_mirrors: Vec<DomainMirror>,
    allocations: Vec<DevicePtr>,
}

impl DomainMirrors {
    /// 域数量
    #[inline]
    pub fn domain_count(&self) -> usize {
        self.host_mirrors.len()
    }

    /// 设备端镜像数组（输运内核的只读输入）
    #[inline]
    pub fn table(&self) -> DeviceSlice<DomainMirror> {
        self.table
    }

    /// 镜像的宿主端副本（拆除登记与诊断用）
    #[inline]
    pub fn host_mirrors(&self) -> &[DomainMirror] {
        &self.host_mirrors
    }

    /// 设备分配总数
    #[inline]
    pub fn allocation_count(&self) -> usize {
        self.allocations.len()
    }

    /// 释放全部设备缓冲区
    ///
    /// 逆构建序逐笔释放；镜像随之失效。
    pub fn release(self, queue: &dyn DeviceQueue) -> DeviceResult<()> {
        let count = self.allocations.len();
        for ptr in self.allocations.iter().rev() {
            queue.free(*ptr)?;
        }
        debug!("域镜像已释放: {} 笔设备分配", count);
        Ok(())
    }
}

/// 把一组宿主域迁移为设备镜像
///
/// 迁移在单一控制线程上以同步操作完成，期间假定独占队列，
/// 且宿主域全程只读。失败时整组中止并回滚，调用方可在释放
/// 既有镜像后整体重试。
pub fn migrate_domains(
    queue: &dyn DeviceQueue,
    domains: &[Domain],
    num_energy_groups: usize,
) -> Result<DomainMirrors, MigrateError> {
    // 前置校验：任何设备分配之前拒绝不变量破坏，避免泄漏
    for domain in domains {
        domain.validate(num_energy_groups)?;
    }

    let mut set = AllocSet::new(queue);
    let mut host_mirrors = Vec::with_capacity(domains.len());

    for domain in domains {
        host_mirrors.push(migrate_domain(&mut set, domain)?);
    }

    // 全部域镜像单次传输上载
    let table = set.alloc_from_slice(&host_mirrors)?;
    queue.synchronize().map_err(MigrateError::Device)?;

    info!(
        "域迁移完成: {} 个域, {} 笔设备分配, {} 字节 (队列: {})",
        host_mirrors.len(),
        set.allocation_count(),
        set.total_bytes(),
        queue.name()
    );

    Ok(DomainMirrors {
        table,
        host_mirrors,
        allocations: set.into_ptrs(),
    })
}

/// 折平单个域
fn migrate_domain(set: &mut AllocSet<'_>, domain: &Domain) -> Result<DomainMirror, MigrateError> {
    let mesh = &domain.mesh;

    // 阶段 1: 变长子记录，逐单元独立缓冲区
    let mut conn_staging = Vec::with_capacity(mesh.cell_connectivity.len());
    for cell in &mesh.cell_connectivity {
        let point = set.alloc_from_slice(cell.point.as_slice())?;
        let facet = set.alloc_from_slice(cell.facet.as_slice())?;
        conn_staging.push(CellConnectivityMirror { point, facet });
    }

    let mut geom_staging = Vec::with_capacity(mesh.cell_geometry.len());
    for cell in &mesh.cell_geometry {
        let facet = set.alloc_from_slice(cell.facet.as_slice())?;
        geom_staging.push(CellGeometryMirror { facet });
    }

    let mut state_staging = Vec::with_capacity(domain.cell_state.len());
    for state in &domain.cell_state {
        let total = set.alloc_from_slice(&state.total)?;
        state_staging.push(CellStateMirror {
            id: state.id,
            volume: state.volume,
            cell_number_density: state.cell_number_density,
            source_tally: state.source_tally,
            material: state.material,
            _pad: 0,
            total,
        });
    }

    // 阶段 2: 定形父聚合，此刻所有内嵌地址均已有效
    let cell_connectivity = set.alloc_from_slice(&conn_staging)?;
    let cell_geometry = set.alloc_from_slice(&geom_staging)?;
    let cell_state = set.alloc_from_slice(&state_staging)?;
    let nbr_rank = set.alloc_from_slice(&mesh.nbr_rank)?;
    let node = set.alloc_from_slice(&mesh.node)?;

    debug!(
        "域 {} 已折平: {} 单元, 累计 {} 笔分配",
        domain.global_domain,
        domain.num_cells(),
        set.allocation_count()
    );

    Ok(DomainMirror {
        domain_index: domain.domain_index,
        global_domain: domain.global_domain,
        cell_state,
        mesh: MeshDomainMirror {
            domain_gid: mesh.domain_gid,
            _pad: 0,
            nbr_rank,
            node,
            cell_connectivity,
            cell_geometry,
        },
    })
    // 暂存数组在此丢弃：聚合拷贝已完成
}
