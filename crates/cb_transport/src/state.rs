// crates/cb_transport/src/state.rs

//! 单元状态与材料库接口
//!
//! 单元状态是模拟期间可变的每单元数据；其中能群合计数组的长度
//! 由全局能群数决定（全局常量，不随单元变化）。
//! 材料库是外部协作方，这里只定义其被消费的表结构。

use serde::{Deserialize, Serialize};

/// 单条材料记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// 材料名称
    pub name: String,
    /// 原子数密度
    pub number_density: f64,
}

impl Material {
    /// 创建材料
    pub fn new(name: impl Into<String>, number_density: f64) -> Self {
        Self {
            name: name.into(),
            number_density,
        }
    }
}

/// 材料库（外部协作方提供的材料表）
///
/// 本子系统只消费其条目来确定单元状态的初值；具体物理不在此处。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialDatabase {
    /// 材料表
    pub mat: Vec<Material>,
}

impl MaterialDatabase {
    /// 创建空材料库
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加材料，返回其索引
    pub fn add_material(&mut self, material: Material) -> u32 {
        self.mat.push(material);
        (self.mat.len() - 1) as u32
    }

    /// 按索引取材料
    pub fn get(&self, index: u32) -> Option<&Material> {
        self.mat.get(index as usize)
    }

    /// 材料数量
    pub fn len(&self) -> usize {
        self.mat.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.mat.is_empty()
    }
}

/// 单元状态
///
/// 模拟期间由物理模块就地改写；迁移期间宿主端只读。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellState {
    /// 单元全局标识
    pub id: u64,
    /// 材料索引
    pub material: u32,
    /// 单元体积
    pub volume: f64,
    /// 原子数密度
    pub cell_number_density: f64,
    /// 源粒子计数
    pub source_tally: u64,
    /// 每能群合计，长度 = 能群数
    pub total: Vec<f64>,
}

impl CellState {
    /// 创建零初始化的单元状态
    pub fn new(id: u64, material: u32, number_density: f64, num_energy_groups: usize) -> Self {
        Self {
            id,
            material,
            volume: 0.0,
            cell_number_density: number_density,
            source_tally: 0,
            total: vec![0.0; num_energy_groups],
        }
    }

    /// 能群数量
    #[inline]
    pub fn num_groups(&self) -> usize {
        self.total.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_database() {
        let mut mdb = MaterialDatabase::new();
        assert!(mdb.is_empty());
        let idx = mdb.add_material(Material::new("sourceMaterial", 10.0));
        assert_eq!(idx, 0);
        assert_eq!(mdb.get(0).unwrap().name, "sourceMaterial");
        assert!(mdb.get(1).is_none());
    }

    #[test]
    fn test_cell_state_new() {
        let state = CellState::new(42, 0, 10.0, 6);
        assert_eq!(state.id, 42);
        assert_eq!(state.num_groups(), 6);
        assert!(state.total.iter().all(|&x| x == 0.0));
        assert_eq!(state.source_tally, 0);
    }
}
