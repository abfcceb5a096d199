// crates/cb_mesh/src/records.rs

//! 变长单元记录
//!
//! 每个单元拥有数量随数据而定的点表与面表。`RecordBuf` 为单条记录的
//! 容器：独立分配、自带长度、无隐式共享，记录可以单独释放或搬迁。
//!
//! # 设计要点
//!
//! 1. **独立所有权**: 每条记录一次堆分配（`Box<[T]>`），互不共享
//! 2. **自描述**: 元素数量随记录本身传递
//! 3. **构建后只读**: 提供追加式构建，冻结后仅暴露只读访问

use serde::{Deserialize, Serialize};
use std::ops::Index;

use crate::types::{FacetAdjacency, GeneralPlane};

/// 变长记录缓冲区
///
/// 记录的字节数在运行期确定；分配失败是致命错误（中止迁移）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordBuf<T> {
    data: Box<[T]>,
}

impl<T> RecordBuf<T> {
    /// 创建空记录
    pub fn empty() -> Self {
        Self { data: Box::new([]) }
    }

    /// 由 `Vec` 创建（接管其分配）
    pub fn from_vec(data: Vec<T>) -> Self {
        Self {
            data: data.into_boxed_slice(),
        }
    }

    /// 由切片克隆创建
    pub fn from_slice(data: &[T]) -> Self
    where
        T: Clone,
    {
        Self {
            data: data.to_vec().into_boxed_slice(),
        }
    }

    /// 元素数量
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 原始元素访问
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// 越界检查的索引读取
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    /// 元素迭代器
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }
}

impl<T> Index<usize> for RecordBuf<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

impl<T> Default for RecordBuf<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<Vec<T>> for RecordBuf<T> {
    fn from(data: Vec<T>) -> Self {
        Self::from_vec(data)
    }
}

/// 单元连接记录
///
/// 一个单元的点索引序列（长度 = `num_points`）与面邻接序列
/// （长度 = `num_facets`），两者各自独立定长。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CellConnectivity {
    /// 点索引序列
    pub point: RecordBuf<u32>,
    /// 面邻接序列
    pub facet: RecordBuf<FacetAdjacency>,
}

impl CellConnectivity {
    /// 创建连接记录
    pub fn new(point: Vec<u32>, facet: Vec<FacetAdjacency>) -> Self {
        Self {
            point: point.into(),
            facet: facet.into(),
        }
    }

    /// 点数量
    #[inline]
    pub fn num_points(&self) -> usize {
        self.point.len()
    }

    /// 面数量
    #[inline]
    pub fn num_facets(&self) -> usize {
        self.facet.len()
    }
}

/// 单元几何记录
///
/// 一个单元每个面的平面方程系数，长度与该单元的面数一致，
/// 与连接记录的面序列形状平行但分开存放。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CellGeometry {
    /// 面平面序列
    pub facet: RecordBuf<GeneralPlane>,
}

impl CellGeometry {
    /// 创建几何记录
    pub fn new(facet: Vec<GeneralPlane>) -> Self {
        Self { facet: facet.into() }
    }

    /// 面数量
    #[inline]
    pub fn num_facets(&self) -> usize {
        self.facet.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_buf_basic() {
        let buf: RecordBuf<u32> = vec![3, 1, 4, 1, 5].into();
        assert_eq!(buf.len(), 5);
        assert_eq!(buf[2], 4);
        assert_eq!(buf.get(4), Some(&5));
        assert_eq!(buf.get(5), None);
    }

    #[test]
    fn test_record_buf_empty() {
        let buf: RecordBuf<u32> = RecordBuf::empty();
        assert!(buf.is_empty());
        assert!(buf.as_slice().is_empty());
    }

    #[test]
    fn test_records_independent() {
        // 两条记录各自独立分配，修改来源不影响记录
        let mut src = vec![1u32, 2, 3];
        let a = RecordBuf::from_slice(&src);
        src[0] = 9;
        let b = RecordBuf::from_vec(src);
        assert_eq!(a.as_slice(), &[1, 2, 3]);
        assert_eq!(b.as_slice(), &[9, 2, 3]);
    }

    #[test]
    fn test_cell_connectivity_independent_lengths() {
        let cell = CellConnectivity::new(
            vec![0, 1, 2, 3, 4],
            vec![FacetAdjacency::boundary([0, 1, 2]); 4],
        );
        assert_eq!(cell.num_points(), 5);
        assert_eq!(cell.num_facets(), 4);
    }

    #[test]
    fn test_cell_geometry_len() {
        let geom = CellGeometry::new(vec![GeneralPlane::default(); 6]);
        assert_eq!(geom.num_facets(), 6);
    }
}
