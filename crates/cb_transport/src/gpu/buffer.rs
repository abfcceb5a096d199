// crates/cb_transport/src/gpu/buffer.rs

//! 远程切片与分配回滚集合
//!
//! `DeviceSlice<T>` 把设备地址与元素数量绑定为一个带类型标记的
//! POD 记录，可直接嵌入镜像结构随父聚合整块拷贝到设备。
//! `AllocSet` 记录构建过程中产生的每一笔设备分配：错误路径
//! 自动全部释放，成功路径移交指针清单用于对称销毁。

use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};

use super::queue::{DevicePtr, DeviceQueue, DeviceResult};

/// 带类型标记的远程切片（设备地址 + 元素数量）
///
/// 不拥有宿主内存，也不负责释放设备内存；其指向的设备缓冲区
/// 必须在切片被解引用的整个期间存活。
#[repr(C)]
pub struct DeviceSlice<T> {
    /// 设备地址
    addr: DevicePtr,
    /// 元素数量
    len: u32,
    /// 填充
    _pad: u32,
    /// 类型标记
    _marker: PhantomData<T>,
}

// PhantomData 令 derive 给 T 加多余约束，手写实现
impl<T> Clone for DeviceSlice<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for DeviceSlice<T> {}

impl<T> std::fmt::Debug for DeviceSlice<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSlice")
            .field("addr", &self.addr)
            .field("len", &self.len)
            .finish()
    }
}

impl<T> PartialEq for DeviceSlice<T> {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr && self.len == other.len
    }
}
impl<T> Eq for DeviceSlice<T> {}

// 布局: addr(8) + len(4) + _pad(4)，无隐式填充
unsafe impl<T: Pod> Zeroable for DeviceSlice<T> {}
unsafe impl<T: Pod> Pod for DeviceSlice<T> {}

impl<T> DeviceSlice<T> {
    /// 零长度 NULL 切片
    pub fn null() -> Self {
        Self {
            addr: DevicePtr::NULL,
            len: 0,
            _pad: 0,
            _marker: PhantomData,
        }
    }

    /// 由地址与元素数量组装切片
    pub fn from_raw(addr: DevicePtr, len: u32) -> Self {
        Self {
            addr,
            len,
            _pad: 0,
            _marker: PhantomData,
        }
    }

    /// 设备地址
    #[inline]
    pub fn addr(&self) -> DevicePtr {
        self.addr
    }

    /// 元素数量
    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T: Pod> DeviceSlice<T> {
    /// 字节长度
    #[inline]
    pub fn byte_len(&self) -> u64 {
        self.len as u64 * std::mem::size_of::<T>() as u64
    }

    /// 把指向的设备内容整块拷回宿主
    ///
    /// 供测试回读与诊断使用；输运内核在设备端直接解引用。
    pub fn read(&self, queue: &dyn DeviceQueue) -> DeviceResult<Vec<T>> {
        let mut out = vec![T::zeroed(); self.len as usize];
        if !out.is_empty() {
            queue.copy_to_host(self.addr, bytemuck::cast_slice_mut(&mut out))?;
        }
        Ok(out)
    }
}

impl<T> Default for DeviceSlice<T> {
    fn default() -> Self {
        Self::null()
    }
}

/// 分配回滚集合
///
/// 构建多级镜像期间的作用域所有权：`alloc_from_slice` 分配并
/// 拷贝一块缓冲区并登记其地址；集合被丢弃（错误提前返回）时
/// 逆序释放全部登记分配；`into_ptrs` 解除回滚并移交清单。
pub struct AllocSet<'q> {
    queue: &'q dyn DeviceQueue,
    ptrs: Vec<DevicePtr>,
    bytes: u64,
    armed: bool,
}

impl<'q> AllocSet<'q> {
    /// 在给定队列上创建空集合
    pub fn new(queue: &'q dyn DeviceQueue) -> Self {
        Self {
            queue,
            ptrs: Vec::new(),
            bytes: 0,
            armed: true,
        }
    }

    /// 分配并上传一块缓冲区，返回其远程切片
    ///
    /// 空切片返回 NULL，不产生设备分配。地址在拷贝发起前登记，
    /// 拷贝失败时该缓冲区同样会被回滚释放。
    pub fn alloc_from_slice<T: Pod>(&mut self, data: &[T]) -> DeviceResult<DeviceSlice<T>> {
        if data.is_empty() {
            return Ok(DeviceSlice::null());
        }
        let bytes = bytemuck::cast_slice::<T, u8>(data);
        let ptr = self.queue.alloc(bytes.len() as u64)?;
        self.ptrs.push(ptr);
        self.bytes += bytes.len() as u64;
        self.queue.copy_to_device(ptr, bytes)?;
        Ok(DeviceSlice::from_raw(ptr, data.len() as u32))
    }

    /// 已登记的分配数量
    pub fn allocation_count(&self) -> usize {
        self.ptrs.len()
    }

    /// 已上传的总字节数
    pub fn total_bytes(&self) -> u64 {
        self.bytes
    }

    /// 解除回滚，移交全部已登记地址
    pub fn into_ptrs(mut self) -> Vec<DevicePtr> {
        self.armed = false;
        std::mem::take(&mut self.ptrs)
    }
}

impl Drop for AllocSet<'_> {
    fn drop(&mut self) {
        if self.armed {
            for ptr in self.ptrs.iter().rev() {
                let _ = self.queue.free(*ptr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::queue::HostQueue;

    #[test]
    fn test_device_slice_layout() {
        assert_eq!(std::mem::size_of::<DeviceSlice<f64>>(), 16);
        assert_eq!(std::mem::size_of::<DeviceSlice<u32>>(), 16);
    }

    #[test]
    fn test_null_slice() {
        let slice: DeviceSlice<f64> = DeviceSlice::null();
        assert!(slice.is_empty());
        assert!(slice.addr().is_null());
        assert_eq!(slice.byte_len(), 0);
    }

    #[test]
    fn test_slice_read_roundtrip() {
        let queue = HostQueue::new();
        let mut set = AllocSet::new(&queue);
        let data = vec![1.0f64, 2.5, -3.0];
        let slice = set.alloc_from_slice(&data).unwrap();
        assert_eq!(slice.len(), 3);
        assert_eq!(slice.byte_len(), 24);
        assert_eq!(slice.read(&queue).unwrap(), data);
        let _ = set.into_ptrs();
    }

    #[test]
    fn test_alloc_set_rollback_on_drop() {
        let queue = HostQueue::new();
        {
            let mut set = AllocSet::new(&queue);
            set.alloc_from_slice(&[1u32, 2, 3]).unwrap();
            set.alloc_from_slice(&[4.0f64]).unwrap();
            assert_eq!(queue.live_allocations(), 2);
            // 集合被丢弃，全部回滚
        }
        assert_eq!(queue.live_allocations(), 0);
    }

    #[test]
    fn test_alloc_set_disarm() {
        let queue = HostQueue::new();
        let ptrs = {
            let mut set = AllocSet::new(&queue);
            set.alloc_from_slice(&[1u32, 2, 3]).unwrap();
            assert_eq!(set.allocation_count(), 1);
            assert_eq!(set.total_bytes(), 12);
            set.into_ptrs()
        };
        // 移交后不再回滚
        assert_eq!(queue.live_allocations(), 1);
        for ptr in ptrs {
            queue.free(ptr).unwrap();
        }
        assert_eq!(queue.live_allocations(), 0);
    }

    #[test]
    fn test_empty_slice_no_allocation() {
        let queue = HostQueue::new();
        let mut set = AllocSet::new(&queue);
        let slice = set.alloc_from_slice::<f64>(&[]).unwrap();
        assert!(slice.is_empty());
        assert_eq!(set.allocation_count(), 0);
        assert_eq!(queue.live_allocations(), 0);
    }
}
