// crates/cb_transport/src/gpu/queue.rs

//! 设备执行队列抽象
//!
//! 定义迁移所需的四个同步原语：分配、拷贝（双向）、同步、释放。
//! 队列作为参数显式传入构建器，而非进程级单例，便于用宿主内存
//! 实现替身进行测试。
//!
//! `HostQueue` 是始终可用的参考实现：分配表驻留宿主内存，拷贝
//! 全程越界检查，并维护在用分配 / 字节数统计供泄漏断言使用。

use parking_lot::Mutex;
use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

/// 传输方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDirection {
    /// 宿主到设备
    HostToDevice,
    /// 设备到宿主
    DeviceToHost,
}

/// 不透明设备地址
///
/// 零值为 NULL 哨兵（零长度分配不占设备内存）。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct DevicePtr(pub u64);

impl DevicePtr {
    /// NULL 哨兵
    pub const NULL: Self = Self(0);

    /// 是否为 NULL
    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// 设备操作结果类型
pub type DeviceResult<T> = Result<T, DeviceError>;

/// 设备操作错误
///
/// 对迁移而言全部致命：调用方整体中止，不在内部重试。
#[derive(Error, Debug)]
pub enum DeviceError {
    /// 设备内存不足
    #[error("设备内存不足: 请求 {requested} 字节")]
    OutOfMemory {
        /// 请求的字节数
        requested: u64,
    },

    /// 传输未完成
    #[error("传输失败 ({direction:?}): {bytes} 字节")]
    TransferFailed {
        /// 传输方向
        direction: CopyDirection,
        /// 请求传输的字节数
        bytes: u64,
    },

    /// 无效设备指针（未分配或已释放）
    #[error("无效设备指针: {0:?}")]
    InvalidPointer(DevicePtr),

    /// 后端错误
    #[error("设备后端错误: {0}")]
    Backend(String),
}

/// 设备执行队列
///
/// 所有原语同步阻塞：返回即传输确认完成，不向调用方暴露完成
/// 句柄。实现需线程安全（`Send + Sync`），但迁移期间假定队列
/// 被单一控制线程独占使用。
pub trait DeviceQueue: Send + Sync {
    /// 队列名称（人类可读标识）
    fn name(&self) -> &'static str;

    /// 分配 `bytes` 字节设备内存
    ///
    /// `bytes == 0` 返回 [`DevicePtr::NULL`]，不产生分配。
    fn alloc(&self, bytes: u64) -> DeviceResult<DevicePtr>;

    /// 宿主数据拷入设备缓冲区
    fn copy_to_device(&self, dst: DevicePtr, data: &[u8]) -> DeviceResult<()>;

    /// 设备缓冲区拷回宿主
    fn copy_to_host(&self, src: DevicePtr, out: &mut [u8]) -> DeviceResult<()>;

    /// 阻塞直到所有已提交操作完成
    fn synchronize(&self) -> DeviceResult<()>;

    /// 释放设备内存
    ///
    /// 释放 [`DevicePtr::NULL`] 是空操作。
    fn free(&self, ptr: DevicePtr) -> DeviceResult<()>;
}

/// 传输统计
#[derive(Debug, Clone, Default)]
pub struct TransferStats {
    /// 上传次数
    pub upload_count: usize,
    /// 下载次数
    pub download_count: usize,
    /// 上传字节数
    pub uploaded_bytes: u64,
    /// 下载字节数
    pub downloaded_bytes: u64,
}

impl TransferStats {
    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 记录上传
    pub fn record_upload(&mut self, bytes: u64) {
        self.upload_count += 1;
        self.uploaded_bytes += bytes;
    }

    /// 记录下载
    pub fn record_download(&mut self, bytes: u64) {
        self.download_count += 1;
        self.downloaded_bytes += bytes;
    }
}

/// 地址按 256 字节对齐推进，保证各分配地址互不重叠
const HOST_ADDR_ALIGN: u64 = 256;

#[derive(Default)]
struct HostQueueInner {
    table: HashMap<u64, Box<[u8]>>,
    next_addr: u64,
    live_bytes: u64,
    stats: TransferStats,
}

/// 宿主内存参考队列
///
/// 始终可用；作为测试替身与 CPU 回退实现。可设置容量上限以
/// 演练设备内存不足路径。
pub struct HostQueue {
    capacity: Option<u64>,
    inner: Mutex<HostQueueInner>,
}

impl HostQueue {
    /// 创建无容量上限的队列
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// 创建带容量上限（字节）的队列
    pub fn with_capacity_limit(bytes: u64) -> Self {
        Self::with_capacity(Some(bytes))
    }

    fn with_capacity(capacity: Option<u64>) -> Self {
        Self {
            capacity,
            inner: Mutex::new(HostQueueInner {
                next_addr: HOST_ADDR_ALIGN,
                ..Default::default()
            }),
        }
    }

    /// 在用分配数量
    pub fn live_allocations(&self) -> usize {
        self.inner.lock().table.len()
    }

    /// 在用字节数
    pub fn live_bytes(&self) -> u64 {
        self.inner.lock().live_bytes
    }

    /// 传输统计快照
    pub fn stats(&self) -> TransferStats {
        self.inner.lock().stats.clone()
    }
}

impl Default for HostQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceQueue for HostQueue {
    fn name(&self) -> &'static str {
        "host"
    }

    fn alloc(&self, bytes: u64) -> DeviceResult<DevicePtr> {
        if bytes == 0 {
            return Ok(DevicePtr::NULL);
        }
        let mut inner = self.inner.lock();
        if let Some(capacity) = self.capacity {
            if inner.live_bytes + bytes > capacity {
                return Err(DeviceError::OutOfMemory { requested: bytes });
            }
        }
        let addr = inner.next_addr;
        inner.next_addr += bytes.div_ceil(HOST_ADDR_ALIGN) * HOST_ADDR_ALIGN;
        inner
            .table
            .insert(addr, vec![0u8; bytes as usize].into_boxed_slice());
        inner.live_bytes += bytes;
        Ok(DevicePtr(addr))
    }

    fn copy_to_device(&self, dst: DevicePtr, data: &[u8]) -> DeviceResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock();
        let HostQueueInner { table, stats, .. } = &mut *inner;
        let buf = table
            .get_mut(&dst.0)
            .ok_or(DeviceError::InvalidPointer(dst))?;
        if data.len() > buf.len() {
            return Err(DeviceError::TransferFailed {
                direction: CopyDirection::HostToDevice,
                bytes: data.len() as u64,
            });
        }
        buf[..data.len()].copy_from_slice(data);
        stats.record_upload(data.len() as u64);
        Ok(())
    }

    fn copy_to_host(&self, src: DevicePtr, out: &mut [u8]) -> DeviceResult<()> {
        if out.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock();
        let HostQueueInner { table, stats, .. } = &mut *inner;
        let buf = table.get(&src.0).ok_or(DeviceError::InvalidPointer(src))?;
        if out.len() > buf.len() {
            return Err(DeviceError::TransferFailed {
                direction: CopyDirection::DeviceToHost,
                bytes: out.len() as u64,
            });
        }
        out.copy_from_slice(&buf[..out.len()]);
        stats.record_download(out.len() as u64);
        Ok(())
    }

    fn synchronize(&self) -> DeviceResult<()> {
        // 宿主操作本身同步，无需等待
        Ok(())
    }

    fn free(&self, ptr: DevicePtr) -> DeviceResult<()> {
        if ptr.is_null() {
            return Ok(());
        }
        let mut inner = self.inner.lock();
        match inner.table.remove(&ptr.0) {
            Some(buf) => {
                inner.live_bytes -= buf.len() as u64;
                Ok(())
            }
            None => Err(DeviceError::InvalidPointer(ptr)),
        }
    }
}
