// crates/cb_foundation/src/memory.rs

//! 对齐大块存储
//!
//! 提供由 `std::alloc` 直接支撑的对齐连续缓冲区 `BulkVec`，
//! 用于承载大量小型定长记录的紧凑宿主端存储（如截面缓存）。
//!
//! # 设计要点
//!
//! 1. **定长**: 创建后长度不变，整块分配、整块释放
//! 2. **对齐可选**: 缓存行（64B）或设备合并访问（256B）
//! 3. **零初始化**: `alloc_zeroed` 分配，内容全零

use bytemuck::Pod;
use rayon::prelude::*;
use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

/// 对齐要求
pub trait Alignment: 'static {
    /// 请求的字节对齐
    const ALIGN: usize;
}

/// CPU 对齐（64 字节缓存行 / AVX-512）
#[derive(Debug, Clone, Copy)]
pub struct CpuAlign;
impl Alignment for CpuAlign {
    const ALIGN: usize = 64;
}

/// 设备对齐（256 字节，利于合并访问）
#[derive(Debug, Clone, Copy)]
pub struct GpuAlign;
impl Alignment for GpuAlign {
    const ALIGN: usize = 256;
}

/// 默认对齐（8 字节）
#[derive(Debug, Clone, Copy)]
pub struct DefaultAlign;
impl Alignment for DefaultAlign {
    const ALIGN: usize = 8;
}

/// 对齐的定长连续缓冲区
///
/// 整块零初始化分配；分配失败是致命错误（`handle_alloc_error`）。
#[derive(Debug)]
pub struct BulkVec<T: Pod, A: Alignment = CpuAlign> {
    ptr: *mut T,
    len: usize,
    _align: PhantomData<A>,
}

unsafe impl<T: Pod + Send, A: Alignment> Send for BulkVec<T, A> {}
unsafe impl<T: Pod + Sync, A: Alignment> Sync for BulkVec<T, A> {}

impl<T: Pod, A: Alignment> BulkVec<T, A> {
    /// 创建长度为 `len` 的零初始化缓冲区
    pub fn zeros(len: usize) -> Self {
        if len == 0 || std::mem::size_of::<T>() == 0 {
            return Self {
                ptr: std::ptr::null_mut(),
                len,
                _align: PhantomData,
            };
        }

        let layout = Self::layout_for(len);
        let ptr = unsafe { alloc_zeroed(layout) as *mut T };
        if ptr.is_null() {
            handle_alloc_error(layout);
        }

        debug_assert_eq!((ptr as usize) % layout.align(), 0, "Alignment guarantee violated");

        Self {
            ptr,
            len,
            _align: PhantomData,
        }
    }

    /// 元素数量
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 只读切片视图
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        if self.ptr.is_null() {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
        }
    }

    /// 可变切片视图
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        if self.ptr.is_null() {
            &mut []
        } else {
            unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
        }
    }

    /// 填充为同一值
    pub fn fill(&mut self, value: T) {
        self.as_mut_slice().fill(value);
    }

    /// 并行填充为同一值
    pub fn par_fill(&mut self, value: T)
    where
        T: Send + Sync,
    {
        self.as_mut_slice().par_iter_mut().for_each(|v| *v = value);
    }

    fn layout_for(len: usize) -> Layout {
        let size = len * std::mem::size_of::<T>();
        let align = A::ALIGN.max(std::mem::align_of::<T>());
        Layout::from_size_align(size, align).expect("Invalid layout")
    }
}

impl<T: Pod, A: Alignment> Drop for BulkVec<T, A> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { dealloc(self.ptr as *mut u8, Self::layout_for(self.len)) };
        }
    }
}

impl<T: Pod, A: Alignment> Deref for BulkVec<T, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Pod, A: Alignment> DerefMut for BulkVec<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}
