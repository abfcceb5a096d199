// crates/cb_transport/src/gpu/wgpu_queue.rs

//! wgpu 设备队列实现
//!
//! 基于 wgpu 提供跨平台的设备内存原语（Vulkan/Metal/DX12/WebGPU）。
//! 设备地址以句柄表映射到 `wgpu::Buffer`：分配即建缓冲区，
//! 拷入走 `Queue::write_buffer`，拷回经暂存缓冲区阻塞映射。

use std::collections::HashMap;

use log::info;
use parking_lot::Mutex;
use wgpu::{
    Adapter, Backends, Buffer, BufferDescriptor, BufferUsages, Device, DeviceDescriptor, Features,
    Instance, InstanceDescriptor, Limits, PowerPreference, Queue, RequestAdapterOptions,
};

use super::queue::{CopyDirection, DeviceError, DevicePtr, DeviceQueue, DeviceResult};

#[derive(Default)]
struct BufferTable {
    table: HashMap<u64, Buffer>,
    next_handle: u64,
}

/// wgpu 设备队列
pub struct WgpuQueue {
    device: Device,
    queue: Queue,
    inner: Mutex<BufferTable>,
}

impl WgpuQueue {
    /// 异步创建设备队列
    ///
    /// 返回 `Ok(None)` 表示没有可用的适配器。
    pub async fn new_async() -> Result<Option<Self>, DeviceError> {
        let instance = Instance::new(InstanceDescriptor {
            backends: Backends::all(),
            ..Default::default()
        });

        let adapter = match instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
        {
            Some(adapter) => adapter,
            None => return Ok(None),
        };

        let adapter_info = adapter.get_info();
        info!(
            "Found GPU adapter: {} ({:?})",
            adapter_info.name, adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("Cinnabar Device"),
                    required_features: Features::empty(),
                    required_limits: Self::required_limits(&adapter),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| DeviceError::Backend(e.to_string()))?;

        Ok(Some(Self {
            device,
            queue,
            inner: Mutex::new(BufferTable {
                next_handle: 1,
                ..Default::default()
            }),
        }))
    }

    /// 同步创建设备队列（阻塞调用）
    pub fn new() -> Result<Option<Self>, DeviceError> {
        pollster::block_on(Self::new_async())
    }

    fn required_limits(adapter: &Adapter) -> Limits {
        let supported = adapter.limits();
        Limits {
            max_storage_buffer_binding_size: supported
                .max_storage_buffer_binding_size
                .min(256 * 1024 * 1024),
            ..Limits::downlevel_defaults()
        }
    }

    /// 拷贝尺寸向上对齐到 wgpu 传输粒度
    fn padded_size(bytes: u64) -> u64 {
        bytes.div_ceil(wgpu::COPY_BUFFER_ALIGNMENT) * wgpu::COPY_BUFFER_ALIGNMENT
    }
}

impl DeviceQueue for WgpuQueue {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn alloc(&self, bytes: u64) -> DeviceResult<DevicePtr> {
        if bytes == 0 {
            return Ok(DevicePtr::NULL);
        }
        let buffer = self.device.create_buffer(&BufferDescriptor {
            label: Some("cinnabar_mirror"),
            size: Self::padded_size(bytes),
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let mut inner = self.inner.lock();
        let handle = inner.next_handle;
        inner.next_handle += 1;
        inner.table.insert(handle, buffer);
        Ok(DevicePtr(handle))
    }

    fn copy_to_device(&self, dst: DevicePtr, data: &[u8]) -> DeviceResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let inner = self.inner.lock();
        let buffer = inner
            .table
            .get(&dst.0)
            .ok_or(DeviceError::InvalidPointer(dst))?;
        if (data.len() as u64) > buffer.size() {
            return Err(DeviceError::TransferFailed {
                direction: CopyDirection::HostToDevice,
                bytes: data.len() as u64,
            });
        }

        // write_buffer 要求传输粒度对齐，尾部不足补零
        let padded = Self::padded_size(data.len() as u64) as usize;
        if padded == data.len() {
            self.queue.write_buffer(buffer, 0, data);
        } else {
            let mut staged = data.to_vec();
            staged.resize(padded, 0);
            self.queue.write_buffer(buffer, 0, &staged);
        }
        self.queue.submit(std::iter::empty());
        Ok(())
    }

    fn copy_to_host(&self, src: DevicePtr, out: &mut [u8]) -> DeviceResult<()> {
        if out.is_empty() {
            return Ok(());
        }
        let size = Self::padded_size(out.len() as u64);
        let staging = {
            let inner = self.inner.lock();
            let buffer = inner
                .table
                .get(&src.0)
                .ok_or(DeviceError::InvalidPointer(src))?;
            if (out.len() as u64) > buffer.size() {
                return Err(DeviceError::TransferFailed {
                    direction: CopyDirection::DeviceToHost,
                    bytes: out.len() as u64,
                });
            }

            let staging = self.device.create_buffer(&BufferDescriptor {
                label: Some("cinnabar_staging"),
                size,
                usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("cinnabar_readback"),
                });
            encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
            self.queue.submit(std::iter::once(encoder.finish()));
            staging
        };

        // 阻塞映射暂存缓冲区
        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        let transfer_failed = || DeviceError::TransferFailed {
            direction: CopyDirection::DeviceToHost,
            bytes: out.len() as u64,
        };
        receiver
            .recv()
            .map_err(|_| transfer_failed())?
            .map_err(|_| transfer_failed())?;

        let data = slice.get_mapped_range();
        out.copy_from_slice(&data[..out.len()]);
        drop(data);
        staging.unmap();
        Ok(())
    }

    fn synchronize(&self) -> DeviceResult<()> {
        self.device.poll(wgpu::Maintain::Wait);
        Ok(())
    }

    fn free(&self, ptr: DevicePtr) -> DeviceResult<()> {
        if ptr.is_null() {
            return Ok(());
        }
        let mut inner = self.inner.lock();
        match inner.table.remove(&ptr.0) {
            Some(buffer) => {
                buffer.destroy();
                Ok(())
            }
            None => Err(DeviceError::InvalidPointer(ptr)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_size() {
        assert_eq!(WgpuQueue::padded_size(0), 0);
        assert_eq!(WgpuQueue::padded_size(3), 4);
        assert_eq!(WgpuQueue::padded_size(4), 4);
        assert_eq!(WgpuQueue::padded_size(17), 20);
    }

    #[test]
    #[ignore = "Requires GPU hardware"]
    fn test_queue_creation() {
        let result = WgpuQueue::new();
        assert!(result.is_ok());
    }

    #[test]
    #[ignore = "Requires GPU hardware"]
    fn test_alloc_copy_roundtrip() {
        if let Ok(Some(queue)) = WgpuQueue::new() {
            let data: Vec<u8> = (0..64).collect();
            let ptr = queue.alloc(64).unwrap();
            queue.copy_to_device(ptr, &data).unwrap();
            queue.synchronize().unwrap();

            let mut out = vec![0u8; 64];
            queue.copy_to_host(ptr, &mut out).unwrap();
            assert_eq!(out, data);
            queue.free(ptr).unwrap();
        }
    }
}
