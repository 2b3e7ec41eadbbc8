//! pool.rs

use crossbeam::queue::ArrayQueue;
use osal_core::pool::{
    FixedAllocatorFactory, FixedMemoryPoolFactory, RawFixedAllocator, RawFixedMemoryPool,
    RawVariableAllocator, RawVariableMemoryPool, VariableAllocatorFactory,
    VariableMemoryPoolFactory,
};
use parking_lot::Mutex as PlMutex;
use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::sync::Arc;

const ALIGN: usize = std::mem::align_of::<usize>();
const HEADER: usize = std::mem::size_of::<usize>();

fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// Equal-sized blocks carved out of one heap region, recycled through a
/// lock-free queue of free offsets.
struct HostFixedMemoryPool {
    base: *mut u8,
    layout: Layout,
    block_size: usize,
    free: ArrayQueue<usize>,
}

// The raw base pointer is only dereferenced through offsets handed out by
// the free queue; the queue provides the synchronization.
unsafe impl Send for HostFixedMemoryPool {}
unsafe impl Sync for HostFixedMemoryPool {}

impl HostFixedMemoryPool {
    fn new(block_size: usize, pool_size: usize) -> Option<Self> {
        if block_size == 0 || pool_size == 0 {
            return None;
        }
        let stride = round_up(block_size, ALIGN);
        let blocks = pool_size / stride;
        if blocks == 0 {
            return None;
        }
        let layout = Layout::from_size_align(stride * blocks, ALIGN).ok()?;
        let base = unsafe { alloc::alloc(layout) };
        if base.is_null() {
            return None;
        }
        let free = ArrayQueue::new(blocks);
        for block in 0..blocks {
            let _ = free.push(block * stride);
        }
        Some(Self {
            base,
            layout,
            block_size,
            free,
        })
    }
}

impl Drop for HostFixedMemoryPool {
    fn drop(&mut self) {
        unsafe { alloc::dealloc(self.base, self.layout) };
    }
}

impl RawFixedAllocator for HostFixedMemoryPool {
    fn allocate(&self) -> Option<NonNull<u8>> {
        let offset = self.free.pop()?;
        // Offsets from the free queue are in bounds by construction.
        Some(unsafe { NonNull::new_unchecked(self.base.add(offset)) })
    }

    unsafe fn deallocate(&self, block: NonNull<u8>) {
        let offset = block.as_ptr() as usize - self.base as usize;
        debug_assert!(offset < self.layout.size());
        let _ = self.free.push(offset);
    }
}

impl RawFixedMemoryPool for HostFixedMemoryPool {
    fn block_size(&self) -> usize {
        self.block_size
    }
}

/// First-fit allocator over one heap region. Each handed-out block is
/// preceded by a header word recording its reserved length; the free list is
/// kept sorted by offset and coalesced on every return.
struct HostVariableMemoryPool {
    base: *mut u8,
    layout: Layout,
    pool_size: usize,
    free: PlMutex<Vec<(usize, usize)>>,
}

unsafe impl Send for HostVariableMemoryPool {}
unsafe impl Sync for HostVariableMemoryPool {}

impl HostVariableMemoryPool {
    fn new(pool_size: usize) -> Option<Self> {
        if pool_size == 0 {
            return None;
        }
        let size = round_up(pool_size, ALIGN);
        let layout = Layout::from_size_align(size, ALIGN).ok()?;
        let base = unsafe { alloc::alloc(layout) };
        if base.is_null() {
            return None;
        }
        Some(Self {
            base,
            layout,
            pool_size: size,
            free: PlMutex::new(vec![(0, size)]),
        })
    }
}

impl Drop for HostVariableMemoryPool {
    fn drop(&mut self) {
        unsafe { alloc::dealloc(self.base, self.layout) };
    }
}

impl RawVariableAllocator for HostVariableMemoryPool {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }
        let need = HEADER + round_up(size, ALIGN);
        let mut free = self.free.lock();
        let slot = free.iter().position(|&(_, len)| len >= need)?;
        let (offset, len) = free[slot];
        if len == need {
            free.remove(slot);
        } else {
            free[slot] = (offset + need, len - need);
        }
        unsafe {
            (self.base.add(offset) as *mut usize).write(need);
            Some(NonNull::new_unchecked(self.base.add(offset + HEADER)))
        }
    }

    unsafe fn deallocate(&self, block: NonNull<u8>) {
        let offset = block.as_ptr() as usize - self.base as usize - HEADER;
        debug_assert!(offset < self.layout.size());
        let len = (self.base.add(offset) as *const usize).read();

        let mut free = self.free.lock();
        let slot = free
            .iter()
            .position(|&(start, _)| start > offset)
            .unwrap_or(free.len());
        free.insert(slot, (offset, len));
        // Merge with the following then the preceding neighbor.
        if slot + 1 < free.len() && free[slot].0 + free[slot].1 == free[slot + 1].0 {
            free[slot].1 += free[slot + 1].1;
            free.remove(slot + 1);
        }
        if slot > 0 && free[slot - 1].0 + free[slot - 1].1 == free[slot].0 {
            free[slot - 1].1 += free[slot].1;
            free.remove(slot);
        }
    }
}

impl RawVariableMemoryPool for HostVariableMemoryPool {
    fn pool_size(&self) -> usize {
        self.pool_size
    }
}

pub(crate) struct HostFixedMemoryPoolFactory;

impl FixedMemoryPoolFactory for HostFixedMemoryPoolFactory {
    fn create(&self, block_size: usize, pool_size: usize) -> Option<Arc<dyn RawFixedMemoryPool>> {
        HostFixedMemoryPool::new(block_size, pool_size)
            .map(|p| Arc::new(p) as Arc<dyn RawFixedMemoryPool>)
    }
}

impl FixedAllocatorFactory for HostFixedMemoryPoolFactory {
    fn create(&self, block_size: usize, pool_size: usize) -> Option<Arc<dyn RawFixedAllocator>> {
        HostFixedMemoryPool::new(block_size, pool_size)
            .map(|p| Arc::new(p) as Arc<dyn RawFixedAllocator>)
    }
}

pub(crate) struct HostVariableMemoryPoolFactory;

impl VariableMemoryPoolFactory for HostVariableMemoryPoolFactory {
    fn create(&self, pool_size: usize) -> Option<Arc<dyn RawVariableMemoryPool>> {
        HostVariableMemoryPool::new(pool_size)
            .map(|p| Arc::new(p) as Arc<dyn RawVariableMemoryPool>)
    }
}

impl VariableAllocatorFactory for HostVariableMemoryPoolFactory {
    fn create(&self, pool_size: usize) -> Option<Arc<dyn RawVariableAllocator>> {
        HostVariableMemoryPool::new(pool_size)
            .map(|p| Arc::new(p) as Arc<dyn RawVariableAllocator>)
    }
}
