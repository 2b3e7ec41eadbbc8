//! pool.rs
//!
//! Fixed- and variable-block memory pools plus the bare allocator seams that
//! containers plug into. Pools add sizing metadata on top of the allocator
//! contract; both are created through their own registered factories.

use crate::registry;
use std::ptr::NonNull;
use std::sync::Arc;

/// Equal-sized block allocation. Exhaustion yields `None`.
pub trait RawFixedAllocator: Send + Sync {
    fn allocate(&self) -> Option<NonNull<u8>>;

    /// # Safety
    ///
    /// `block` must have been returned by `allocate` on this same object and
    /// not deallocated since.
    unsafe fn deallocate(&self, block: NonNull<u8>);
}

/// Arbitrary-size allocation out of a backing region, first-fit or
/// equivalent.
pub trait RawVariableAllocator: Send + Sync {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>>;

    /// # Safety
    ///
    /// `block` must have been returned by `allocate` on this same object and
    /// not deallocated since.
    unsafe fn deallocate(&self, block: NonNull<u8>);
}

pub trait RawFixedMemoryPool: RawFixedAllocator {
    fn block_size(&self) -> usize;
}

pub trait RawVariableMemoryPool: RawVariableAllocator {
    fn pool_size(&self) -> usize;
}

pub trait FixedMemoryPoolFactory: Send + Sync {
    fn create(&self, block_size: usize, pool_size: usize) -> Option<Arc<dyn RawFixedMemoryPool>>;
}

pub trait VariableMemoryPoolFactory: Send + Sync {
    fn create(&self, pool_size: usize) -> Option<Arc<dyn RawVariableMemoryPool>>;
}

pub trait FixedAllocatorFactory: Send + Sync {
    fn create(&self, block_size: usize, pool_size: usize) -> Option<Arc<dyn RawFixedAllocator>>;
}

pub trait VariableAllocatorFactory: Send + Sync {
    fn create(&self, pool_size: usize) -> Option<Arc<dyn RawVariableAllocator>>;
}

/// Fixed-block pool handle. `deallocate(None)` is a no-op.
#[derive(Clone)]
pub struct FixedMemoryPool {
    raw: Arc<dyn RawFixedMemoryPool>,
}

impl FixedMemoryPool {
    /// `block_size` and `pool_size` are in bytes; zero for either yields
    /// `None`.
    pub fn create(block_size: usize, pool_size: usize) -> Option<FixedMemoryPool> {
        let raw = registry::FIXED_MEMORY_POOL_FACTORY
            .get()
            .create(block_size, pool_size)?;
        Some(FixedMemoryPool { raw })
    }

    pub fn allocate(&self) -> Option<NonNull<u8>> {
        self.raw.allocate()
    }

    /// # Safety
    ///
    /// A `Some` block must originate from this pool's `allocate`.
    pub unsafe fn deallocate(&self, block: Option<NonNull<u8>>) {
        if let Some(block) = block {
            self.raw.deallocate(block);
        }
    }

    pub fn block_size(&self) -> usize {
        self.raw.block_size()
    }
}

/// Variable-block pool handle. `deallocate(None)` is a no-op.
#[derive(Clone)]
pub struct VariableMemoryPool {
    raw: Arc<dyn RawVariableMemoryPool>,
}

impl VariableMemoryPool {
    /// `pool_size` is in bytes; zero yields `None`.
    pub fn create(pool_size: usize) -> Option<VariableMemoryPool> {
        let raw = registry::VARIABLE_MEMORY_POOL_FACTORY
            .get()
            .create(pool_size)?;
        Some(VariableMemoryPool { raw })
    }

    pub fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        self.raw.allocate(size)
    }

    /// # Safety
    ///
    /// A `Some` block must originate from this pool's `allocate`.
    pub unsafe fn deallocate(&self, block: Option<NonNull<u8>>) {
        if let Some(block) = block {
            self.raw.deallocate(block);
        }
    }

    pub fn pool_size(&self) -> usize {
        self.raw.pool_size()
    }
}

/// Bare fixed-block allocator handle, for collaborators that only need the
/// allocate/deallocate seam.
#[derive(Clone)]
pub struct FixedAllocator {
    raw: Arc<dyn RawFixedAllocator>,
}

impl FixedAllocator {
    pub fn create(block_size: usize, pool_size: usize) -> Option<FixedAllocator> {
        let raw = registry::FIXED_ALLOCATOR_FACTORY
            .get()
            .create(block_size, pool_size)?;
        Some(FixedAllocator { raw })
    }

    pub fn allocate(&self) -> Option<NonNull<u8>> {
        self.raw.allocate()
    }

    /// # Safety
    ///
    /// A `Some` block must originate from this allocator's `allocate`.
    pub unsafe fn deallocate(&self, block: Option<NonNull<u8>>) {
        if let Some(block) = block {
            self.raw.deallocate(block);
        }
    }
}

/// Bare variable-size allocator handle.
#[derive(Clone)]
pub struct VariableAllocator {
    raw: Arc<dyn RawVariableAllocator>,
}

impl VariableAllocator {
    pub fn create(pool_size: usize) -> Option<VariableAllocator> {
        let raw = registry::VARIABLE_ALLOCATOR_FACTORY.get().create(pool_size)?;
        Some(VariableAllocator { raw })
    }

    pub fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        self.raw.allocate(size)
    }

    /// # Safety
    ///
    /// A `Some` block must originate from this allocator's `allocate`.
    pub unsafe fn deallocate(&self, block: Option<NonNull<u8>>) {
        if let Some(block) = block {
            self.raw.deallocate(block);
        }
    }
}
