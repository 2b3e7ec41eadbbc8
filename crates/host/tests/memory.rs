//! memory.rs

mod common;

use osal_core::pool::{FixedAllocator, FixedMemoryPool, VariableAllocator, VariableMemoryPool};
use std::collections::HashSet;

#[test]
fn fixed_pool_hands_out_distinct_blocks_until_exhausted() {
    common::init();
    let pool = FixedMemoryPool::create(16, 64).unwrap();
    assert_eq!(16, pool.block_size());

    let mut blocks = Vec::new();
    let mut seen = HashSet::new();
    for _ in 0..4 {
        let block = pool.allocate().unwrap();
        assert!(seen.insert(block.as_ptr() as usize));
        blocks.push(block);
    }
    assert!(pool.allocate().is_none());

    unsafe { pool.deallocate(blocks.pop()) };
    assert!(pool.allocate().is_some());
}

#[test]
fn fixed_pool_rejects_zero_sizes() {
    common::init();
    assert!(FixedMemoryPool::create(0, 64).is_none());
    assert!(FixedMemoryPool::create(16, 0).is_none());
    // A region too small for even one block is unusable.
    assert!(FixedMemoryPool::create(64, 16).is_none());
}

#[test]
fn deallocating_none_is_a_no_op() {
    common::init();
    let fixed = FixedMemoryPool::create(8, 32).unwrap();
    unsafe { fixed.deallocate(None) };
    let variable = VariableMemoryPool::create(128).unwrap();
    unsafe { variable.deallocate(None) };
}

#[test]
fn variable_pool_rejects_zero_size() {
    common::init();
    assert!(VariableMemoryPool::create(0).is_none());
}

#[test]
fn variable_pool_first_fit_and_exhaustion() {
    common::init();
    let pool = VariableMemoryPool::create(256).unwrap();
    assert_eq!(256, pool.pool_size());

    let a = pool.allocate(64).unwrap();
    let b = pool.allocate(100).unwrap();
    // 72 + 112 bytes reserved; another 100-byte request cannot fit.
    assert!(pool.allocate(100).is_none());
    assert!(pool.allocate(0).is_none());

    unsafe {
        pool.deallocate(Some(a));
        pool.deallocate(Some(b));
    }
    // Freed neighbors coalesce back into one region.
    let big = pool.allocate(240);
    assert!(big.is_some());
    unsafe { pool.deallocate(big) };
}

#[test]
fn variable_pool_reuses_freed_gaps() {
    common::init();
    let pool = VariableMemoryPool::create(256).unwrap();
    let a = pool.allocate(40).unwrap();
    let _b = pool.allocate(40).unwrap();

    unsafe { pool.deallocate(Some(a)) };
    // The first-fit scan lands back in the freed leading gap.
    let again = pool.allocate(40).unwrap();
    assert_eq!(a.as_ptr(), again.as_ptr());
}

#[test]
fn allocator_seams_mirror_the_pools() {
    common::init();
    let fixed = FixedAllocator::create(32, 128).unwrap();
    let block = fixed.allocate().unwrap();
    unsafe { fixed.deallocate(Some(block)) };

    let variable = VariableAllocator::create(128).unwrap();
    let chunk = variable.allocate(24).unwrap();
    unsafe { variable.deallocate(Some(chunk)) };
    assert!(variable.allocate(1024).is_none());
}
