//! Randomized allocate/free interleavings
//!
//! Every step is followed by a full check of the block table invariants.

use buddy_fit_sim::{BlockId, FitStrategy, Memory, SimError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SEEDS: [u64; 4] = [42, 7, 1234, 0xdead_beef];

/// Panics if the table does not tile `[0, capacity)` with valid buddy blocks.
fn check_invariants(memory: &Memory) {
    let blocks: Vec<_> = memory.list_blocks().collect();
    assert!(!blocks.is_empty());

    let mut expected_start = 0;
    for block in &blocks {
        assert_eq!(block.start, expected_start, "gap or overlap at {}", block);
        assert!(block.size.is_power_of_two(), "bad size {}", block);
        assert_eq!(block.start % block.size, 0, "misaligned {}", block);
        expected_start = block.end();

        match (block.id(), block.requested_size()) {
            (Some(_), Some(requested)) => {
                assert!(requested <= block.size, "{}", block);
                assert!(block.size < 2 * requested, "over-rounded {}", block);
            }
            (None, None) => {}
            _ => panic!("half-initialized block {:?}", block),
        }
    }
    assert_eq!(expected_start, memory.capacity());

    for (i, a) in blocks.iter().enumerate() {
        for b in &blocks[i + 1..] {
            assert!(
                !(a.is_free() && b.is_free() && a.is_buddy_of(b)),
                "unmerged buddies {} and {}",
                a,
                b
            );
        }
    }

    let stats = memory.stats();
    assert_eq!(stats.used_bytes + stats.free_bytes, memory.capacity());
    assert_eq!(
        stats.hole_count,
        blocks.iter().filter(|block| block.is_free()).count()
    );
}

fn run_random_ops(seed: u64, capacity: usize, steps: usize, max_size: usize) {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut memory = Memory::new(capacity).unwrap();
    let mut live: Vec<BlockId> = Vec::new();

    for _ in 0..steps {
        if live.is_empty() || rng.random_bool(0.6) {
            let size = rng.random_range(1..=max_size);
            let strategy = FitStrategy::ALL[rng.random_range(0..FitStrategy::ALL.len())];
            let before = memory.block_count();
            match memory.allocate(size, strategy) {
                Ok(id) => {
                    assert!(!live.contains(&id), "id {} reused", id);
                    live.push(id);
                }
                Err(SimError::OutOfMemory { requested }) => {
                    assert_eq!(requested, size);
                    assert_eq!(memory.block_count(), before);
                }
                Err(err) => panic!("unexpected error {}", err),
            }
        } else {
            let victim = live.swap_remove(rng.random_range(0..live.len()));
            if rng.random_bool(0.5) {
                memory.free_by_id(victim).unwrap();
            } else {
                let start = memory.block(victim).unwrap().start;
                let freed = memory.free_by_address(start).unwrap();
                assert_eq!(freed.id(), Some(victim));
            }
        }
        check_invariants(&memory);
    }

    for id in live.drain(..) {
        memory.free_by_id(id).unwrap();
        check_invariants(&memory);
    }
    assert_eq!(memory.block_count(), 1);
    assert_eq!(memory.stats().free_bytes, memory.capacity());
}

#[test]
fn test_stress_small_requests() {
    for seed in SEEDS {
        run_random_ops(seed, 200, 500, 30);
    }
}

#[test]
fn test_stress_wide_requests() {
    for seed in SEEDS {
        run_random_ops(seed, 4096, 2000, 1024);
    }
}

#[test]
fn test_stress_near_capacity() {
    for seed in SEEDS {
        run_random_ops(seed, 64, 300, 64);
    }
}
