//! Benchmark driver: build, probe, and tear down the index over a chosen
//! key workload, reporting throughput per phase and the node-variant
//! profile of the built tree.
//!
//! Output is CSV-ish, one line per phase: `insert,<n>,<Mops>` and so on.

#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Force jemalloc to return unused memory to the OS and get accurate allocated bytes.
fn get_allocated() -> usize {
    // Advance epoch to get fresh statistics
    tikv_jemalloc_ctl::epoch::advance().unwrap();
    // Purge unused dirty pages to get accurate measurement
    unsafe {
        let _ = tikv_jemalloc_ctl::raw::write(b"arena.0.purge\0", 0u64);
    }
    tikv_jemalloc_ctl::epoch::advance().unwrap();
    tikv_jemalloc_ctl::stats::allocated::read().unwrap()
}

use std::time::Instant;

use artbench::{generate_keys, Workload};
use clap::Parser;
use lart_rs::LearnedArt;

#[derive(Parser, Debug)]
#[command(name = "artbench")]
#[command(about = "Measure insert/lookup/erase throughput of the learned adaptive radix index")]
struct Args {
    /// Number of keys
    n: usize,

    /// Workload: 0 dense sorted, 1 dense shuffled, 2 pseudo-sparse
    #[arg(value_parser = clap::value_parser!(u8).range(0..=2))]
    mode: u8,

    /// Build with the point-insert loop instead of the bulk loader
    #[arg(long, default_value_t = false)]
    point: bool,

    /// Seed for the shuffled and pseudo-sparse workloads
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn mops(ops: usize, seconds: f64) -> f64 {
    ops as f64 / 1e6 / seconds
}

fn main() {
    let args = Args::parse();
    let workload = match Workload::from_mode(args.mode) {
        Some(workload) => workload,
        None => unreachable!("mode range is enforced by the parser"),
    };
    let keys = generate_keys(args.n, workload, args.seed);

    let allocated_before = get_allocated();
    let mut tree = LearnedArt::new();
    let start = Instant::now();
    if args.point {
        for &tid in &keys {
            tree.insert(&tid.to_be_bytes(), tid);
        }
    } else {
        tree.bulk_insert(&keys);
    }
    println!("insert,{},{:.6}", args.n, mops(args.n, start.elapsed().as_secs_f64()));

    let allocated = get_allocated().saturating_sub(allocated_before);
    println!(
        "allocated {:.1} MB ({:.1} bytes/key)",
        allocated as f64 / 1e6,
        allocated as f64 / args.n as f64
    );
    print!("{}", tree.profile());

    // Repeat lookups on small trees so the numbers stay reproducible.
    let repeat = (10_000_000 / args.n.max(1)).max(1);
    let start = Instant::now();
    for _ in 0..repeat {
        for &tid in &keys {
            let leaf = tree.lookup(&tid.to_be_bytes());
            assert_eq!(leaf, Some(tid), "lookup lost tid {tid}");
        }
    }
    println!(
        "lookup,{},{:.6}",
        args.n,
        mops(args.n * repeat, start.elapsed().as_secs_f64())
    );

    let start = Instant::now();
    for &tid in &keys {
        tree.erase(&tid.to_be_bytes());
    }
    println!("erase,{},{:.6}", args.n, mops(args.n, start.elapsed().as_secs_f64()));
    assert!(tree.is_empty(), "erase left keys behind");
}
