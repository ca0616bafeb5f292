//! # Arena Stress Tool
//!
//! Drives a [`HandleArena`] through a long, deterministic mix of allocations,
//! frees and defragmentations, checking after every step that handles and
//! payloads are intact. Useful before changing arena sizes in a demo's
//! `arena.toml`.
//!
//! Usage: `arena_stress [config.toml] [--seed N] [--ops N]`
//!
//! Log level is taken from `RUST_LOG` (default `info`).

use std::process::ExitCode;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;
use vkdemo_core::{ArenaConfig, ArenaError, Handle, HandleArena};

/// Largest single request, in bytes.
const MAX_REQUEST: usize = 16 * 1024;

/// Recently freed handles kept around to probe for stale validation.
const GRAVEYARD_LEN: usize = 64;

/// Live allocations whose payload is re-checked after an ordinary step.
/// Every allocation is checked after a defragment.
const SAMPLE_LEN: usize = 4;

/// Command-line options.
struct StressOptions {
    config: ArenaConfig,
    seed: u64,
    ops: u64,
}

/// Counters reported at the end of a run.
#[derive(Default)]
struct StressReport {
    allocations: u64,
    frees: u64,
    defrags: u64,
    out_of_memory: u64,
    slots_exhausted: u64,
    peak_live_bytes: usize,
    peak_fragmented_bytes: usize,
}

/// A live allocation and the byte it was painted with.
struct Tracked {
    handle: Handle,
    tag: u8,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = match parse_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(message) => {
            tracing::error!("{message}");
            eprintln!("Usage: arena_stress [config.toml] [--seed N] [--ops N]");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        capacity = options.config.capacity,
        max_slots = options.config.max_slots,
        chunk_size = options.config.chunk_size,
        seed = options.seed,
        ops = options.ops,
        "starting arena stress run"
    );

    match run(&options) {
        Ok(report) => {
            tracing::info!(
                allocations = report.allocations,
                frees = report.frees,
                defrags = report.defrags,
                out_of_memory = report.out_of_memory,
                slots_exhausted = report.slots_exhausted,
                peak_live_bytes = report.peak_live_bytes,
                peak_fragmented_bytes = report.peak_fragmented_bytes,
                "stress run passed"
            );
            ExitCode::SUCCESS
        }
        Err(message) => {
            tracing::error!("stress run failed: {message}");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<StressOptions, String> {
    let mut config = ArenaConfig::new(8 * 1024 * 1024, 1024);
    let mut seed = 0x5EED;
    let mut ops = 100_000;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed" => {
                seed = args
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or("--seed expects an integer")?;
            }
            "--ops" => {
                ops = args
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or("--ops expects an integer")?;
            }
            path => {
                config = ArenaConfig::from_toml_file(path).map_err(|e| format!("{path}: {e}"))?;
            }
        }
    }

    Ok(StressOptions { config, seed, ops })
}

fn run(options: &StressOptions) -> Result<StressReport, String> {
    let mut arena = HandleArena::new(options.config.clone()).map_err(|e| e.to_string())?;
    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let mut live: Vec<Tracked> = Vec::new();
    let mut graveyard: Vec<Handle> = Vec::with_capacity(GRAVEYARD_LEN);
    let mut report = StressReport::default();

    for step in 0..options.ops {
        let roll = rng.gen_range(0..100u32);
        let mut compacted = false;
        if roll < 55 || live.is_empty() {
            let size = rng.gen_range(1..=MAX_REQUEST);
            let tag: u8 = rng.gen();
            match arena.allocate(size) {
                Ok(handle) => {
                    arena.with_bytes_mut(handle, |bytes| bytes.fill(tag));
                    live.push(Tracked { handle, tag });
                    report.allocations += 1;
                }
                Err(ArenaError::OutOfMemory { .. }) => {
                    report.out_of_memory += 1;
                    arena.defragment();
                    report.defrags += 1;
                    compacted = true;
                }
                Err(ArenaError::SlotsExhausted { .. }) => report.slots_exhausted += 1,
                Err(other) => return Err(format!("step {step}: {other}")),
            }
        } else if roll < 95 {
            let victim = live.swap_remove(rng.gen_range(0..live.len()));
            if !arena.free(victim.handle) {
                return Err(format!("step {step}: free rejected live {:?}", victim.handle));
            }
            if graveyard.len() == GRAVEYARD_LEN {
                graveyard.remove(0);
            }
            graveyard.push(victim.handle);
            report.frees += 1;
        } else {
            arena.defragment();
            report.defrags += 1;
            compacted = true;
            if arena.stats().fragmented_bytes() != 0 {
                return Err(format!("step {step}: fragmentation left after defragment"));
            }
        }

        let stats = arena.stats();
        report.peak_live_bytes = report.peak_live_bytes.max(stats.live_bytes);
        report.peak_fragmented_bytes = report.peak_fragmented_bytes.max(stats.fragmented_bytes());

        let checked: Vec<&Tracked> = if compacted {
            live.iter().collect()
        } else {
            (0..SAMPLE_LEN.min(live.len()))
                .map(|_| &live[rng.gen_range(0..live.len())])
                .collect()
        };
        check(&arena, live.len(), &checked, &graveyard).map_err(|e| format!("step {step}: {e}"))?;
    }

    arena.reset();
    Ok(report)
}

fn check(
    arena: &HandleArena,
    expected_live: usize,
    sample: &[&Tracked],
    graveyard: &[Handle],
) -> Result<(), String> {
    if arena.len() != expected_live {
        return Err(format!("arena reports {} live, expected {expected_live}", arena.len()));
    }
    for tracked in sample {
        let intact = arena
            .with_bytes(tracked.handle, |bytes| bytes.iter().all(|&b| b == tracked.tag))
            .ok_or_else(|| format!("live {:?} rejected", tracked.handle))?;
        if !intact {
            return Err(format!("payload of {:?} corrupted", tracked.handle));
        }
    }
    if let Some(stale) = graveyard.iter().find(|h| arena.is_valid(**h)) {
        return Err(format!("stale {stale:?} still validates"));
    }
    Ok(())
}
