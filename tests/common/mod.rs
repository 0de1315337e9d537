#![allow(dead_code)]

use std::sync::Arc;

use agent_arena::prelude::*;
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, Layer, Registry};

/// Installs a test-friendly subscriber once per test binary. Later calls are no-ops.
pub fn init_test_logger() {
    let format = fmt::format()
        .without_time()
        .with_ansi(true)
        .with_level(true)
        .with_thread_names(true)
        .with_target(false);

    let reg = Registry::default().with(
        fmt::layer()
            .event_format(format)
            .with_test_writer()
            .with_filter(LevelFilter::WARN),
    );

    let _ = tracing::subscriber::set_global_default(reg);
}

/// Small engine settings: few idle agents, quiet output.
pub fn test_config() -> AIConfig {
    AIConfig::new()
        .with_agent_pool_size(3)
        .with_max_concurrent_workers(4)
        .with_verbose(false)
}

pub fn coordinator() -> MatchCoordinator {
    MatchCoordinator::new(Arc::new(AgentPool::new(&test_config())))
}

/// `captures` capture moves followed by `quiet` quiet moves, all from distinct squares.
pub fn mixed_moves(captures: usize, quiet: usize) -> Vec<Move> {
    (0..captures + quiet)
        .map(|i| {
            let from = Coordinate::new((i / 9) as u8 % 8, (i % 9) as u8);
            let to = Coordinate::new(from.row + 1, from.col);
            if i < captures {
                Move::capture(PieceKind::Sergeant, from, to, PieceKind::Private)
            } else {
                Move::quiet(PieceKind::Sergeant, from, to)
            }
        })
        .collect()
}

/// Nearest-rank percentile of unsorted data.
pub fn percentile(data: &[f32], percent: usize) -> f32 {
    let mut sorted = data.to_vec();
    sorted.sort_by(f32::total_cmp);
    let rank = (percent * sorted.len()).div_ceil(100);
    sorted[rank.clamp(1, sorted.len()) - 1]
}
