use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use agent_arena::{
    neural::UnavailableEvaluator,
    prelude::*,
    strategy::{BiasedRandom, BudgetedRollout, PrunedSearch},
};
use common::{init_test_logger, mixed_moves, percentile};

mod common;

fn all_strategies(personality: Personality) -> Vec<DecisionStrategy> {
    let hard = AgentConfig::for_agent(Difficulty::Hard, personality, 5.0);
    vec![
        DecisionStrategy::for_agent(
            Difficulty::Easy,
            &AgentConfig::for_agent(Difficulty::Easy, personality, 5.0),
            None,
        ),
        DecisionStrategy::for_agent(
            Difficulty::Medium,
            &AgentConfig::for_agent(Difficulty::Medium, personality, 5.0),
            None,
        ),
        DecisionStrategy::for_agent(Difficulty::Hard, &hard, None),
        DecisionStrategy::for_agent(Difficulty::Hard, &hard, Some(Arc::new(UnavailableEvaluator))),
    ]
}

#[test]
fn selected_move_is_always_legal() {
    init_test_logger();
    let mut generator = ScenarioGenerator::new(2024, 12);

    for personality in Personality::ALL {
        let mut strategies = all_strategies(personality);
        let names: Vec<_> = strategies.iter().map(DecisionStrategy::name).collect();
        assert_eq!(
            names,
            ["biased-random", "pruned-search", "budgeted-rollout", "hybrid-evaluator"]
        );

        for trial in 0..1000 / Personality::ALL.len() + 1 {
            let side = if trial % 2 == 0 { Side::One } else { Side::Two };
            let scenario = generator.generate(side);
            for strategy in strategies.iter_mut() {
                let deadline = Instant::now() + Duration::from_millis(100);
                let chosen = strategy.select_move(
                    &scenario.position,
                    side,
                    &scenario.legal_moves,
                    deadline,
                );
                match chosen {
                    Some(mv) => assert!(
                        scenario.legal_moves.contains(&mv),
                        "{strategy:?} returned {mv} outside the legal list"
                    ),
                    None => assert!(scenario.legal_moves.is_empty()),
                }
            }
        }
    }
}

#[test]
fn empty_move_list_yields_none() {
    for mut strategy in all_strategies(Personality::Balanced) {
        let deadline = Instant::now() + Duration::from_millis(100);
        assert_eq!(
            strategy.select_move(&Position::new(), Side::One, &[], deadline),
            None,
            "{strategy:?}"
        );
    }
}

#[test]
fn balanced_capture_rate_matches_personality() {
    let moves = mixed_moves(5, 5);
    let mut strategy =
        DecisionStrategy::BiasedRandom(BiasedRandom::with_seed(Personality::Balanced, 7));
    let position = Position::new();

    let trials = 500;
    let captures = (0..trials)
        .filter_map(|_| {
            let deadline = Instant::now() + Duration::from_millis(50);
            strategy.select_move(&position, Side::One, &moves, deadline)
        })
        .filter(|mv| mv.is_capture)
        .count();

    let rate = captures as f32 / trials as f32;
    assert!((0.60..=0.80).contains(&rate), "capture rate {rate}");
}

#[test]
fn aggressive_agents_capture_more_than_defensive_ones() {
    let moves = mixed_moves(5, 5);
    let position = Position::new();
    let rate = |personality| {
        let mut strategy =
            DecisionStrategy::BiasedRandom(BiasedRandom::with_seed(personality, 99));
        (0..1000)
            .filter_map(|_| {
                strategy.select_move(&position, Side::One, &moves, Instant::now())
            })
            .filter(|mv| mv.is_capture)
            .count()
    };
    assert!(rate(Personality::Aggressive) > rate(Personality::Defensive));
}

fn latencies(mut strategy: DecisionStrategy, max_ms: u64) -> Vec<f32> {
    let mut generator = ScenarioGenerator::new(31, 16);
    (0..100)
        .map(|i| {
            let side = if i % 2 == 0 { Side::One } else { Side::Two };
            let scenario = generator.generate_with_moves(side, 10);
            let start = Instant::now();
            let chosen = strategy.select_move(
                &scenario.position,
                side,
                &scenario.legal_moves,
                start + Duration::from_millis(max_ms),
            );
            let elapsed = start.elapsed().as_secs_f32() * 1000.0;
            assert!(chosen.is_some());
            elapsed
        })
        .collect()
}

fn under(data: &[f32], limit_ms: f32) -> usize {
    data.iter().filter(|l| **l < limit_ms).count()
}

#[test]
fn pruned_search_stays_within_budget() {
    init_test_logger();
    let config = AgentConfig::for_agent(Difficulty::Medium, Personality::Balanced, 5.0);
    let data = latencies(DecisionStrategy::PrunedSearch(PrunedSearch::new(&config)), 90);

    assert!(under(&data, 90.0) >= 99, "{data:?}");
    assert!(percentile(&data, 50) < 50.0);
}

#[test]
fn budgeted_rollout_stays_within_budget() {
    init_test_logger();
    let config = AgentConfig::for_agent(Difficulty::Hard, Personality::Aggressive, 5.0);
    let data = latencies(
        DecisionStrategy::BudgetedRollout(BudgetedRollout::new(&config)),
        100,
    );

    assert!(under(&data, 100.0) >= 99, "{data:?}");
    assert!(percentile(&data, 50) < 90.0);
}

#[test]
fn expired_deadline_still_returns_a_candidate() {
    let mut generator = ScenarioGenerator::new(8, 10);
    let scenario = generator.generate_with_moves(Side::One, 10);
    let past = Instant::now();
    std::thread::sleep(Duration::from_millis(2));

    for mut strategy in all_strategies(Personality::Defensive) {
        let chosen = strategy
            .select_move(&scenario.position, Side::One, &scenario.legal_moves, past)
            .unwrap();
        assert!(scenario.legal_moves.contains(&chosen), "{strategy:?}");
    }
}
