//! End-to-end checks: problem text in, move list out, moves replayed to a goal.

use ballsort_solver::engine::{replay, GoalRule, State};
use ballsort_solver::heuristics::Heuristic;
use ballsort_solver::solver::{solve, SearchConfig, SearchOutcome};
use ballsort_solver::utils::{format_outcome, parse_problems, NO_SOLUTION};

const PROBLEM_SET: &str = "\
# two colors, two spare tubes
4 [RRBB
4 [BBRR
4 [
4 [
---
# no spare tube to stage a swap
2 [RG
2 [GR
---
# seven tubes, five colors
4 [PGYB
4 [PPBG
4 [
4 [BYRY
4 [YRRB
4 [GGRP
4 [
";

#[test]
fn solves_every_problem_in_a_set() {
    let problems = parse_problems(PROBLEM_SET).unwrap();
    assert_eq!(problems.len(), 3);

    let config = SearchConfig::default();
    let outcomes: Vec<SearchOutcome> = problems
        .iter()
        .map(|p| solve(&p.state, &config).unwrap())
        .collect();

    for (problem, outcome) in problems.iter().zip(&outcomes) {
        let counts = problem.state.ball_counts();
        if let SearchOutcome::Solved(solution) = outcome {
            assert!(!solution.moves.is_empty());
            let end = replay(&problem.state, &solution.moves).unwrap();
            assert!(end.is_goal(GoalRule::FullTubes));
            assert_eq!(end.ball_counts(), counts);
        }
    }

    assert!(outcomes[0].is_solved());
    assert_eq!(format_outcome(&outcomes[1]), NO_SOLUTION);
    assert!(outcomes[2].is_solved());
}

#[test]
fn every_intermediate_state_conserves_balls_and_capacity() {
    let problems = parse_problems(PROBLEM_SET).unwrap();
    let problem = &problems[2];
    let outcome = solve(&problem.state, &SearchConfig::default()).unwrap();
    let solution = outcome.solution().expect("seven-tube problem should be solvable");

    let counts = problem.state.ball_counts();
    let mut current = problem.state.clone();
    for mv in &solution.moves {
        current = replay(&current, std::slice::from_ref(mv)).unwrap();
        assert_eq!(current.ball_counts(), counts);
        assert!(current
            .tubes()
            .iter()
            .all(|t| t.len() <= current.capacity()));
    }
    assert_eq!(current, solution.final_state);
}

#[test]
fn node_budget_reports_budget_exceeded_not_unsolvable() {
    let problems = parse_problems(PROBLEM_SET).unwrap();
    let config = SearchConfig::new().with_max_expansions(1);
    let outcome = solve(&problems[0].state, &config).unwrap();
    assert!(matches!(outcome, SearchOutcome::BudgetExceeded(_)));
}

#[test]
fn all_heuristics_agree_on_solvability() {
    for seed in 10..14 {
        let state = State::new_random_with_seed(3, 3, 2, seed).unwrap();
        let results: Vec<bool> = Heuristic::ALL
            .iter()
            .map(|&h| {
                let config = SearchConfig::new().with_heuristic(h);
                solve(&state, &config).unwrap().is_solved()
            })
            .collect();
        assert!(
            results.iter().all(|&r| r == results[0]),
            "seed {}: {:?}",
            seed,
            results
        );
    }
}

#[test]
fn uniform_cost_is_never_longer_than_informed_search() {
    for seed in 0..4 {
        let state = State::new_random_with_seed(3, 3, 2, seed).unwrap();
        let optimal = solve(&state, &SearchConfig::new().with_heuristic(Heuristic::Zero)).unwrap();
        let informed = solve(&state, &SearchConfig::default()).unwrap();
        match (optimal.solution(), informed.solution()) {
            (Some(best), Some(other)) => {
                assert!(best.proven_optimal);
                assert!(best.moves.len() <= other.moves.len());
            }
            (None, None) => {}
            (a, b) => panic!(
                "solvability mismatch for seed {}: {:?} vs {:?}",
                seed,
                a.is_some(),
                b.is_some()
            ),
        }
    }
}
