use ballsort_solver::engine::{replay, GoalRule, State};
use ballsort_solver::heuristics::Heuristic;
use ballsort_solver::solver::{solve, SearchConfig, SearchOutcome};
use clap::Parser;
use std::collections::HashMap;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Compare solver heuristics on seeded random puzzles")]
struct Args {
    /// Number of random puzzles to evaluate
    #[clap(long, default_value_t = 20)]
    puzzles: u64,

    /// Seed of the first puzzle; puzzle i uses seed + i
    #[clap(long, default_value_t = 0)]
    seed: u64,

    /// Number of colors per puzzle
    #[clap(long, default_value_t = 5)]
    colors: usize,

    /// Tube capacity (and balls per color)
    #[clap(long, default_value_t = 4)]
    capacity: usize,

    /// Number of extra empty tubes
    #[clap(long, default_value_t = 2)]
    empty_tubes: usize,

    /// Expansion budget per solve
    #[clap(long, default_value_t = 200_000)]
    max_expansions: usize,
}

#[derive(Default)]
struct Tally {
    solved: usize,
    unsolvable: usize,
    over_budget: usize,
    total_moves: usize,
    solved_expanded: usize,
}

impl Tally {
    fn record(&mut self, outcome: &SearchOutcome) {
        match outcome {
            SearchOutcome::Solved(solution) => {
                self.solved += 1;
                self.total_moves += solution.moves.len();
                self.solved_expanded += solution.stats.expanded;
            }
            SearchOutcome::Unsolvable(_) => self.unsolvable += 1,
            SearchOutcome::BudgetExceeded(_) => self.over_budget += 1,
        }
    }

    /// Mean solution length and mean expansions, over solved puzzles only.
    fn solved_averages(&self) -> Option<(f64, f64)> {
        if self.solved == 0 {
            return None;
        }
        let n = self.solved as f64;
        Some((self.total_moves as f64 / n, self.solved_expanded as f64 / n))
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let mut tallies: HashMap<Heuristic, Tally> = HashMap::new();

    println!("Starting heuristic evaluation for {} puzzles...", args.puzzles);

    for offset in 0..args.puzzles {
        let seed = args.seed + offset;
        let initial = match State::new_random_with_seed(
            args.colors,
            args.capacity,
            args.empty_tubes,
            seed,
        ) {
            Ok(state) => state,
            Err(e) => {
                error!("cannot generate puzzle: {}", e);
                return ExitCode::FAILURE;
            }
        };

        println!("\nPuzzle {} (Seed: {})", offset, seed);

        for heuristic in Heuristic::ALL {
            let config = SearchConfig::new()
                .with_heuristic(heuristic)
                .with_max_expansions(args.max_expansions);
            let outcome = match solve(&initial, &config) {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(heuristic = heuristic.name(), seed, "solve failed: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            let expanded = outcome.stats().expanded;

            let result = match &outcome {
                SearchOutcome::Solved(solution) => {
                    let verified = replay(&initial, &solution.moves)
                        .map(|end| end.is_goal(GoalRule::FullTubes))
                        .unwrap_or(false);
                    if !verified {
                        error!(heuristic = heuristic.name(), seed, "solution failed to replay");
                        return ExitCode::FAILURE;
                    }
                    format!("{} moves", solution.moves.len())
                }
                SearchOutcome::Unsolvable(_) => "unsolvable".to_string(),
                SearchOutcome::BudgetExceeded(_) => "over budget".to_string(),
            };
            tallies.entry(heuristic).or_default().record(&outcome);
            println!(
                "  Heuristic: {:<13}, Result: {:<12}, Expanded: {}",
                heuristic.name(),
                result,
                expanded
            );
        }
    }

    println!("\n--- Evaluation Complete ---");
    println!("Number of puzzles evaluated: {}", args.puzzles);
    println!("\n--- Averages over solved puzzles ---");

    for heuristic in Heuristic::ALL {
        let Some(tally) = tallies.get(&heuristic) else {
            continue;
        };
        let Some((avg_moves, avg_expanded)) = tally.solved_averages() else {
            println!("Heuristic {:<13}: no puzzles solved.", heuristic.name());
            continue;
        };
        println!(
            "Heuristic {:<13}: Solved = {}, Unsolvable = {}, Over budget = {}, Avg moves = {:.2}, Avg expanded = {:.1}",
            heuristic.name(),
            tally.solved,
            tally.unsolvable,
            tally.over_budget,
            avg_moves,
            avg_expanded
        );
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballsort_solver::solver::SearchStats;
    use ballsort_solver::utils::state_from_str_array;

    #[test]
    fn test_averages_skip_unsolved_puzzles() {
        let mut tally = Tally::default();
        assert_eq!(tally.solved_averages(), None);

        let solvable = state_from_str_array(4, &["RRBB", "BBRR", "", ""]).unwrap();
        let config = SearchConfig::new().with_heuristic(Heuristic::Zero);
        let solved = solve(&solvable, &config).unwrap();
        let (moves, expanded) = {
            let solution = solved.solution().unwrap();
            (solution.moves.len(), solution.stats.expanded)
        };
        tally.record(&solved);

        let over_budget = SearchStats {
            expanded: 1_000,
            ..SearchStats::default()
        };
        tally.record(&SearchOutcome::BudgetExceeded(over_budget));
        tally.record(&SearchOutcome::Unsolvable(over_budget));

        assert_eq!(tally.solved, 1);
        assert_eq!(tally.over_budget, 1);
        assert_eq!(tally.unsolvable, 1);
        assert_eq!(
            tally.solved_averages(),
            Some((moves as f64, expanded as f64))
        );
    }
}
