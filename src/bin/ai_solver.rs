use ballsort_solver::engine::GoalRule;
use ballsort_solver::heuristics::Heuristic;
use ballsort_solver::solver::{solve, SearchConfig, SearchOutcome};
use ballsort_solver::utils::{
    format_outcome, read_problems, render_replay, Problem, PROBLEM_SEPARATOR,
};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const FILE_FORMAT_HELP: &str = "\
When specifying problems in FILE, problems are split by a line starting with a hyphen,
and a line starting with a hash sign is a comment. Example FILE:

    # Problem 1
    # Four tubes of capacity 4; the last two start empty.
    4 [RRBB
    4 [BBRR
    4 [
    4 [

    ---

    # Problem 2
    2 [AB
    2 [BA
    2 [

Balls are listed from the bottom to the top of a tube, so `[ABC` has `C` on top. Every
tube of one problem must share the same numeric capacity.

Tube indices start at 0. `X->Y` in the answer means pour the top run of tube X into
tube Y. Answers are split by `---`. `<no solution>` means no sequence exists;
`<no solution within budget>` means the search stopped at a limit first.";

#[derive(Parser, Debug)]
#[clap(author, version, about = "Ball sort puzzle solver", after_long_help = FILE_FORMAT_HELP)]
struct Args {
    /// Path to the problem FILE, or `-` to read from stdin
    #[clap(value_name = "FILE")]
    problems: String,

    /// Which boards count as sorted
    #[clap(long, value_enum, default_value_t = GoalRule::FullTubes)]
    goal: GoalRule,

    /// Remaining-cost estimate used to order the search
    #[clap(long, value_enum, default_value_t = Heuristic::Diversity)]
    heuristic: Heuristic,

    /// Stop after expanding this many search nodes
    #[clap(long)]
    max_expansions: Option<usize>,

    /// Ignore solutions longer than this many pours
    #[clap(long)]
    max_depth: Option<u32>,

    /// Print the board after every pour
    #[clap(long)]
    show_states: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn search_config(&self) -> SearchConfig {
        let mut config = SearchConfig::new()
            .with_goal(self.goal)
            .with_heuristic(self.heuristic);
        config.budget.max_expansions = self.max_expansions;
        config.budget.max_depth = self.max_depth;
        config
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load(path: &str) -> Result<Vec<Problem>, ballsort_solver::LoadError> {
    if path == "-" {
        read_problems(io::stdin().lock())
    } else {
        read_problems(File::open(PathBuf::from(path))?)
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let problems = load(&args.problems)?;
    let config = args.search_config();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for problem in &problems {
        info!(problem = problem.number, line = problem.line, "solving");
        let outcome = solve(&problem.state, &config)?;
        if args.show_states {
            if let SearchOutcome::Solved(solution) = &outcome {
                writeln!(
                    out,
                    "{}",
                    render_replay(&problem.state, &solution.moves, &problem.palette)?
                )?;
            }
        }
        let text = format_outcome(&outcome);
        if !text.is_empty() {
            writeln!(out, "{}", text)?;
        }
        writeln!(out, "{}", PROBLEM_SEPARATOR)?;
        out.flush()?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(io_err) = e.downcast_ref::<io::Error>() {
                if io_err.kind() == io::ErrorKind::BrokenPipe {
                    return ExitCode::SUCCESS;
                }
            }
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
