use crate::engine::{BallCounts, GoalRule, Move, State};
use crate::error::{Result, SolverError};
use crate::heuristics::Heuristic;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use tracing::{debug, info, trace};

/// How often (in expansions) progress is logged at debug level.
const PROGRESS_INTERVAL: usize = 10_000;

/// Optional limits that stop a search before it finishes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchBudget {
    /// Maximum number of node expansions.
    pub max_expansions: Option<usize>,
    /// Maximum number of pours in a solution. Deeper successors are not explored.
    pub max_depth: Option<u32>,
}

/// Everything a single solve needs to know besides the initial state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchConfig {
    pub goal: GoalRule,
    pub heuristic: Heuristic,
    pub budget: SearchBudget,
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_goal(mut self, goal: GoalRule) -> Self {
        self.goal = goal;
        self
    }

    pub fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn with_max_expansions(mut self, limit: usize) -> Self {
        self.budget.max_expansions = Some(limit);
        self
    }

    pub fn with_max_depth(mut self, limit: u32) -> Self {
        self.budget.max_depth = Some(limit);
        self
    }
}

/// Counters collected during one search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Nodes taken off the frontier and expanded.
    pub expanded: usize,
    /// Successor nodes pushed onto the frontier.
    pub generated: usize,
    /// Frontier entries discarded because a cheaper copy had been queued or expanded.
    pub stale_skipped: usize,
    /// Largest frontier size observed.
    pub max_frontier: usize,
    /// Expansions of a state that had already been expanded at a higher `g`.
    pub reopened: usize,
}

/// Represents a solution found by the solver.
#[derive(Clone, Debug)]
pub struct Solution {
    /// Pours to apply to the initial state, in order.
    pub moves: Vec<Move>,
    /// The goal state reached after applying `moves`.
    pub final_state: State,
    pub stats: SearchStats,
    /// `true` only when the heuristic is admissible, so no shorter solution exists.
    pub proven_optimal: bool,
}

/// Result of a completed search. None of these outcomes is an error.
#[derive(Clone, Debug)]
pub enum SearchOutcome {
    Solved(Solution),
    /// Every reachable state was expanded without finding a goal.
    Unsolvable(SearchStats),
    /// A budget limit stopped the search; whether a solution exists is unknown.
    BudgetExceeded(SearchStats),
}

impl SearchOutcome {
    pub fn is_solved(&self) -> bool {
        matches!(self, SearchOutcome::Solved(_))
    }

    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SearchOutcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn stats(&self) -> &SearchStats {
        match self {
            SearchOutcome::Solved(solution) => &solution.stats,
            SearchOutcome::Unsolvable(stats) | SearchOutcome::BudgetExceeded(stats) => stats,
        }
    }
}

/// One discovered state. Nodes live in an arena and point at their parent by index.
#[derive(Debug)]
struct SearchNode {
    state: State,
    g: u32,
    h: u32,
    parent: Option<usize>,
    mv: Option<Move>,
}

/// Frontier entry. Ordered so that the max-heap pops the lowest `f`, then the lowest `h`,
/// then the earliest insertion.
#[derive(Debug, PartialEq, Eq)]
struct FrontierEntry {
    f: u32,
    h: u32,
    seq: usize,
    node: usize,
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        Reverse((self.f, self.h, self.seq)).cmp(&Reverse((other.f, other.h, other.seq)))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Search state owned by exactly one call to [`solve`].
struct Search<'a> {
    config: &'a SearchConfig,
    nodes: Vec<SearchNode>,
    frontier: BinaryHeap<FrontierEntry>,
    best_g: HashMap<State, u32>,
    closed: HashMap<State, u32>,
    stats: SearchStats,
    depth_pruned: bool,
}

impl<'a> Search<'a> {
    fn new(config: &'a SearchConfig) -> Self {
        Search {
            config,
            nodes: Vec::new(),
            frontier: BinaryHeap::new(),
            best_g: HashMap::new(),
            closed: HashMap::new(),
            stats: SearchStats::default(),
            depth_pruned: false,
        }
    }

    fn push(&mut self, state: State, g: u32, parent: Option<usize>, mv: Option<Move>) {
        let h = self.config.heuristic.estimate(&state);
        let node = self.nodes.len();
        self.best_g.insert(state.clone(), g);
        self.nodes.push(SearchNode {
            state,
            g,
            h,
            parent,
            mv,
        });
        self.frontier.push(FrontierEntry {
            f: g + h,
            h,
            seq: node,
            node,
        });
        self.stats.max_frontier = self.stats.max_frontier.max(self.frontier.len());
    }

    /// Walks parent indices from `goal` back to the root.
    fn reconstruct(&self, goal: usize) -> Vec<Move> {
        let mut moves = Vec::new();
        let mut cursor = Some(goal);
        while let Some(index) = cursor {
            let node = &self.nodes[index];
            if let Some(mv) = node.mv {
                moves.push(mv);
            }
            cursor = node.parent;
        }
        moves.reverse();
        moves
    }

    fn run(&mut self, initial: &State) -> Result<SearchOutcome> {
        let conserved = initial.ball_counts();
        self.push(initial.clone(), 0, None, None);

        while let Some(entry) = self.frontier.pop() {
            let index = entry.node;
            let g = self.nodes[index].g;

            if self.nodes[index].state.is_goal(self.config.goal) {
                let moves = self.reconstruct(index);
                debug_assert_eq!(moves.len(), g as usize);
                return Ok(SearchOutcome::Solved(Solution {
                    moves,
                    final_state: self.nodes[index].state.clone(),
                    stats: self.stats,
                    proven_optimal: self.config.heuristic.is_admissible(),
                }));
            }

            let state = &self.nodes[index].state;
            let superseded = self.best_g.get(state).is_some_and(|&best| best < g);
            let already_closed = self.closed.get(state).is_some_and(|&closed_g| closed_g <= g);
            if superseded || already_closed {
                self.stats.stale_skipped += 1;
                continue;
            }

            if self
                .config
                .budget
                .max_expansions
                .is_some_and(|limit| self.stats.expanded >= limit)
            {
                return Ok(SearchOutcome::BudgetExceeded(self.stats));
            }

            if let Some(previous) = self.closed.insert(state.clone(), g) {
                self.stats.reopened += 1;
                trace!(node = index, previous, g, "reopening");
            }
            self.stats.expanded += 1;
            if self.stats.expanded % PROGRESS_INTERVAL == 0 {
                debug!(
                    expanded = self.stats.expanded,
                    frontier = self.frontier.len(),
                    g,
                    f = entry.f,
                    "search progress"
                );
            }
            trace!(node = index, g, h = self.nodes[index].h, "expanding\n{}", state);

            let successors = state.generate_moves();
            for successor in successors {
                check_successor(
                    &self.nodes[index].state,
                    &successor.state,
                    successor.mv,
                    &conserved,
                )?;

                let next_g = g + successor.cost;
                if self
                    .best_g
                    .get(&successor.state)
                    .is_some_and(|&best| best <= next_g)
                {
                    continue;
                }
                // Only unseen or cheaper states count as cut off by the depth limit.
                if self.config.budget.max_depth.is_some_and(|limit| next_g > limit) {
                    self.depth_pruned = true;
                    continue;
                }
                self.push(successor.state, next_g, Some(index), Some(successor.mv));
                self.stats.generated += 1;
            }
        }

        if self.depth_pruned {
            Ok(SearchOutcome::BudgetExceeded(self.stats))
        } else {
            Ok(SearchOutcome::Unsolvable(self.stats))
        }
    }
}

/// Verifies that a successor kept every ball and respected tube capacity.
fn check_successor(
    parent: &State,
    child: &State,
    mv: Move,
    conserved: &BallCounts,
) -> Result<()> {
    if child.ball_counts() != *conserved {
        return Err(SolverError::InvariantViolation {
            detail: "ball counts changed".to_string(),
            state: Box::new(parent.clone()),
            mv,
        });
    }
    if let Err(e) = child.validate() {
        return Err(SolverError::InvariantViolation {
            detail: e.to_string(),
            state: Box::new(parent.clone()),
            mv,
        });
    }
    Ok(())
}

/// Finds a short sequence of pours that turns `initial` into a goal state.
///
/// Runs A* ordered by `f = g + h`, breaking ties by lower `h` and then by discovery order.
/// All search bookkeeping is local to this call, so independent puzzles can be solved on
/// separate threads.
///
/// # Returns
/// * `Ok(SearchOutcome::Solved)` with the move list when a goal is reached.
/// * `Ok(SearchOutcome::Unsolvable)` when the reachable state space holds no goal.
/// * `Ok(SearchOutcome::BudgetExceeded)` when a configured limit stopped the search.
/// * `Err(SolverError::InvalidState)` if `initial` is malformed.
/// * `Err(SolverError::InvariantViolation)` if move generation broke ball conservation.
///
/// # Examples
/// ```
/// use ballsort_solver::engine::{replay, GoalRule};
/// use ballsort_solver::solver::{solve, SearchConfig};
/// use ballsort_solver::utils::state_from_str_array;
///
/// let state = state_from_str_array(4, &["RRBB", "BBRR", "", ""]).unwrap();
/// let outcome = solve(&state, &SearchConfig::default()).unwrap();
/// let solution = outcome.solution().unwrap();
/// let end = replay(&state, &solution.moves).unwrap();
/// assert!(end.is_goal(GoalRule::FullTubes));
/// ```
pub fn solve(initial: &State, config: &SearchConfig) -> Result<SearchOutcome> {
    initial.validate()?;
    info!(
        tubes = initial.num_tubes(),
        capacity = initial.capacity(),
        goal = ?config.goal,
        heuristic = config.heuristic.name(),
        "starting search"
    );

    let mut search = Search::new(config);
    let outcome = search.run(initial)?;

    let stats = outcome.stats();
    match &outcome {
        SearchOutcome::Solved(solution) => info!(
            moves = solution.moves.len(),
            expanded = stats.expanded,
            generated = stats.generated,
            "solution found"
        ),
        SearchOutcome::Unsolvable(_) => info!(
            expanded = stats.expanded,
            "state space exhausted without reaching a goal"
        ),
        SearchOutcome::BudgetExceeded(_) => info!(
            expanded = stats.expanded,
            "search budget exceeded"
        ),
    }
    Ok(outcome)
}
