//! Core puzzle engine for the ball sort puzzle.
//!
//! This module defines the puzzle's fundamental components:
//! - `Color`: An integer-coded ball color with a fixed valid range.
//! - `Tube`: A capacity-limited stack of balls, listed bottom to top.
//! - `State`: The whole board at one point in time, plus the goal test and the pour rules.
//! - `Move`: One pour, as recorded by the move generator and replayed by callers.
use crate::error::{Result, SolverError};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt;

/// Number of distinct colors a single puzzle may use.
pub const MAX_COLORS: usize = 32;

/// Number of tubes a single puzzle may contain.
pub const MAX_TUBES: usize = 64;

/// Cost of every pour. Path cost `g` therefore equals the number of pours taken.
pub const MOVE_COST: u32 = 1;

/// A ball color, stored as an id in `0..MAX_COLORS`.
///
/// Colors carry no meaning beyond identity. The loader maps the symbols of a problem file
/// onto ids, and `to_char` gives a canonical single-letter rendering for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color(u8);

impl Color {
    /// Creates a color from its id, or `None` when the id is out of range.
    ///
    /// # Examples
    /// ```
    /// use ballsort_solver::engine::{Color, MAX_COLORS};
    /// assert!(Color::new(0).is_some());
    /// assert!(Color::new(MAX_COLORS as u8).is_none());
    /// ```
    pub fn new(id: u8) -> Option<Self> {
        if (id as usize) < MAX_COLORS {
            Some(Color(id))
        } else {
            None
        }
    }

    /// Returns the numeric id of the color.
    pub fn id(self) -> usize {
        self.0 as usize
    }

    /// Converts the color to its canonical character: `A`..`Z`, then `a`..`f`.
    ///
    /// # Examples
    /// ```
    /// use ballsort_solver::engine::Color;
    /// assert_eq!(Color::from_char('R').unwrap().to_char(), 'R');
    /// assert_eq!(Color::new(26).unwrap().to_char(), 'a');
    /// ```
    pub fn to_char(self) -> char {
        if self.0 < 26 {
            (b'A' + self.0) as char
        } else {
            (b'a' + (self.0 - 26)) as char
        }
    }

    /// Inverse of `to_char`. Any other character yields `None`.
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            'A'..='Z' => Color::new(ch as u8 - b'A'),
            'a'..='z' => Color::new(ch as u8 - b'a' + 26),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// A tube of balls, listed from the bottom to the top.
///
/// Tubes do not know their own capacity; that is shared by every tube of a `State`.
/// Balls are only ever added to or removed from the top.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Tube {
    balls: Vec<Color>,
}

impl Tube {
    /// Creates an empty tube.
    pub fn new() -> Self {
        Tube { balls: Vec::new() }
    }

    /// Creates a tube holding `balls`, bottom first.
    pub fn from_balls(balls: Vec<Color>) -> Self {
        Tube { balls }
    }

    /// Returns the balls in the tube, bottom first.
    pub fn balls(&self) -> &[Color] {
        &self.balls
    }

    pub fn len(&self) -> usize {
        self.balls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balls.is_empty()
    }

    /// Returns the color of the topmost ball, if any.
    pub fn top(&self) -> Option<Color> {
        self.balls.last().copied()
    }

    /// Returns the top color and the length of the contiguous run of that color at the top.
    ///
    /// # Examples
    /// ```
    /// use ballsort_solver::engine::{Color, Tube};
    /// let r = Color::from_char('R').unwrap();
    /// let b = Color::from_char('B').unwrap();
    /// let tube = Tube::from_balls(vec![b, r, r]);
    /// assert_eq!(tube.top_run(), Some((r, 2)));
    /// assert_eq!(Tube::new().top_run(), None);
    /// ```
    pub fn top_run(&self) -> Option<(Color, usize)> {
        let top = self.top()?;
        let run = self.balls.iter().rev().take_while(|&&c| c == top).count();
        Some((top, run))
    }

    /// Returns `true` if all balls share one color. An empty tube is trivially monochromatic.
    pub fn is_monochrome(&self) -> bool {
        match self.balls.first() {
            Some(&first) => self.balls.iter().all(|&c| c == first),
            None => true,
        }
    }

    /// Counts the distinct colors present in the tube.
    pub fn distinct_colors(&self) -> usize {
        self.color_mask().count_ones() as usize
    }

    /// Bit `i` is set when color id `i` appears in the tube.
    pub(crate) fn color_mask(&self) -> u32 {
        self.balls.iter().fold(0u32, |mask, c| mask | (1 << c.id()))
    }

    fn push_run(&mut self, color: Color, count: usize) {
        self.balls.extend(std::iter::repeat(color).take(count));
    }

    fn pop_run(&mut self, count: usize) {
        let keep = self.balls.len() - count;
        self.balls.truncate(keep);
    }
}

/// Selects which boards count as solved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum GoalRule {
    /// Every tube is empty, or full and monochromatic.
    #[default]
    FullTubes,
    /// Every non-empty tube is monochromatic and, for each color, at most one of the tubes
    /// holding it is below capacity. Accepts colors too short to ever fill a tube.
    Consolidated,
}

/// One pour from tube `from` into tube `to`.
///
/// `color` and `count` describe what was transferred: the maximal run of `color` on top of
/// `from` that fit into the free space of `to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: usize,
    pub to: usize,
    pub color: Color,
    pub count: usize,
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// A legal move together with the state it produces and its step cost.
#[derive(Clone, Debug)]
pub struct Successor {
    pub mv: Move,
    pub state: State,
    pub cost: u32,
}

/// Per-color ball counts, indexed by color id.
pub type BallCounts = [usize; MAX_COLORS];

/// A snapshot of every tube on the board.
///
/// Two states are equal iff their tubes are equal index by index; tube order is part of
/// the identity because moves refer to tubes by index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct State {
    capacity: usize,
    tubes: Vec<Tube>,
}

impl State {
    /// Creates a validated state.
    ///
    /// # Arguments
    /// * `capacity`: Maximum number of balls per tube, shared by all tubes.
    /// * `tubes`: The tubes, index 0 first.
    ///
    /// # Returns
    /// * `Ok(State)` when the capacity is positive, there are between 1 and `MAX_TUBES`
    ///   tubes, and no tube holds more than `capacity` balls.
    /// * `Err(SolverError::InvalidState)` otherwise.
    ///
    /// # Examples
    /// ```
    /// use ballsort_solver::engine::{State, Tube};
    /// assert!(State::new(4, vec![Tube::new(), Tube::new()]).is_ok());
    /// assert!(State::new(0, vec![Tube::new()]).is_err());
    /// assert!(State::new(4, Vec::new()).is_err());
    /// ```
    pub fn new(capacity: usize, tubes: Vec<Tube>) -> Result<Self> {
        let state = State { capacity, tubes };
        state.validate()?;
        Ok(state)
    }

    /// Checks the structural invariants of the state.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(SolverError::InvalidState(
                "tube capacity must be positive".to_string(),
            ));
        }
        if self.tubes.is_empty() || self.tubes.len() > MAX_TUBES {
            return Err(SolverError::InvalidState(format!(
                "expected between 1 and {} tubes, found {}",
                MAX_TUBES,
                self.tubes.len()
            )));
        }
        for (i, tube) in self.tubes.iter().enumerate() {
            if tube.len() > self.capacity {
                return Err(SolverError::InvalidState(format!(
                    "tube {} holds {} balls but capacity is {}",
                    i,
                    tube.len(),
                    self.capacity
                )));
            }
        }
        Ok(())
    }

    /// Builds a shuffled, reproducible puzzle.
    ///
    /// Each of the `num_colors` colors gets exactly `capacity` balls. The balls are shuffled
    /// with a `SmallRng` seeded from `seed`, poured into `num_colors` full tubes, and
    /// `empty_tubes` empty tubes are appended. The same arguments always yield the same state.
    ///
    /// # Returns
    /// `Err(SolverError::InvalidState)` if `num_colors` is zero or exceeds `MAX_COLORS`, or
    /// if the tube count exceeds `MAX_TUBES`.
    pub fn new_random_with_seed(
        num_colors: usize,
        capacity: usize,
        empty_tubes: usize,
        seed: u64,
    ) -> Result<Self> {
        if num_colors == 0 || num_colors > MAX_COLORS {
            return Err(SolverError::InvalidState(format!(
                "expected between 1 and {} colors, found {}",
                MAX_COLORS, num_colors
            )));
        }
        let mut balls: Vec<Color> = (0..num_colors as u8)
            .flat_map(|id| std::iter::repeat(Color(id)).take(capacity))
            .collect();
        let mut rng = SmallRng::seed_from_u64(seed);
        balls.shuffle(&mut rng);

        let mut tubes: Vec<Tube> = balls
            .chunks(capacity.max(1))
            .map(|chunk| Tube::from_balls(chunk.to_vec()))
            .collect();
        tubes.extend(std::iter::repeat_with(Tube::new).take(empty_tubes));
        State::new(capacity, tubes)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn tubes(&self) -> &[Tube] {
        &self.tubes
    }

    /// Returns the tube at `index`.
    ///
    /// # Panics
    /// Panics if `index` is not a valid tube index.
    pub fn tube(&self, index: usize) -> &Tube {
        &self.tubes[index]
    }

    pub fn num_tubes(&self) -> usize {
        self.tubes.len()
    }

    /// Counts the balls of each color across all tubes.
    ///
    /// The result is identical for every state reachable from a given initial state.
    pub fn ball_counts(&self) -> BallCounts {
        let mut counts = [0; MAX_COLORS];
        for ball in self.tubes.iter().flat_map(|t| t.balls()) {
            counts[ball.id()] += 1;
        }
        counts
    }

    /// Goal test under the given rule.
    ///
    /// # Examples
    /// ```
    /// use ballsort_solver::engine::GoalRule;
    /// use ballsort_solver::utils::state_from_str_array;
    ///
    /// let sorted = state_from_str_array(2, &["RR", "BB", ""]).unwrap();
    /// assert!(sorted.is_goal(GoalRule::FullTubes));
    ///
    /// let short = state_from_str_array(3, &["RR", "BBB", ""]).unwrap();
    /// assert!(!short.is_goal(GoalRule::FullTubes));
    /// assert!(short.is_goal(GoalRule::Consolidated));
    /// ```
    pub fn is_goal(&self, rule: GoalRule) -> bool {
        match rule {
            GoalRule::FullTubes => self
                .tubes
                .iter()
                .all(|t| t.is_empty() || (t.len() == self.capacity && t.is_monochrome())),
            GoalRule::Consolidated => {
                if !self.tubes.iter().all(Tube::is_monochrome) {
                    return false;
                }
                // Each color may sit in any number of full tubes but only one partial one.
                let mut partial_seen = [false; MAX_COLORS];
                for tube in &self.tubes {
                    let Some(color) = tube.top() else { continue };
                    if tube.len() < self.capacity {
                        if partial_seen[color.id()] {
                            return false;
                        }
                        partial_seen[color.id()] = true;
                    }
                }
                true
            }
        }
    }

    /// Returns the color and number of balls a pour from `from` into `to` would move.
    ///
    /// # Returns
    /// * `Ok((color, n))` with `n >= 1` when the pour is legal.
    /// * `Err(reason)` describing the first rule the pour breaks.
    pub fn pour_run(
        &self,
        from: usize,
        to: usize,
    ) -> std::result::Result<(Color, usize), &'static str> {
        if from >= self.tubes.len() || to >= self.tubes.len() {
            return Err("tube index out of range");
        }
        if from == to {
            return Err("source and destination are the same tube");
        }
        let (color, run) = self.tubes[from]
            .top_run()
            .ok_or("source tube is empty")?;
        let dest = &self.tubes[to];
        let free = self.capacity.saturating_sub(dest.len());
        if free == 0 {
            return Err("destination tube is full");
        }
        if dest.top().is_some_and(|top| top != color) {
            return Err("top colors differ");
        }
        Ok((color, run.min(free)))
    }

    /// Applies a pour and returns the resulting state along with the recorded move.
    ///
    /// `self` is left untouched.
    ///
    /// # Examples
    /// ```
    /// use ballsort_solver::utils::state_from_str_array;
    ///
    /// let state = state_from_str_array(4, &["RRBB", "BB", ""]).unwrap();
    /// let (next, mv) = state.pour(0, 1).unwrap();
    /// assert_eq!(mv.count, 2);
    /// assert_eq!(next, state_from_str_array(4, &["RR", "BBBB", ""]).unwrap());
    /// assert!(state.pour(2, 0).is_err());
    /// ```
    pub fn pour(&self, from: usize, to: usize) -> Result<(State, Move)> {
        let (color, count) = self
            .pour_run(from, to)
            .map_err(|reason| SolverError::IllegalMove { from, to, reason })?;

        let mut next = self.clone();
        next.tubes[from].pop_run(count);
        next.tubes[to].push_run(color, count);
        Ok((
            next,
            Move {
                from,
                to,
                color,
                count,
            },
        ))
    }

    /// Enumerates every legal pour from this state.
    ///
    /// Successors come out in lexicographic `(from, to)` order, which the search relies on
    /// for reproducible tie-breaking. The input state is not modified.
    pub fn generate_moves(&self) -> Vec<Successor> {
        let n = self.tubes.len();
        let mut successors = Vec::new();
        for from in 0..n {
            if self.tubes[from].is_empty() {
                continue;
            }
            for to in 0..n {
                if let Ok((state, mv)) = self.pour(from, to) {
                    successors.push(Successor {
                        mv,
                        state,
                        cost: MOVE_COST,
                    });
                }
            }
        }
        successors
    }
}

impl fmt::Display for State {
    /// Writes one line per tube: `index [balls`, bottom ball first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.tubes.len().saturating_sub(1).to_string().len();
        for (i, tube) in self.tubes.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{:>width$} [", i, width = width)?;
            for ball in tube.balls() {
                write!(f, "{}", ball)?;
            }
        }
        Ok(())
    }
}

/// Replays `moves` from `initial` and returns the final state.
///
/// Each move is re-applied by its tube indices; the transferred color and count must match
/// what was recorded.
///
/// # Returns
/// `Err(SolverError::IllegalMove)` at the first move that cannot be applied or that
/// transfers something other than what it recorded.
pub fn replay(initial: &State, moves: &[Move]) -> Result<State> {
    let mut current = initial.clone();
    for recorded in moves {
        let (next, applied) = current.pour(recorded.from, recorded.to)?;
        if applied != *recorded {
            return Err(SolverError::IllegalMove {
                from: recorded.from,
                to: recorded.to,
                reason: "pour does not match the recorded color and count",
            });
        }
        current = next;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::state_from_str_array;

    fn c(ch: char) -> Color {
        Color::from_char(ch).unwrap()
    }

    #[test]
    fn test_color_char_mapping() {
        for id in 0..MAX_COLORS as u8 {
            let color = Color::new(id).unwrap();
            assert_eq!(Color::from_char(color.to_char()), Some(color));
        }
        assert_eq!(Color::from_char('.'), None);
        assert_eq!(Color::from_char('z'), None); // id 51, out of range
    }

    #[test]
    fn test_tube_queries() {
        let tube = Tube::from_balls(vec![c('R'), c('B'), c('B')]);
        assert_eq!(tube.len(), 3);
        assert_eq!(tube.top(), Some(c('B')));
        assert_eq!(tube.top_run(), Some((c('B'), 2)));
        assert_eq!(tube.distinct_colors(), 2);
        assert!(!tube.is_monochrome());
        assert!(Tube::new().is_monochrome());
        assert_eq!(Tube::new().distinct_colors(), 0);
    }

    #[test]
    fn test_state_new_rejects_overfull_tube() {
        let result = state_from_str_array(2, &["RRR", ""]);
        assert!(matches!(result, Err(SolverError::InvalidState(_))));
    }

    #[test]
    fn test_state_new_rejects_too_many_tubes() {
        let tubes = vec![Tube::new(); MAX_TUBES + 1];
        assert!(State::new(4, tubes).is_err());
    }

    #[test]
    fn test_goal_full_tubes() {
        let goal = state_from_str_array(4, &["RRRR", "", "BBBB", ""]).unwrap();
        assert!(goal.is_goal(GoalRule::FullTubes));

        let mixed = state_from_str_array(4, &["RRRB", "", "BBBR", ""]).unwrap();
        assert!(!mixed.is_goal(GoalRule::FullTubes));

        let split = state_from_str_array(4, &["RR", "RR", "BBBB", ""]).unwrap();
        assert!(!split.is_goal(GoalRule::FullTubes));
        assert!(!split.is_goal(GoalRule::Consolidated));
    }

    #[test]
    fn test_goal_consolidated_allows_one_partial_tube_per_color() {
        let state = state_from_str_array(4, &["RRRR", "RR", "BBB", ""]).unwrap();
        assert!(!state.is_goal(GoalRule::FullTubes));
        assert!(state.is_goal(GoalRule::Consolidated));

        let two_partial = state_from_str_array(4, &["RRR", "RR", "BBB", ""]).unwrap();
        assert!(!two_partial.is_goal(GoalRule::Consolidated));
    }

    #[test]
    fn test_goal_test_is_idempotent() {
        let state = state_from_str_array(4, &["RRBB", "BBRR", "", ""]).unwrap();
        for rule in [GoalRule::FullTubes, GoalRule::Consolidated] {
            let first = state.is_goal(rule);
            for _ in 0..3 {
                assert_eq!(state.is_goal(rule), first);
            }
        }
    }

    #[test]
    fn test_all_empty_board_is_goal() {
        let state = state_from_str_array(3, &["", ""]).unwrap();
        assert!(state.is_goal(GoalRule::FullTubes));
        assert!(state.is_goal(GoalRule::Consolidated));
    }

    #[test]
    fn test_pour_moves_maximal_run_that_fits() {
        let state = state_from_str_array(4, &["BRRR", "GR", ""]).unwrap();
        let (next, mv) = state.pour(0, 1).unwrap();
        assert_eq!(mv.count, 2);
        assert_eq!(mv.color, c('R'));
        assert_eq!(next.tube(0).balls(), &[c('B'), c('R')]);
        assert_eq!(next.tube(1).balls(), &[c('G'), c('R'), c('R'), c('R')]);

        let (next, mv) = state.pour(0, 2).unwrap();
        assert_eq!(mv.count, 3);
        assert_eq!(next.tube(0).balls(), &[c('B')]);
    }

    #[test]
    fn test_pour_rejections() {
        let state = state_from_str_array(2, &["RB", "BB", "", "R"]).unwrap();
        assert!(matches!(
            state.pour(2, 0),
            Err(SolverError::IllegalMove { reason: "source tube is empty", .. })
        ));
        assert!(matches!(
            state.pour(0, 1),
            Err(SolverError::IllegalMove { reason: "destination tube is full", .. })
        ));
        assert!(matches!(
            state.pour(0, 3),
            Err(SolverError::IllegalMove { reason: "top colors differ", .. })
        ));
        assert!(state.pour(0, 0).is_err());
        assert!(state.pour(0, 9).is_err());
    }

    #[test]
    fn test_pour_does_not_mutate_source() {
        let state = state_from_str_array(4, &["RRBB", "", ""]).unwrap();
        let before = state.clone();
        let _ = state.pour(0, 1).unwrap();
        assert_eq!(state, before);
    }

    #[test]
    fn test_generate_moves_order_and_legality() {
        let state = state_from_str_array(4, &["RRBB", "BBRR", "", ""]).unwrap();
        let successors = state.generate_moves();
        let pairs: Vec<(usize, usize)> = successors.iter().map(|s| (s.mv.from, s.mv.to)).collect();
        assert_eq!(pairs, vec![(0, 2), (0, 3), (1, 2), (1, 3)]);
        for successor in &successors {
            assert_eq!(successor.cost, MOVE_COST);
            assert_eq!(successor.mv.count, 2);
        }
    }

    #[test]
    fn test_generate_moves_blocked_board() {
        let state = state_from_str_array(2, &["RG", "GR"]).unwrap();
        assert!(state.generate_moves().is_empty());
    }

    #[test]
    fn test_successors_conserve_balls_and_capacity() {
        let state = State::new_random_with_seed(5, 4, 2, 7).unwrap();
        let counts = state.ball_counts();
        for successor in state.generate_moves() {
            assert_eq!(successor.state.ball_counts(), counts);
            assert!(successor.state.validate().is_ok());
        }
    }

    #[test]
    fn test_replay_reproduces_reported_successor() {
        let state = State::new_random_with_seed(4, 3, 2, 99).unwrap();
        for successor in state.generate_moves() {
            let replayed = replay(&state, &[successor.mv]).unwrap();
            assert_eq!(replayed, successor.state);
        }
    }

    #[test]
    fn test_replay_rejects_mismatched_record() {
        let state = state_from_str_array(4, &["RRBB", "", ""]).unwrap();
        let (_, mut mv) = state.pour(0, 1).unwrap();
        mv.count = 1;
        assert!(replay(&state, &[mv]).is_err());
    }

    #[test]
    fn test_new_random_with_seed_determinism() {
        let a = State::new_random_with_seed(6, 4, 2, 123).unwrap();
        let b = State::new_random_with_seed(6, 4, 2, 123).unwrap();
        assert_eq!(a, b, "States with the same seed must be identical.");

        let other = State::new_random_with_seed(6, 4, 2, 124).unwrap();
        assert_ne!(a, other, "States with different seeds should differ.");

        assert_eq!(a.num_tubes(), 8);
        let counts = a.ball_counts();
        assert!(counts[..6].iter().all(|&n| n == 4));
        assert!(counts[6..].iter().all(|&n| n == 0));
    }

    #[test]
    fn test_new_random_with_seed_rejects_bad_color_count() {
        assert!(State::new_random_with_seed(0, 4, 2, 1).is_err());
        assert!(State::new_random_with_seed(MAX_COLORS + 1, 4, 2, 1).is_err());
    }

    #[test]
    fn test_display_state() {
        let state = state_from_str_array(4, &["RRBB", ""]).unwrap();
        assert_eq!(format!("{}", state), "0 [RRBB\n1 [");
    }
}
