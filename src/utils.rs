use crate::engine::{replay, Color, Move, State, Tube, MAX_COLORS};
use crate::error::{LoadError, SolverError};
use crate::solver::SearchOutcome;
use std::io::Read;
use tracing::warn;

/// Printed in place of a move list when the search space holds no goal.
pub const NO_SOLUTION: &str = "<no solution>";

/// Printed in place of a move list when a budget limit stopped the search.
pub const NO_SOLUTION_WITHIN_BUDGET: &str = "<no solution within budget>";

/// Separator line between problems, both in problem files and in solver output.
pub const PROBLEM_SEPARATOR: &str = "---";

/// Parses an array of string slices into a `State`.
///
/// Each string slice describes one tube, bottom ball first, using the canonical color
/// letters of `Color::from_char` (`A`..`Z`, `a`..`f`). An empty string is an empty tube.
///
/// # Arguments
/// * `capacity`: The capacity shared by all tubes.
/// * `rows`: One string per tube, tube 0 first.
///
/// # Returns
/// * `Ok(State)` if every character is a color letter and the state is valid.
/// * `Err(SolverError::InvalidState)` on an unrecognized character, an overfull tube, or
///   any other structural problem reported by `State::new`.
///
/// # Examples
/// ```
/// use ballsort_solver::engine::Color;
/// use ballsort_solver::utils::state_from_str_array;
///
/// let state = state_from_str_array(4, &["RRB", ""]).unwrap();
/// assert_eq!(state.tube(0).top(), Color::from_char('B'));
/// assert!(state.tube(1).is_empty());
///
/// assert!(state_from_str_array(4, &["R.B"]).is_err());
/// assert!(state_from_str_array(2, &["RRR"]).is_err());
/// ```
pub fn state_from_str_array(capacity: usize, rows: &[&str]) -> Result<State, SolverError> {
    let mut tubes = Vec::with_capacity(rows.len());
    for (t, row) in rows.iter().enumerate() {
        let mut balls = Vec::with_capacity(row.len());
        for (b, ch) in row.chars().enumerate() {
            let color = Color::from_char(ch).ok_or_else(|| {
                SolverError::InvalidState(format!(
                    "Unrecognized character '{}' in tube {} position {}",
                    ch, t, b
                ))
            })?;
            balls.push(color);
        }
        tubes.push(Tube::from_balls(balls));
    }
    State::new(capacity, tubes)
}

/// Maps the ball symbols of one problem onto color ids, in order of first appearance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Palette {
    symbols: Vec<char>,
}

impl Palette {
    pub fn new() -> Self {
        Palette::default()
    }

    /// Returns the color for `symbol`, assigning the next free id on first sight.
    ///
    /// Returns `None` once `MAX_COLORS` distinct symbols are already in use.
    pub fn intern(&mut self, symbol: char) -> Option<Color> {
        let id = match self.symbols.iter().position(|&s| s == symbol) {
            Some(id) => id,
            None => {
                if self.symbols.len() >= MAX_COLORS {
                    return None;
                }
                self.symbols.push(symbol);
                self.symbols.len() - 1
            }
        };
        Color::new(id as u8)
    }

    /// Returns the symbol that was interned for `color`, or its canonical letter.
    pub fn symbol(&self, color: Color) -> char {
        self.symbols
            .get(color.id())
            .copied()
            .unwrap_or_else(|| color.to_char())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Renders `state` in problem-file syntax, one `capacity [balls` line per tube.
    pub fn render_state(&self, state: &State) -> String {
        state
            .tubes()
            .iter()
            .map(|tube| {
                let balls: String = tube.balls().iter().map(|&c| self.symbol(c)).collect();
                format!("{} [{}", state.capacity(), balls)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One puzzle read from a problem file.
#[derive(Clone, Debug)]
pub struct Problem {
    /// 1-based position of the problem in its file.
    pub number: usize,
    /// 1-based line number of the problem's first tube.
    pub line: usize,
    pub state: State,
    pub palette: Palette,
}

/// Accumulates the tube lines of the problem currently being read.
#[derive(Default)]
struct ProblemBuilder {
    first_line: usize,
    capacity: Option<usize>,
    tubes: Vec<Tube>,
    palette: Palette,
}

impl ProblemBuilder {
    fn add_tube_line(&mut self, line_no: usize, line: &str) -> Result<(), LoadError> {
        let syntax = |message: String| LoadError::Syntax {
            line: line_no,
            message,
        };

        let (limit, rest) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| syntax(format!("expected '<capacity> [<balls>', found '{}'", line)))?;
        let capacity = match limit {
            "oo" => {
                return Err(syntax(
                    "unbounded tubes ('oo') are not supported; every tube needs the same numeric capacity"
                        .to_string(),
                ))
            }
            _ => limit
                .parse::<usize>()
                .map_err(|_| syntax(format!("invalid tube capacity '{}'", limit)))?,
        };
        if capacity == 0 {
            return Err(syntax("tube capacity must be positive".to_string()));
        }
        match self.capacity {
            None => {
                self.capacity = Some(capacity);
                self.first_line = line_no;
            }
            Some(expected) if expected != capacity => {
                return Err(syntax(format!(
                    "tube capacity {} differs from capacity {} of the first tube",
                    capacity, expected
                )))
            }
            Some(_) => {}
        }

        let balls = rest
            .trim_start()
            .strip_prefix('[')
            .ok_or_else(|| syntax("expected '[' before the ball list".to_string()))?;
        let mut tube = Vec::new();
        for symbol in balls.chars().filter(|c| !c.is_whitespace()) {
            let color = self.palette.intern(symbol).ok_or_else(|| {
                syntax(format!(
                    "more than {} distinct ball symbols in one problem",
                    MAX_COLORS
                ))
            })?;
            tube.push(color);
        }
        self.tubes.push(Tube::from_balls(tube));
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.tubes.is_empty()
    }

    fn finish(self, number: usize) -> Result<Problem, LoadError> {
        let capacity = self.capacity.unwrap_or_default();
        let state = State::new(capacity, self.tubes)
            .map_err(|source| LoadError::Problem { number, source })?;
        warn_if_unsortable(number, &state, &self.palette);
        Ok(Problem {
            number,
            line: self.first_line,
            state,
            palette: self.palette,
        })
    }
}

/// Logs a warning for every color whose ball count is not a multiple of the capacity.
///
/// Such problems are still handed to the solver; under the full-tubes goal they end as
/// unsolvable.
fn warn_if_unsortable(number: usize, state: &State, palette: &Palette) {
    let capacity = state.capacity();
    for (id, &count) in state.ball_counts().iter().enumerate() {
        if count == 0 || count % capacity == 0 {
            continue;
        }
        if let Some(color) = Color::new(id as u8) {
            warn!(
                problem = number,
                symbol = %palette.symbol(color),
                count,
                capacity,
                "ball count is not a multiple of the tube capacity"
            );
        }
    }
}

/// Parses every problem in a problem-set text.
///
/// Syntax:
/// - One tube per line: `<capacity> [<balls>`, balls listed bottom to top, one symbol each.
/// - Lines starting with `#` are comments; blank lines are ignored.
/// - A line starting with `-` ends the current problem.
///
/// # Examples
/// ```
/// use ballsort_solver::utils::parse_problems;
///
/// let text = "# two colors\n4 [RRBB\n4 [BBRR\n4 [\n4 [\n---\n2 [AB\n2 [BA\n2 [\n";
/// let problems = parse_problems(text).unwrap();
/// assert_eq!(problems.len(), 2);
/// assert_eq!(problems[0].state.num_tubes(), 4);
/// assert_eq!(problems[1].state.capacity(), 2);
/// ```
pub fn parse_problems(input: &str) -> Result<Vec<Problem>, LoadError> {
    let mut problems = Vec::new();
    let mut current = ProblemBuilder::default();

    for (i, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('-') {
            if !current.is_empty() {
                let builder = std::mem::take(&mut current);
                problems.push(builder.finish(problems.len() + 1)?);
            }
            continue;
        }
        current.add_tube_line(i + 1, line)?;
    }
    if !current.is_empty() {
        problems.push(current.finish(problems.len() + 1)?);
    }
    Ok(problems)
}

/// Reads a whole problem-set from `reader` and parses it.
pub fn read_problems(mut reader: impl Read) -> Result<Vec<Problem>, LoadError> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;
    parse_problems(&input)
}

/// Formats a move list as one `from->to` line per pour.
pub fn format_moves(moves: &[Move]) -> String {
    moves
        .iter()
        .map(Move::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Formats a search outcome the way the solver prints it.
///
/// A board that is already sorted yields an empty string (no pours needed).
pub fn format_outcome(outcome: &SearchOutcome) -> String {
    match outcome {
        SearchOutcome::Solved(solution) => format_moves(&solution.moves),
        SearchOutcome::Unsolvable(_) => NO_SOLUTION.to_string(),
        SearchOutcome::BudgetExceeded(_) => NO_SOLUTION_WITHIN_BUDGET.to_string(),
    }
}

/// Renders the board before and after each move, separated by the move itself.
pub fn render_replay(
    initial: &State,
    moves: &[Move],
    palette: &Palette,
) -> Result<String, SolverError> {
    let mut out = palette.render_state(initial);
    let mut current = initial.clone();
    for mv in moves {
        current = replay(&current, std::slice::from_ref(mv))?;
        out.push_str(&format!(
            "\n# {} ({} x {})\n",
            mv,
            mv.count,
            palette.symbol(mv.color)
        ));
        out.push_str(&palette.render_state(&current));
    }
    Ok(out)
}
