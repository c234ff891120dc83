use crate::engine::{State, MAX_COLORS};

/// Weight applied to each surplus tube a color is spread over.
pub const SPREAD_WEIGHT: u32 = 2;

/// Penalty for each tube holding more than one color.
pub const MIXED_TUBE_PENALTY: u32 = 1;

/// Strategies for estimating the number of pours left before a goal is reached.
///
/// None of the informed strategies is admissible: they steer the search toward sorted
/// boards quickly but do not guarantee the shortest solution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Heuristic {
    /// Color dispersion across tubes plus a penalty for mixed tubes.
    #[default]
    Diversity,
    /// Sum over tubes of `(distinct colors - 1)^2`.
    TubeEntropy,
    /// Always zero. Turns the search into uniform-cost search.
    Zero,
}

impl Heuristic {
    /// Every heuristic, in the order the evaluator reports them.
    pub const ALL: [Heuristic; 3] = [Heuristic::Diversity, Heuristic::TubeEntropy, Heuristic::Zero];

    /// Estimates the remaining number of pours from `state`.
    ///
    /// Returns 0 for every goal state, under either goal rule.
    pub fn estimate(self, state: &State) -> u32 {
        match self {
            Heuristic::Diversity => diversity_estimate(state),
            Heuristic::TubeEntropy => tube_entropy(state),
            Heuristic::Zero => 0,
        }
    }

    /// Returns `true` if the estimate never exceeds the true remaining cost, so a solution
    /// found with it is the shortest one.
    pub fn is_admissible(self) -> bool {
        matches!(self, Heuristic::Zero)
    }

    pub fn name(self) -> &'static str {
        match self {
            Heuristic::Diversity => "diversity",
            Heuristic::TubeEntropy => "tube-entropy",
            Heuristic::Zero => "zero",
        }
    }
}

/// Counts, for each color, the number of distinct tubes in which it appears.
///
/// # Returns
/// An array indexed by color id. Colors absent from the board have a diversity of 0.
///
/// # Examples
/// ```
/// use ballsort_solver::engine::Color;
/// use ballsort_solver::heuristics::color_diversity;
/// use ballsort_solver::utils::state_from_str_array;
///
/// let state = state_from_str_array(4, &["RB", "RR", "R", ""]).unwrap();
/// let diversity = color_diversity(&state);
/// assert_eq!(diversity[Color::from_char('R').unwrap().id()], 3);
/// assert_eq!(diversity[Color::from_char('B').unwrap().id()], 1);
/// ```
pub fn color_diversity(state: &State) -> [usize; MAX_COLORS] {
    let mut diversity = [0; MAX_COLORS];
    for tube in state.tubes() {
        let mut mask = tube.color_mask();
        while mask != 0 {
            let id = mask.trailing_zeros() as usize;
            diversity[id] += 1;
            mask &= mask - 1;
        }
    }
    diversity
}

/// Sums, over all colors, how many more tubes the color occupies than it strictly needs.
///
/// A color with `n` balls needs at least `ceil(n / capacity)` tubes. Occupying exactly
/// that many contributes nothing; every extra tube contributes one.
pub fn excess_spread(state: &State) -> u32 {
    let capacity = state.capacity();
    let counts = state.ball_counts();
    let diversity = color_diversity(state);
    counts
        .iter()
        .zip(diversity.iter())
        .filter(|&(&n, _)| n > 0)
        .map(|(&n, &k)| k.saturating_sub(n.div_ceil(capacity)) as u32)
        .sum()
}

/// Counts tubes holding more than one distinct color.
pub fn mixed_tube_count(state: &State) -> u32 {
    state
        .tubes()
        .iter()
        .filter(|t| t.distinct_colors() > 1)
        .count() as u32
}

/// The default estimate: `SPREAD_WEIGHT * excess_spread + MIXED_TUBE_PENALTY * mixed_tube_count`.
///
/// # Examples
/// ```
/// use ballsort_solver::heuristics::diversity_estimate;
/// use ballsort_solver::utils::state_from_str_array;
///
/// let goal = state_from_str_array(4, &["RRRR", "BBBB", ""]).unwrap();
/// assert_eq!(diversity_estimate(&goal), 0);
///
/// // R and B each spread over two tubes, both tubes mixed.
/// let mixed = state_from_str_array(4, &["RRBB", "BBRR", ""]).unwrap();
/// assert_eq!(diversity_estimate(&mixed), 2 * 2 + 2);
/// ```
pub fn diversity_estimate(state: &State) -> u32 {
    SPREAD_WEIGHT * excess_spread(state) + MIXED_TUBE_PENALTY * mixed_tube_count(state)
}

/// Sum over tubes of `(distinct colors - 1)^2`. Empty and monochromatic tubes contribute 0.
pub fn tube_entropy(state: &State) -> u32 {
    state
        .tubes()
        .iter()
        .map(|t| {
            let extra = t.distinct_colors().saturating_sub(1) as u32;
            extra * extra
        })
        .sum()
}
