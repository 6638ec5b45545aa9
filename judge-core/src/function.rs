//! Windowed numeric predicates over a recent-values sequence.
//!
//! Expressed as a tagged variant — one `Function` enum dispatched in a
//! single `match` — rather than a heterogeneous collection of function
//! objects, since every case is known once the descriptor is parsed and
//! there's no need for dynamic dispatch. `c_avg_rate_abs` takes two
//! sequences instead of one, so it lives in its own [`RelativeFunction`]
//! type rather than as a `Function` variant.

use crate::model::{History, Operator};

/// Absolute tolerance for equality/inequality comparisons.
const EPSILON: f64 = 1e-4;

/// The result of evaluating a function against a history sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub left_value: f64,
    pub is_triggered: bool,
    /// If `false`, the caller must abort this strategy evaluation silently
    /// — there isn't enough history to evaluate the window.
    pub is_enough: bool,
}

impl Outcome {
    fn not_enough() -> Self {
        Self {
            left_value: 0.0,
            is_triggered: false,
            is_enough: false,
        }
    }
}

/// Compare `value` against `rhs` under `op`, using an absolute tolerance of
/// [`EPSILON`] for equality/inequality. NaN comparisons always evaluate to
/// `false`, matching IEEE-754 unordered semantics.
pub fn compare(value: f64, op: Operator, rhs: f64) -> bool {
    if value.is_nan() || rhs.is_nan() {
        return false;
    }
    match op {
        Operator::Eq => (value - rhs).abs() < EPSILON,
        Operator::Ne => (value - rhs).abs() > EPSILON,
        Operator::Lt => value < rhs,
        Operator::Le => value <= rhs,
        Operator::Gt => value > rhs,
        Operator::Ge => value >= rhs,
    }
}

/// Shared parameters for the single-threshold window functions
/// (`max`, `min`, `avg`, `sum`, `all`, `diff`, `pdiff`).
#[derive(Debug, Clone, Copy)]
pub struct Params {
    pub limit: usize,
    pub operator: Operator,
    pub right_value: f64,
}

/// Parameters for `lookup(#M#N)`: trigger once `M` of the first `N` values
/// match the comparison.
#[derive(Debug, Clone, Copy)]
pub struct LookupParams {
    pub num: usize,
    pub limit: usize,
    pub operator: Operator,
    pub right_value: f64,
}

/// The windowed function library, one variant per descriptor name.
#[derive(Debug, Clone, Copy)]
pub enum Function {
    Max(Params),
    Min(Params),
    Avg(Params),
    Sum(Params),
    All(Params),
    Lookup(LookupParams),
    Diff(Params),
    PDiff(Params),
}

impl Function {
    pub fn compute(&self, vs: &History) -> Outcome {
        match self {
            Function::Max(p) => compute_extremum(vs, p, f64::max),
            Function::Min(p) => compute_extremum(vs, p, f64::min),
            Function::Avg(p) => compute_avg(vs, p),
            Function::Sum(p) => compute_sum(vs, p),
            Function::All(p) => compute_all(vs, p),
            Function::Lookup(p) => compute_lookup(vs, p),
            Function::Diff(p) => compute_diff(vs, p, false),
            Function::PDiff(p) => compute_diff(vs, p, true),
        }
    }
}

fn compute_extremum(vs: &History, p: &Params, pick: fn(f64, f64) -> f64) -> Outcome {
    if vs.len() < p.limit {
        return Outcome::not_enough();
    }
    let extremum = vs[0..p.limit]
        .iter()
        .skip(1)
        .fold(vs[0].value, |acc, pt| pick(acc, pt.value));
    Outcome {
        left_value: extremum,
        is_triggered: compare(extremum, p.operator, p.right_value),
        is_enough: true,
    }
}

fn compute_avg(vs: &History, p: &Params) -> Outcome {
    if vs.len() < p.limit {
        return Outcome::not_enough();
    }
    let sum: f64 = vs[0..p.limit].iter().map(|pt| pt.value).sum();
    let avg = sum / p.limit as f64;
    Outcome {
        left_value: avg,
        is_triggered: compare(avg, p.operator, p.right_value),
        is_enough: true,
    }
}

fn compute_sum(vs: &History, p: &Params) -> Outcome {
    if vs.len() < p.limit {
        return Outcome::not_enough();
    }
    let sum: f64 = vs[0..p.limit].iter().map(|pt| pt.value).sum();
    Outcome {
        left_value: sum,
        is_triggered: compare(sum, p.operator, p.right_value),
        is_enough: true,
    }
}

fn compute_all(vs: &History, p: &Params) -> Outcome {
    if vs.len() < p.limit {
        return Outcome::not_enough();
    }
    let is_triggered = vs[0..p.limit]
        .iter()
        .all(|pt| compare(pt.value, p.operator, p.right_value));
    Outcome {
        left_value: vs[0].value,
        is_triggered,
        is_enough: true,
    }
}

fn compute_lookup(vs: &History, p: &LookupParams) -> Outcome {
    if vs.len() < p.limit {
        return Outcome::not_enough();
    }
    let left_value = vs[0].value;
    let mut matches = 0usize;
    for pt in &vs[0..p.limit] {
        if compare(pt.value, p.operator, p.right_value) {
            matches += 1;
            if matches == p.num {
                return Outcome {
                    left_value,
                    is_triggered: true,
                    is_enough: true,
                };
            }
        }
    }
    Outcome {
        left_value,
        is_triggered: false,
        is_enough: true,
    }
}

/// Shared body for `diff`/`pdiff`: require `len(vs) >= limit + 1` (the
/// current point plus `limit` historical points), scan `i in 1..=limit`,
/// and trigger on the first matching comparison. `pdiff` additionally
/// divides by the historical value and skips exact-zero historical points
/// without examining them.
fn compute_diff(vs: &History, p: &Params, percent: bool) -> Outcome {
    if vs.len() < p.limit + 1 {
        return Outcome::not_enough();
    }
    let first = vs[0].value;
    let mut left_value = 0.0;
    let mut is_triggered = false;
    for pt in &vs[1..=p.limit] {
        if percent {
            if pt.value == 0.0 {
                continue;
            }
            left_value = (first - pt.value) / pt.value * 100.0;
        } else {
            left_value = first - pt.value;
        }
        is_triggered = compare(left_value, p.operator, p.right_value);
        if is_triggered {
            break;
        }
    }
    Outcome {
        left_value,
        is_triggered,
        is_enough: true,
    }
}

/// `c_avg_rate_abs(#N#D)`: compares the mean of a "current" window against
/// the mean of a "relative" window shifted back by `D` days, ignoring NaN
/// and exact-zero samples in each mean independently.
#[derive(Debug, Clone, Copy)]
pub struct RelativeFunction {
    pub operator: Operator,
    pub right_value: f64,
}

impl RelativeFunction {
    pub fn relative_compute(&self, current: &History, relative: &History) -> Outcome {
        let (csum, ccount) = mean_ignoring_nan_and_zero(current);
        let (rsum, rcount) = mean_ignoring_nan_and_zero(relative);
        if ccount == 0 || rcount == 0 {
            return Outcome::not_enough();
        }
        let cv = csum / ccount as f64;
        let rv = rsum / rcount as f64;
        let rate = (cv - rv).abs() / rv * 100.0;
        Outcome {
            left_value: rate,
            is_triggered: compare(rate, self.operator, self.right_value),
            is_enough: true,
        }
    }
}

fn mean_ignoring_nan_and_zero(vs: &History) -> (f64, usize) {
    let mut sum = 0.0;
    let mut count = 0usize;
    for pt in vs {
        if !pt.value.is_nan() && pt.value != 0.0 {
            sum += pt.value;
            count += 1;
        }
    }
    (sum, count)
}
