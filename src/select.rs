//! Filtering and ordering of scored tables for each dashboard view.

use std::cmp::Ordering;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::score::{SCORE_COLUMN, Weight, WeightError};
use crate::table::{Dataset, Row, Table};

/// Category order for the monthly line chart.
pub const MONTH_ORDER: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

/// Countries shown in the producing-countries view.
pub const TOP_COUNTRIES: RangeInclusive<u32> = 5..=20;
pub const TOP_COUNTRIES_DEFAULT: u32 = 10;

/// Minimum movie counts for the actor/director scatter plots.
pub const MIN_ACTOR_MOVIES: RangeInclusive<u32> = 1..=50;
pub const MIN_ACTOR_MOVIES_DEFAULT: u32 = 10;
pub const MIN_DIRECTOR_MOVIES: RangeInclusive<u32> = 1..=50;
pub const MIN_DIRECTOR_MOVIES_DEFAULT: u32 = 5;

/// Minimum movie count for the genre chart.
pub const MIN_GENRE_MOVIES: RangeInclusive<u32> = 1..=100;
pub const MIN_GENRE_MOVIES_DEFAULT: u32 = 20;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error(transparent)]
    Weight(#[from] WeightError),
    #[error("{name} must be between {} and {}, got {value}", .range.start(), .range.end())]
    OutOfRange {
        name: &'static str,
        value: u32,
        range: RangeInclusive<u32>,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectError {
    #[error("{0}: composite score was not computed, cannot rank")]
    NotScored(Dataset),
}

/// Every user control of the dashboard, as one immutable value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewParams {
    pub weight: Weight,
    pub top_countries: u32,
    pub min_actor_movies: u32,
    pub min_director_movies: u32,
    pub min_genre_movies: u32,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            weight: Weight::default(),
            top_countries: TOP_COUNTRIES_DEFAULT,
            min_actor_movies: MIN_ACTOR_MOVIES_DEFAULT,
            min_director_movies: MIN_DIRECTOR_MOVIES_DEFAULT,
            min_genre_movies: MIN_GENRE_MOVIES_DEFAULT,
        }
    }
}

impl ViewParams {
    /// Check every threshold against its slider range.
    pub fn validate(self) -> Result<Self, ParamError> {
        check("top countries", self.top_countries, TOP_COUNTRIES)?;
        check("minimum actor movies", self.min_actor_movies, MIN_ACTOR_MOVIES)?;
        check("minimum director movies", self.min_director_movies, MIN_DIRECTOR_MOVIES)?;
        check("minimum genre movies", self.min_genre_movies, MIN_GENRE_MOVIES)?;
        Ok(self)
    }

    pub fn with_weight(self, weight: f64) -> Result<Self, ParamError> {
        Ok(Self {
            weight: Weight::new(weight)?,
            ..self
        })
    }
}

fn check(name: &'static str, value: u32, range: RangeInclusive<u32>) -> Result<(), ParamError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ParamError::OutOfRange { name, value, range })
    }
}

/// Rows ordered by composite score descending, ties broken by label ascending.
pub fn rank(table: &Table) -> Result<Vec<&Row>, SelectError> {
    if !table.has_column(SCORE_COLUMN) {
        return Err(SelectError::NotScored(table.dataset));
    }
    let label_col = table.dataset.label_column();
    let mut rows: Vec<&Row> = table.rows.iter().collect();
    rows.sort_by(|a, b| {
        let sa = a.number(SCORE_COLUMN).unwrap_or(f64::NEG_INFINITY);
        let sb = b.number(SCORE_COLUMN).unwrap_or(f64::NEG_INFINITY);
        sb.partial_cmp(&sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.text(label_col).cmp(&b.text(label_col)))
    });
    Ok(rows)
}

/// Keep rows whose count column is at least `min`. Rows without a count are dropped.
pub fn at_least<'a>(rows: Vec<&'a Row>, count_column: &str, min: u32) -> Vec<&'a Row> {
    let min = f64::from(min);
    rows.into_iter()
        .filter(|r| r.number(count_column).is_some_and(|c| c >= min))
        .collect()
}

/// First `n` rows, or all of them when fewer exist.
pub fn top_n(mut rows: Vec<&Row>, n: usize) -> Vec<&Row> {
    rows.truncate(n);
    rows
}

/// Ranked rows with at least `min` movies.
pub fn ranked_with_min(table: &Table, min: u32) -> Result<Vec<&Row>, SelectError> {
    Ok(at_least(rank(table)?, table.dataset.count_column(), min))
}

/// First `n` ranked rows, limited to rows with at least `min` movies when given.
pub fn top_rows(table: &Table, min: Option<u32>, n: usize) -> Result<Vec<&Row>, SelectError> {
    let rows = match min {
        Some(m) => ranked_with_min(table, m)?,
        None => rank(table)?,
    };
    Ok(top_n(rows, n))
}

static LEADING_DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0*(\d*)").expect("valid regex"));

/// Leading integer of a runtime range label as its digits without leading
/// zeros: "90-120" → "90", "0 - 60" → "". No leading digits reads as zero.
pub fn leading_digits(label: &str) -> &str {
    LEADING_DIGITS_RE
        .captures(label)
        .and_then(|c| c.get(1))
        .map_or("", |m| m.as_str())
}

/// Numeric sort key for a label of any length: fewer digits is smaller.
fn leading_number_key(label: &str) -> (usize, &str) {
    let digits = leading_digits(label);
    (digits.len(), digits)
}

/// Sort labels ascending by their leading integer, keeping input order on ties.
pub fn order_by_leading_number<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for l in labels {
        if !out.iter().any(|o| o == l.as_ref()) {
            out.push(l.as_ref().to_string());
        }
    }
    out.sort_by(|a, b| leading_number_key(a).cmp(&leading_number_key(b)));
    out
}

/// Distinct runtime labels of a table, ordered by leading integer.
pub fn runtime_order(table: &Table) -> Vec<String> {
    let labels: Vec<String> = table.rows.iter().map(|r| table.label(r)).collect();
    order_by_leading_number(&labels)
}

/// 0.75 quantile, linearly interpolated between closest ranks. `None` when empty.
pub fn upper_quartile(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let pos = 0.75 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}
