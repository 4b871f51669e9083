//! Composite score: normalized quality blended with normalized volume.
//!
//! `composite = (rating / max_rating) * w + (count / max_count) * (1 - w)`

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::table::{Dataset, Datasets, Table};

/// Derived column appended to every scored table.
pub const SCORE_COLUMN: &str = "composite_score";

/// Weight given to rating quality; `1 - w` goes to movie volume.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Weight(f64);

impl Weight {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 1.0;
    pub const DEFAULT: f64 = 0.6;
    /// Weights move in increments of this size.
    pub const STEP: f64 = 0.1;

    /// Accepts values in `MIN..=MAX` that sit on the `STEP` grid.
    pub fn new(value: f64) -> Result<Self, WeightError> {
        if !value.is_finite() || !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(WeightError(value));
        }
        let steps = (value / Self::STEP).round();
        if (steps * Self::STEP - value).abs() > 1e-9 {
            return Err(WeightError(value));
        }
        // 0.1 * 3 is not 0.3 in binary; keep the printed value exact
        Ok(Self(steps / (1.0 / Self::STEP).round()))
    }

    pub fn quality(&self) -> f64 {
        self.0
    }

    pub fn volume(&self) -> f64 {
        1.0 - self.0
    }
}

impl Default for Weight {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("weight must be a multiple of 0.1 between 0.0 and 1.0, got {0}")]
pub struct WeightError(pub f64);

/// Configuration error: the table can't be scored with the requested columns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error(
        "{dataset}: column(s) {} not found; available columns: [{}]",
        .missing.join(", "),
        .available.join(", ")
    )]
    MissingColumns {
        dataset: Dataset,
        missing: Vec<String>,
        available: Vec<String>,
    },
}

/// Non-fatal condition noticed while scoring.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreWarning {
    /// The count column's maximum is zero or absent, so every score is 0.
    DegenerateCount {
        dataset: Dataset,
        column: String,
        max: Option<f64>,
    },
}

impl fmt::Display for ScoreWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateCount { dataset, column, max } => {
                let max = max.map(|m| m.to_string()).unwrap_or_else(|| "undefined".into());
                write!(
                    f,
                    "{dataset}: '{column}' has no usable data (max = {max}); composite score set to 0"
                )
            }
        }
    }
}

/// A table with `composite_score` appended, plus any warning raised on the way.
#[derive(Debug, Clone)]
pub struct Scored {
    pub table: Table,
    pub warning: Option<ScoreWarning>,
}

/// Score a table. On error the input is left untouched and no score column exists.
pub fn score(
    table: &Table,
    rating_column: &str,
    count_column: &str,
    weight: Weight,
) -> Result<Scored, ScoreError> {
    let missing: Vec<String> = [rating_column, count_column]
        .into_iter()
        .filter(|c| !table.has_column(c))
        .map(String::from)
        .collect();
    if !missing.is_empty() {
        return Err(ScoreError::MissingColumns {
            dataset: table.dataset,
            missing,
            available: table.columns(),
        });
    }

    let max_count = table.max(count_column);
    let mut scored = table.clone();

    let usable_count = max_count.filter(|m| *m != 0.0);
    let Some(max_count) = usable_count else {
        for row in &mut scored.rows {
            row.set(SCORE_COLUMN, Value::from(0.0));
        }
        return Ok(Scored {
            table: scored,
            warning: Some(ScoreWarning::DegenerateCount {
                dataset: table.dataset,
                column: count_column.to_string(),
                max: max_count,
            }),
        });
    };

    let max_rating = table.max(rating_column).filter(|m| *m != 0.0);
    for row in &mut scored.rows {
        let quality = match (row.number(rating_column), max_rating) {
            (Some(r), Some(m)) => r / m,
            _ => 0.0,
        };
        let volume = row.number(count_column).map(|c| c / max_count).unwrap_or(0.0);
        let composite = quality * weight.quality() + volume * weight.volume();
        row.set(SCORE_COLUMN, Value::from(composite));
    }

    Ok(Scored {
        table: scored,
        warning: None,
    })
}

/// Score a table with its dataset's own rating and count columns.
pub fn score_dataset(table: &Table, weight: Weight) -> Result<Scored, ScoreError> {
    let dataset = table.dataset;
    score(table, dataset.rating_column(), dataset.count_column(), weight)
}

/// All six datasets scored with one weight. Tables that failed to score are kept as loaded.
#[derive(Debug, Clone)]
pub struct ScoredDatasets {
    pub weight: Weight,
    pub tables: Datasets,
    pub warnings: Vec<ScoreWarning>,
    pub errors: Vec<ScoreError>,
}

impl ScoredDatasets {
    /// Warnings and errors that concern one dataset, as display text.
    pub fn notices_for(&self, dataset: Dataset) -> Vec<String> {
        let warnings = self.warnings.iter().filter(|w| match w {
            ScoreWarning::DegenerateCount { dataset: d, .. } => *d == dataset,
        });
        let errors = self.errors.iter().filter(|e| match e {
            ScoreError::MissingColumns { dataset: d, .. } => *d == dataset,
        });
        warnings
            .map(|w| format!("Warning: {w}"))
            .chain(errors.map(|e| format!("Error: {e}")))
            .collect()
    }
}

/// Score every dataset independently with the same weight.
pub fn score_all(datasets: &Datasets, weight: Weight) -> ScoredDatasets {
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    let tables = datasets.map(|table| match score_dataset(table, weight) {
        Ok(scored) => {
            if let Some(w) = scored.warning {
                log::warn!("{w}");
                warnings.push(w);
            }
            scored.table
        }
        Err(e) => {
            log::warn!("Skipping composite score: {e}");
            errors.push(e);
            table.clone()
        }
    });

    ScoredDatasets {
        weight,
        tables,
        warnings,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::table;
    use serde_json::json;

    fn countries() -> Table {
        table(
            Dataset::Countries,
            json!([
                {"country": "USA", "avgImdbRating": 6.4, "totalMovies": 1000},
                {"country": "France", "avgImdbRating": 7.2, "totalMovies": 300},
                {"country": "Japan", "avgImdbRating": 7.6, "totalMovies": 150},
                {"country": "UK", "avgImdbRating": 6.9, "totalMovies": 500},
            ]),
        )
    }

    fn scores(t: &Table) -> Vec<f64> {
        t.rows.iter().map(|r| r.number(SCORE_COLUMN).unwrap()).collect()
    }

    fn order_by(t: &Table, values: &[f64]) -> Vec<String> {
        let mut idx: Vec<usize> = (0..values.len()).collect();
        idx.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap());
        idx.into_iter().map(|i| t.label(&t.rows[i])).collect()
    }

    #[test]
    fn test_weight_bounds() {
        assert!(Weight::new(0.0).is_ok());
        assert!(Weight::new(1.0).is_ok());
        assert!(Weight::new(-0.1).is_err());
        assert!(Weight::new(1.01).is_err());
        assert!(Weight::new(f64::NAN).is_err());
        assert_eq!(Weight::default().quality(), 0.6);
        assert!((Weight::default().volume() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_weight_on_step_grid() {
        assert!(Weight::new(0.35).is_err());
        assert!(Weight::new(0.05).is_err());
        assert_eq!(Weight::new(0.3).unwrap().quality(), 0.3);
        assert_eq!(Weight::new(0.1 * 3.0).unwrap().quality(), 0.3);
        assert_eq!(Weight::new(0.7).unwrap().to_string(), "0.7");
        for step in 0..=10 {
            let w = Weight::new(step as f64 / 10.0).unwrap();
            assert_eq!(format!("{:.1}", w.quality()).parse::<f64>().unwrap(), w.quality());
        }
    }

    #[test]
    fn test_weight_error_message() {
        assert_eq!(
            Weight::new(0.35).unwrap_err().to_string(),
            "weight must be a multiple of 0.1 between 0.0 and 1.0, got 0.35"
        );
    }

    #[test]
    fn test_formula() {
        let t = countries();
        let w = Weight::new(0.6).unwrap();
        let s = score_dataset(&t, w).unwrap();
        assert!(s.warning.is_none());
        let got = scores(&s.table);
        // USA: 6.4/7.6*0.6 + 1.0*0.4
        assert!((got[0] - (6.4 / 7.6 * 0.6 + 0.4)).abs() < 1e-9);
        // Japan: 1.0*0.6 + 0.15*0.4
        assert!((got[2] - (0.6 + 0.15 * 0.4)).abs() < 1e-9);
    }

    #[test]
    fn test_scores_within_unit_interval() {
        let t = countries();
        for step in 0..=10 {
            let w = Weight::new(step as f64 / 10.0).unwrap();
            let s = score_dataset(&t, w).unwrap();
            for v in scores(&s.table) {
                assert!((0.0..=1.0).contains(&v), "score {v} out of range at w={w}");
            }
        }
    }

    #[test]
    fn test_full_quality_weight_ranks_by_rating() {
        let t = countries();
        let s = score_dataset(&t, Weight::new(1.0).unwrap()).unwrap();
        let ratings: Vec<f64> = t.rows.iter().map(|r| r.number("avgImdbRating").unwrap()).collect();
        assert_eq!(order_by(&s.table, &scores(&s.table)), order_by(&t, &ratings));
    }

    #[test]
    fn test_zero_quality_weight_ranks_by_count() {
        let t = countries();
        let s = score_dataset(&t, Weight::new(0.0).unwrap()).unwrap();
        let counts: Vec<f64> = t.rows.iter().map(|r| r.number("totalMovies").unwrap()).collect();
        assert_eq!(order_by(&s.table, &scores(&s.table)), order_by(&t, &counts));
    }

    #[test]
    fn test_all_zero_counts_score_zero() {
        let t = table(
            Dataset::Runtime,
            json!([
                {"runtimeRange": "0 - 60 mins", "avgImdbRating": 0, "totalMovies": 0},
                {"runtimeRange": "60 - 90 mins", "avgImdbRating": 6.1, "totalMovies": 0},
            ]),
        );
        for w in [0.0, 0.5, 1.0] {
            let s = score_dataset(&t, Weight::new(w).unwrap()).unwrap();
            assert_eq!(scores(&s.table), vec![0.0, 0.0]);
            assert!(matches!(
                s.warning,
                Some(ScoreWarning::DegenerateCount { max: Some(m), .. }) if m == 0.0
            ));
        }
    }

    #[test]
    fn test_undefined_count_max_is_degenerate() {
        let t = table(
            Dataset::Genres,
            json!([{"_id": "Drama", "avgImdbRating": 6.8, "totalMovies": null}]),
        );
        let s = score_dataset(&t, Weight::default()).unwrap();
        assert_eq!(scores(&s.table), vec![0.0]);
        assert!(matches!(s.warning, Some(ScoreWarning::DegenerateCount { max: None, .. })));
    }

    #[test]
    fn test_missing_column_leaves_table_unchanged() {
        let t = table(
            Dataset::Actors,
            json!([{"actor": "A", "avgImdbRating": 7.0, "movies": 12}]),
        );
        let before = t.clone();
        let err = score(&t, "avgImdbRating", "totalMovies", Weight::default()).unwrap_err();
        let ScoreError::MissingColumns { missing, available, .. } = err;
        assert_eq!(missing, vec!["totalMovies"]);
        assert_eq!(available, vec!["actor", "avgImdbRating", "movies"]);
        assert_eq!(t, before);
        assert!(!t.has_column(SCORE_COLUMN));
    }

    #[test]
    fn test_missing_cells_contribute_zero() {
        let t = table(
            Dataset::Genres,
            json!([
                {"_id": "Drama", "avgImdbRating": 7.0, "totalMovies": 100},
                {"_id": "Short", "totalMovies": 50},
            ]),
        );
        let s = score_dataset(&t, Weight::new(0.5).unwrap()).unwrap();
        let got = scores(&s.table);
        assert!((got[0] - 1.0).abs() < 1e-9);
        assert!((got[1] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_warning_message() {
        let w = ScoreWarning::DegenerateCount {
            dataset: Dataset::Genres,
            column: "totalMovies".into(),
            max: None,
        };
        assert!(w.to_string().contains("max = undefined"));
    }

    #[test]
    fn test_score_all_collects_problems() {
        let datasets = Datasets {
            monthly: table(Dataset::Monthly, json!([{"monthName": "May", "avgImdbRating": 6.6, "totalMoviesReleased": 90}])),
            countries: countries(),
            runtime: table(Dataset::Runtime, json!([{"runtimeRange": "0 - 60 mins", "avgImdbRating": 6.0, "totalMovies": 0}])),
            actors: table(Dataset::Actors, json!([{"actor": "A", "avgImdbRating": 7.0}])),
            directors: table(Dataset::Directors, json!([{"director": "D", "avgImdbRating": 7.0, "totalMovies": 6}])),
            genres: table(Dataset::Genres, json!([{"_id": "Drama", "avgImdbRating": 6.9, "totalMovies": 40}])),
        };
        let scored = score_all(&datasets, Weight::default());
        assert_eq!(scored.warnings.len(), 1);
        assert_eq!(scored.errors.len(), 1);
        assert!(scored.tables.monthly.has_column(SCORE_COLUMN));
        assert!(!scored.tables.actors.has_column(SCORE_COLUMN));
        assert_eq!(scored.tables.actors, datasets.actors);
        assert_eq!(scored.notices_for(Dataset::Runtime).len(), 1);
        assert!(scored.notices_for(Dataset::Actors)[0].starts_with("Error:"));
        assert!(scored.notices_for(Dataset::Genres).is_empty());
    }
}
