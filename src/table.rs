//! Dynamic tables for the six aggregate datasets served by the movie API.
//!
//! Rows are kept as JSON objects so that a dataset missing an expected column
//! still loads; the scorer reports that as a configuration error instead.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Column shared by every dataset for average IMDb rating.
pub const RATING_COLUMN: &str = "avgImdbRating";

/// Column for average Rotten Tomatoes viewer rating (actors, directors).
pub const TOMATOES_COLUMN: &str = "avgTomatoesViewerRating";

/// The six fixed aggregate datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dataset {
    Monthly,
    Countries,
    Runtime,
    Actors,
    Directors,
    Genres,
}

impl Dataset {
    pub const ALL: [Dataset; 6] = [
        Dataset::Monthly,
        Dataset::Countries,
        Dataset::Runtime,
        Dataset::Actors,
        Dataset::Directors,
        Dataset::Genres,
    ];

    /// Path segment under `{base}/v1/movie/`.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly-stats",
            Self::Countries => "top-countries",
            Self::Runtime => "runtime-impact",
            Self::Actors => "top-actors",
            Self::Directors => "top-directors",
            Self::Genres => "top-genres",
        }
    }

    /// Full request URL for this dataset. A trailing `/` on the base is ignored.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/v1/movie/{}", base_url.trim().trim_end_matches('/'), self.endpoint())
    }

    /// Column naming the entity each row describes.
    pub fn label_column(&self) -> &'static str {
        match self {
            Self::Monthly => "monthName",
            Self::Countries => "country",
            Self::Runtime => "runtimeRange",
            Self::Actors => "actor",
            Self::Directors => "director",
            Self::Genres => "_id",
        }
    }

    pub fn rating_column(&self) -> &'static str {
        RATING_COLUMN
    }

    /// Volume column used for the count half of the composite score.
    pub fn count_column(&self) -> &'static str {
        match self {
            Self::Monthly => "totalMoviesReleased",
            _ => "totalMovies",
        }
    }

    /// Columns the dashboard reads from this dataset.
    pub fn expected_columns(&self) -> Vec<&'static str> {
        let mut cols = vec![self.label_column(), self.rating_column(), self.count_column()];
        match self {
            Self::Monthly => cols.push("avgCommentsPerMovie"),
            Self::Actors | Self::Directors => cols.push(TOMATOES_COLUMN),
            _ => {}
        }
        cols
    }

    /// Human-readable name used in logs and notices.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly stats",
            Self::Countries => "top countries",
            Self::Runtime => "runtime impact",
            Self::Actors => "top actors",
            Self::Directors => "top directors",
            Self::Genres => "top genres",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug)]
pub enum TableError {
    #[error("{dataset}: expected a JSON array, got {found}")]
    NotAnArray { dataset: Dataset, found: &'static str },
    #[error("{dataset}: row {index} is not a JSON object")]
    NotAnObject { dataset: Dataset, index: usize },
}

/// One record of a dataset.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Numeric value of a column. Numeric strings are accepted; anything else is `None`.
    pub fn number(&self, column: &str) -> Option<f64> {
        match self.0.get(column)? {
            Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Display text of a column (strings verbatim, numbers formatted).
    pub fn text(&self, column: &str) -> Option<String> {
        match self.0.get(column)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Appends or replaces a column value.
    pub fn set(&mut self, column: &str, value: Value) {
        self.0.insert(column.to_string(), value);
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// A loaded dataset: ordered rows as returned by the API.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub dataset: Dataset,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(dataset: Dataset, rows: Vec<Row>) -> Self {
        Self { dataset, rows }
    }

    /// Build a table from an API response body, which must be an array of objects.
    pub fn from_json(dataset: Dataset, body: &Value) -> Result<Self, TableError> {
        let items = match body {
            Value::Array(items) => items,
            other => {
                return Err(TableError::NotAnArray {
                    dataset,
                    found: json_kind(other),
                });
            }
        };

        let mut rows = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match item {
                Value::Object(fields) => rows.push(Row(fields.clone())),
                _ => return Err(TableError::NotAnObject { dataset, index }),
            }
        }
        Ok(Self { dataset, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Union of row keys in first-seen order.
    pub fn columns(&self) -> Vec<String> {
        let mut cols: Vec<String> = Vec::new();
        for row in &self.rows {
            for c in row.columns() {
                if !cols.iter().any(|existing| existing == c) {
                    cols.push(c.to_string());
                }
            }
        }
        cols
    }

    /// A column exists if at least one row carries it.
    pub fn has_column(&self, column: &str) -> bool {
        self.rows.iter().any(|r| r.contains(column))
    }

    /// Expected columns absent from every row.
    pub fn missing_columns(&self) -> Vec<&'static str> {
        self.dataset
            .expected_columns()
            .into_iter()
            .filter(|c| !self.has_column(c))
            .collect()
    }

    /// Largest numeric value in a column, skipping missing and non-numeric cells.
    /// `None` when the column has no numeric value at all.
    pub fn max(&self, column: &str) -> Option<f64> {
        self.rows
            .iter()
            .filter_map(|r| r.number(column))
            .fold(None, |acc, v| match acc {
                Some(m) if m >= v => Some(m),
                _ => Some(v),
            })
    }

    /// Entity label of a row, empty when the label column is absent.
    pub fn label(&self, row: &Row) -> String {
        row.text(self.dataset.label_column()).unwrap_or_default()
    }
}

/// All six tables of one successful load.
#[derive(Debug, Clone, PartialEq)]
pub struct Datasets {
    pub monthly: Table,
    pub countries: Table,
    pub runtime: Table,
    pub actors: Table,
    pub directors: Table,
    pub genres: Table,
}

impl Datasets {
    pub fn get(&self, dataset: Dataset) -> &Table {
        match dataset {
            Dataset::Monthly => &self.monthly,
            Dataset::Countries => &self.countries,
            Dataset::Runtime => &self.runtime,
            Dataset::Actors => &self.actors,
            Dataset::Directors => &self.directors,
            Dataset::Genres => &self.genres,
        }
    }

    /// Apply `f` to every table, keeping the dataset slots.
    pub fn map(&self, mut f: impl FnMut(&Table) -> Table) -> Datasets {
        Datasets {
            monthly: f(&self.monthly),
            countries: f(&self.countries),
            runtime: f(&self.runtime),
            actors: f(&self.actors),
            directors: f(&self.directors),
            genres: f(&self.genres),
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
