//! Aggregate recommendation: the best release months, partners, runtime,
//! talent and genres under the current weight, as text plus a radar chart.

use serde_json::{Map, Value};

use crate::chart::{ChartKind, ChartSpec};
use crate::score::{SCORE_COLUMN, ScoredDatasets, Weight};
use crate::select::{SelectError, top_rows};
use crate::table::{Dataset, Row, Table};

/// How many entries each category contributes, and the movie-count floor it applies.
const MONTHS: (usize, Option<u32>) = (2, None);
const COUNTRIES: (usize, Option<u32>) = (3, None);
const RUNTIMES: (usize, Option<u32>) = (1, None);
const ACTORS: (usize, Option<u32>) = (3, Some(10));
const DIRECTORS: (usize, Option<u32>) = (3, Some(5));
const GENRES: (usize, Option<u32>) = (3, Some(20));

/// One recommended entity and its composite score.
#[derive(Debug, Clone, PartialEq)]
pub struct Pick {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct Recommendation {
    pub weight: Weight,
    pub months: Vec<Pick>,
    pub countries: Vec<Pick>,
    pub runtimes: Vec<Pick>,
    pub actors: Vec<Pick>,
    pub directors: Vec<Pick>,
    pub genres: Vec<Pick>,
    /// Categories that could not be ranked at all.
    pub unavailable: Vec<SelectError>,
}

/// Build the recommendation. A category with fewer qualifying rows than
/// requested contributes what it has; an unranked category contributes nothing.
pub fn recommend(scored: &ScoredDatasets) -> Recommendation {
    let mut unavailable = Vec::new();
    let mut pick = |dataset: Dataset, (n, min): (usize, Option<u32>)| {
        let table = scored.tables.get(dataset);
        match picks(table, n, min) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Recommendation: {e}");
                unavailable.push(e);
                Vec::new()
            }
        }
    };

    let months = pick(Dataset::Monthly, MONTHS);
    let countries = pick(Dataset::Countries, COUNTRIES);
    let runtimes = pick(Dataset::Runtime, RUNTIMES);
    let actors = pick(Dataset::Actors, ACTORS);
    let directors = pick(Dataset::Directors, DIRECTORS);
    let genres = pick(Dataset::Genres, GENRES);

    Recommendation {
        weight: scored.weight,
        months,
        countries,
        runtimes,
        actors,
        directors,
        genres,
        unavailable,
    }
}

fn picks(table: &Table, n: usize, min: Option<u32>) -> Result<Vec<Pick>, SelectError> {
    Ok(top_rows(table, min, n)?
        .into_iter()
        .map(|r| Pick {
            label: table.label(r),
            score: r.number(SCORE_COLUMN).unwrap_or(0.0),
        })
        .collect())
}

fn join(picks: &[Pick]) -> String {
    if picks.is_empty() {
        "no qualifying entries".to_string()
    } else {
        picks.iter().map(|p| p.label.as_str()).collect::<Vec<_>>().join(", ")
    }
}

impl Recommendation {
    /// Markdown-style bullet list stating both weights.
    pub fn narrative(&self) -> String {
        let w = self.weight;
        let min = |c: (usize, Option<u32>)| c.1.unwrap_or(0);
        let mut lines = vec![format!(
            "Based on the composite score (IMDb: {:.1}, movie count: {:.1}):",
            w.quality(),
            w.volume()
        )];
        lines.push(format!(
            "- Release in: {} to balance high IMDb ratings with a large volume of releases.",
            join(&self.months)
        ));
        lines.push(format!(
            "- Partner with countries: {} (ranked by composite score).",
            join(&self.countries)
        ));
        lines.push(format!(
            "- Choose a runtime of: {} to optimize ratings and movie volume.",
            join(&self.runtimes)
        ));
        lines.push(format!(
            "- Cast actors: {} (at least {} movies).",
            join(&self.actors),
            min(ACTORS)
        ));
        lines.push(format!(
            "- Directors to approach: {} (at least {} movies).",
            join(&self.directors),
            min(DIRECTORS)
        ));
        lines.push(format!(
            "- Recommended genres: {} (at least {} movies).",
            join(&self.genres),
            min(GENRES)
        ));
        lines.join("\n")
    }

    /// Top entity of months, countries, runtime and genres. Actors and
    /// directors are not plotted; empty categories drop their axis.
    pub fn radar_points(&self) -> Vec<&Pick> {
        [&self.months, &self.countries, &self.runtimes, &self.genres]
            .into_iter()
            .filter_map(|picks| picks.first())
            .collect()
    }

    pub fn radar_chart(&self) -> ChartSpec {
        let rows: Vec<Row> = self
            .radar_points()
            .into_iter()
            .map(|p| {
                let mut fields = Map::new();
                fields.insert("Category".into(), Value::from(p.label.clone()));
                fields.insert("Score".into(), Value::from(p.score));
                Row::new(fields)
            })
            .collect();
        ChartSpec::new(
            ChartKind::Radar,
            "Strategy summary (composite score)",
            "Category",
            "Score",
            rows,
        )
    }
}
