//! The six dashboard views. Each turns scored datasets plus the user's
//! controls into a `Panel`: one or two charts, optional narrative, notices.

use std::fmt;

use clap::ValueEnum;

use crate::chart::{ChartKind, ChartSpec};
use crate::recommend::recommend;
use crate::score::{SCORE_COLUMN, ScoredDatasets};
use crate::select::{
    MONTH_ORDER, SelectError, ViewParams, rank, ranked_with_min, runtime_order, top_n,
    upper_quartile,
};
use crate::table::{Dataset, RATING_COLUMN, Row, TOMATOES_COLUMN, Table};

/// Number of leading actors/directors labelled on the scatter plots.
const TALENT_ANNOTATIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum View {
    /// Release timing by month
    #[value(alias = "months", alias = "timing")]
    Launch,
    /// Producing countries
    Countries,
    /// Runtime ranges
    Runtime,
    /// Actors and directors
    #[value(alias = "actors", alias = "directors")]
    Talent,
    /// Genres
    Genres,
    /// Aggregate recommendation
    #[value(alias = "recommend")]
    Summary,
}

impl View {
    pub const ALL: [View; 6] = [
        View::Launch,
        View::Countries,
        View::Runtime,
        View::Talent,
        View::Genres,
        View::Summary,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Launch => "Launch timing",
            Self::Countries => "Producing countries",
            Self::Runtime => "Runtime and ratings",
            Self::Talent => "Actors & directors",
            Self::Genres => "Genres",
            Self::Summary => "Aggregate recommendation",
        }
    }

    /// Datasets whose notices belong on this view.
    pub fn datasets(&self) -> &'static [Dataset] {
        match self {
            Self::Launch => &[Dataset::Monthly],
            Self::Countries => &[Dataset::Countries],
            Self::Runtime => &[Dataset::Runtime],
            Self::Talent => &[Dataset::Actors, Dataset::Directors],
            Self::Genres => &[Dataset::Genres],
            Self::Summary => &Dataset::ALL,
        }
    }

    /// Stable identifier, also used as the HTML anchor.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Launch => "launch",
            Self::Countries => "countries",
            Self::Runtime => "runtime",
            Self::Talent => "talent",
            Self::Genres => "genres",
            Self::Summary => "summary",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Everything one view renders.
#[derive(Debug, Clone)]
pub struct Panel {
    pub view: View,
    pub charts: Vec<ChartSpec>,
    pub narrative: Option<String>,
    pub notices: Vec<String>,
}

impl Panel {
    fn new(view: View, scored: &ScoredDatasets) -> Self {
        let notices = view
            .datasets()
            .iter()
            .flat_map(|d| scored.notices_for(*d))
            .collect();
        Self {
            view,
            charts: Vec::new(),
            narrative: None,
            notices,
        }
    }

    /// Add a chart, or a notice explaining why it was skipped.
    fn push(&mut self, chart: Result<ChartSpec, SelectError>) {
        match chart {
            Ok(c) => self.charts.push(c),
            Err(e) => self.notices.push(format!("Chart skipped: {e}")),
        }
    }
}

/// Dashboard header line stating the current weights.
pub fn header(params: &ViewParams) -> String {
    format!(
        "IMDb weight: {:.1} (quality), movie count weight: {:.1} (volume)",
        params.weight.quality(),
        params.weight.volume()
    )
}

/// Build one view.
pub fn build(view: View, scored: &ScoredDatasets, params: &ViewParams) -> Panel {
    let mut panel = Panel::new(view, scored);
    let t = &scored.tables;
    match view {
        View::Launch => {
            panel.push(months_bar(&t.monthly));
            panel.push(Ok(months_line(&t.monthly)));
        }
        View::Countries => {
            panel.push(countries_bar(&t.countries, params.top_countries));
        }
        View::Runtime => {
            let order = runtime_order(&t.runtime);
            panel.push(Ok(runtime_box(&t.runtime, &order)));
            panel.push(runtime_bar(&t.runtime, &order));
        }
        View::Talent => {
            panel.push(talent_scatter(&t.actors, "Actors", params.min_actor_movies));
            panel.push(talent_scatter(&t.directors, "Directors", params.min_director_movies));
        }
        View::Genres => {
            panel.push(genres_bar(&t.genres, params.min_genre_movies));
        }
        View::Summary => {
            let rec = recommend(scored);
            panel.narrative = Some(rec.narrative());
            panel.charts.push(rec.radar_chart());
        }
    }
    panel
}

/// Build all six views in tab order.
pub fn build_all(scored: &ScoredDatasets, params: &ViewParams) -> Vec<Panel> {
    View::ALL.iter().map(|v| build(*v, scored, params)).collect()
}

fn owned(rows: Vec<&Row>) -> Vec<Row> {
    rows.into_iter().cloned().collect()
}

fn months_bar(table: &Table) -> Result<ChartSpec, SelectError> {
    let rows = owned(rank(table)?);
    Ok(ChartSpec::new(
        ChartKind::Bar,
        "Average comments per movie by month (ordered by composite score)",
        "monthName",
        "avgCommentsPerMovie",
        rows,
    )
    .label("avgCommentsPerMovie", "Average comments per movie")
    .label("monthName", "Month")
    .label(SCORE_COLUMN, "Composite score")
    .bar_text("totalMoviesReleased")
    .color(SCORE_COLUMN)
    .tick_angle(45))
}

/// IMDb rating per month in calendar order; months scoring above the upper
/// quartile are annotated. Without scores the line is drawn unannotated.
fn months_line(table: &Table) -> ChartSpec {
    let mut chart = ChartSpec::new(
        ChartKind::Line,
        "Average IMDb rating by month",
        "monthName",
        RATING_COLUMN,
        table.rows.clone(),
    )
    .label(RATING_COLUMN, "IMDb rating")
    .label("monthName", "Month")
    .category_order(&MONTH_ORDER);

    let scores: Vec<f64> = table.rows.iter().filter_map(|r| r.number(SCORE_COLUMN)).collect();
    if let Some(threshold) = upper_quartile(&scores) {
        for row in &table.rows {
            if row.number(SCORE_COLUMN).is_some_and(|s| s > threshold) {
                let rating = row.number(RATING_COLUMN).unwrap_or(0.0);
                let count = row.text("totalMoviesReleased").unwrap_or_default();
                chart.annotate(row, format!("{rating:.1} ({count} movies)"));
            }
        }
    }
    chart
}

fn countries_bar(table: &Table, n: u32) -> Result<ChartSpec, SelectError> {
    let rows = owned(top_n(rank(table)?, n as usize));
    Ok(ChartSpec::new(
        ChartKind::Bar,
        format!("Top {n} countries (composite score)"),
        "country",
        RATING_COLUMN,
        rows,
    )
    .label(RATING_COLUMN, "IMDb rating")
    .label("country", "Country")
    .label(SCORE_COLUMN, "Composite score")
    .bar_text("totalMovies")
    .color(SCORE_COLUMN)
    .tick_angle(45))
}

fn runtime_box(table: &Table, order: &[String]) -> ChartSpec {
    ChartSpec::new(
        ChartKind::Box,
        "IMDb rating distribution by runtime",
        "runtimeRange",
        RATING_COLUMN,
        table.rows.clone(),
    )
    .label("runtimeRange", "Runtime (minutes)")
    .label(RATING_COLUMN, "IMDb rating")
    .label("totalMovies", "Movies")
    .hover_data("totalMovies")
    .category_order(order)
}

fn runtime_bar(table: &Table, order: &[String]) -> Result<ChartSpec, SelectError> {
    let rows = owned(rank(table)?);
    Ok(ChartSpec::new(
        ChartKind::Bar,
        "Average IMDb rating by runtime (ordered by composite score)",
        "runtimeRange",
        RATING_COLUMN,
        rows,
    )
    .label("runtimeRange", "Runtime (minutes)")
    .label(RATING_COLUMN, "Average IMDb rating")
    .label(SCORE_COLUMN, "Composite score")
    .bar_text("totalMovies")
    .color(SCORE_COLUMN)
    .category_order(order))
}

fn talent_scatter(table: &Table, who: &str, min: u32) -> Result<ChartSpec, SelectError> {
    let ranked = ranked_with_min(table, min)?;
    let label_col = table.dataset.label_column();
    let count_col = table.dataset.count_column();

    let mut chart = ChartSpec::new(
        ChartKind::Scatter,
        format!("{who}: IMDb vs Tomatoes rating (≥ {min} movies)"),
        RATING_COLUMN,
        TOMATOES_COLUMN,
        owned(ranked.clone()),
    )
    .label(RATING_COLUMN, "IMDb rating")
    .label(TOMATOES_COLUMN, "Tomatoes rating")
    .label(SCORE_COLUMN, "Composite score")
    .size(count_col)
    .color(SCORE_COLUMN)
    .hover_name(label_col);

    for row in top_n(ranked, TALENT_ANNOTATIONS) {
        let name = table.label(row);
        let count = row.text(count_col).unwrap_or_default();
        chart.annotate(row, format!("{name} ({count} movies)"));
    }
    Ok(chart)
}

fn genres_bar(table: &Table, min: u32) -> Result<ChartSpec, SelectError> {
    let rows = owned(ranked_with_min(table, min)?);
    Ok(ChartSpec::new(
        ChartKind::Bar,
        format!("Genres: average IMDb rating (≥ {min} movies)"),
        "_id",
        RATING_COLUMN,
        rows,
    )
    .label("_id", "Genre")
    .label(RATING_COLUMN, "IMDb rating")
    .label(SCORE_COLUMN, "Composite score")
    .bar_text("totalMovies")
    .color(SCORE_COLUMN)
    .tick_angle(45))
}
