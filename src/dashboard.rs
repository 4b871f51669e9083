//! One dashboard session: the current API, the user's controls and the loader.
//!
//! Every render re-runs load, score and build. Loading is memoized per URL so
//! changing the weight or a threshold only re-scores.

use crate::api::{FetchError, HttpClient, Loader};
use crate::score::{ScoredDatasets, score_all};
use crate::select::{ParamError, ViewParams};
use crate::views::{self, Panel, View};

pub struct Dashboard<C: HttpClient> {
    loader: Loader<C>,
    base_url: String,
    params: ViewParams,
    refresh_next: bool,
}

impl<C: HttpClient> Dashboard<C> {
    pub fn new(loader: Loader<C>, base_url: &str, params: ViewParams) -> Self {
        Self {
            loader,
            base_url: base_url.trim().to_string(),
            params,
            refresh_next: false,
        }
    }

    pub fn params(&self) -> &ViewParams {
        &self.params
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn loader(&self) -> &Loader<C> {
        &self.loader
    }

    /// Replace the controls. Invalid values leave the current ones in place.
    pub fn set_params(&mut self, params: ViewParams) -> Result<(), ParamError> {
        self.params = params.validate()?;
        Ok(())
    }

    pub fn set_weight(&mut self, weight: f64) -> Result<(), ParamError> {
        self.params = self.params.with_weight(weight)?;
        Ok(())
    }

    /// Point the session at another API. Cached tables are dropped on the next load.
    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = base_url.trim().to_string();
    }

    /// Drop the memo and bypass the disk cache on the next load.
    pub fn refresh(&mut self) {
        self.loader.invalidate();
        self.refresh_next = true;
    }

    /// Load (or reuse) all six tables and score them with the current weight.
    pub fn scored(&mut self) -> Result<ScoredDatasets, FetchError> {
        let refresh = std::mem::take(&mut self.refresh_next);
        let datasets = match self.loader.load(&self.base_url, refresh) {
            Ok(d) => d,
            Err(e) => {
                self.refresh_next = refresh;
                return Err(e);
            }
        };
        Ok(score_all(&datasets, self.params.weight))
    }

    /// Render one view. A fetch failure renders nothing.
    pub fn render(&mut self, view: View) -> Result<Panel, FetchError> {
        let scored = self.scored()?;
        Ok(views::build(view, &scored, &self.params))
    }

    /// Render all six views from one load.
    pub fn render_all(&mut self) -> Result<Vec<Panel>, FetchError> {
        let scored = self.scored()?;
        Ok(views::build_all(&scored, &self.params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::StubClient;
    use crate::recommend::tests::sample;
    use crate::score::SCORE_COLUMN;
    use crate::table::Dataset;

    const BASE: &str = "http://localhost:8000";

    fn dashboard() -> Dashboard<StubClient> {
        let loader = Loader::new(StubClient::serving(BASE, &sample()));
        Dashboard::new(loader, BASE, ViewParams::default())
    }

    fn calls(d: &Dashboard<StubClient>) -> usize {
        d.loader().client().calls.get()
    }

    #[test]
    fn test_render_every_view() {
        let mut d = dashboard();
        let panels = d.render_all().unwrap();
        assert_eq!(panels.len(), 6);
        assert!(panels.iter().all(|p| !p.charts.is_empty()));
        let summary = panels.iter().find(|p| p.view == View::Summary).unwrap();
        assert!(summary.narrative.is_some());
    }

    #[test]
    fn test_weight_change_rescores_without_refetch() {
        let mut d = dashboard();
        let first = d.scored().unwrap();
        d.set_weight(1.0).unwrap();
        let second = d.scored().unwrap();
        assert_eq!(calls(&d), 6);
        assert_eq!(second.weight.quality(), 1.0);

        let score = |s: &ScoredDatasets| {
            s.tables.countries.rows.iter().map(|r| r.number(SCORE_COLUMN)).collect::<Vec<_>>()
        };
        assert_ne!(score(&first), score(&second));
    }

    #[test]
    fn test_invalid_weight_keeps_previous() {
        let mut d = dashboard();
        assert!(d.set_weight(2.0).is_err());
        assert!(d.set_weight(0.35).is_err());
        assert_eq!(d.params().weight.quality(), 0.6);

        // The stated weight is the one used for scoring
        d.set_weight(0.1 * 3.0).unwrap();
        let scored = d.scored().unwrap();
        assert_eq!(scored.weight.quality(), 0.3);
        let header = crate::views::header(d.params());
        assert_eq!(header, "IMDb weight: 0.3 (quality), movie count weight: 0.7 (volume)");
        let bad = ViewParams {
            top_countries: 99,
            ..ViewParams::default()
        };
        assert!(d.set_params(bad).is_err());
        assert_eq!(d.params().top_countries, 10);
    }

    #[test]
    fn test_refresh_refetches_once() {
        let mut d = dashboard();
        d.render(View::Genres).unwrap();
        d.refresh();
        d.render(View::Genres).unwrap();
        d.render(View::Genres).unwrap();
        assert_eq!(calls(&d), 12);
    }

    #[test]
    fn test_unreachable_api_renders_nothing() {
        let mut d = dashboard();
        d.set_base_url("http://nowhere:1");
        assert!(d.render(View::Summary).is_err());
        assert!(d.loader().memo().is_empty());

        d.set_base_url(BASE);
        assert!(d.render(View::Summary).is_ok());
    }

    #[test]
    fn test_base_url_whitespace_is_ignored() {
        let loader = Loader::new(StubClient::serving(BASE, &sample()));
        let mut d = Dashboard::new(loader, "  http://localhost:8000/\n", ViewParams::default());
        assert_eq!(d.base_url(), "http://localhost:8000/");
        assert!(d.render(View::Summary).is_ok());

        d.set_base_url(" http://localhost:8000 ");
        d.render(View::Genres).unwrap();
        assert_eq!(calls(&d), 6);
    }

    #[test]
    fn test_missing_column_is_a_notice_not_a_failure() {
        let mut data = sample();
        for row in &mut data.genres.rows {
            *row = crate::table::Row::new(
                row.columns()
                    .filter(|c| *c != "totalMovies")
                    .filter_map(|c| row.get(c).map(|v| (c.to_string(), v.clone())))
                    .collect(),
            );
        }
        let loader = Loader::new(StubClient::serving(BASE, &data));
        let mut d = Dashboard::new(loader, BASE, ViewParams::default());
        let panel = d.render(View::Genres).unwrap();
        assert!(panel.charts.is_empty());
        assert!(panel.notices.iter().any(|n| n.starts_with("Error:")));
        assert!(panel.notices.iter().any(|n| n.starts_with("Chart skipped:")));
        // Other datasets still score
        let scored = d.scored().unwrap();
        assert!(scored.tables.get(Dataset::Countries).has_column(SCORE_COLUMN));
    }
}
