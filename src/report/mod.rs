//! Terminal rendering of dashboard panels.

pub mod html;

use std::fmt::Write as _;

use serde_json::Value;

use crate::chart::{ChartKind, ChartSpec};
use crate::table::Row;
use crate::views::Panel;

const LABEL_WIDTH: usize = 28;
const VALUE_WIDTH: usize = 12;

/// Cell text for a JSON value: integers plain, other numbers to two places.
fn cell(v: Option<&Value>) -> String {
    match v {
        Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 => format!("{f:.0}"),
            (None, Some(f)) => format!("{f:.2}"),
            _ => n.to_string(),
        },
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Cut to `width` characters, ending in "..." when shortened.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let head: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

/// Fields shown as value columns after the label, in display order.
fn value_fields(chart: &ChartSpec) -> Vec<&str> {
    let mut fields = vec![chart.y.as_str()];
    let extra = [
        chart.bar_text.as_deref(),
        chart.size.as_deref(),
        chart.color.as_deref(),
    ];
    for f in extra.into_iter().flatten().chain(chart.hover_data.iter().map(String::as_str)) {
        if !fields.contains(&f) && f != chart.x {
            fields.push(f);
        }
    }
    fields
}

/// One chart as a fixed-width text table.
pub fn format_chart(chart: &ChartSpec) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", chart.title);

    if chart.rows.is_empty() {
        let _ = writeln!(out, "  (no qualifying entries)");
        return out;
    }

    let fields = value_fields(chart);
    let _ = write!(out, "{:<LABEL_WIDTH$}", truncate(chart.axis_label(&chart.x), LABEL_WIDTH));
    for f in &fields {
        let _ = write!(out, " {:>VALUE_WIDTH$}", truncate(chart.axis_label(f), VALUE_WIDTH));
    }
    out.push('\n');
    let _ = writeln!(out, "{}", "-".repeat(LABEL_WIDTH + fields.len() * (VALUE_WIDTH + 1)));

    for row in ordered_rows(chart) {
        let label = cell(row.get(&chart.x));
        let _ = write!(out, "{:<LABEL_WIDTH$}", truncate(&label, LABEL_WIDTH));
        for f in &fields {
            let _ = write!(out, " {:>VALUE_WIDTH$}", cell(row.get(f)));
        }
        out.push('\n');
    }

    for a in &chart.annotations {
        let _ = writeln!(out, "  * {}: {}", cell(Some(&a.x)), a.text);
    }
    out
}

/// Rows in the order the chart draws them: explicit category order when set
/// (line and box charts), otherwise as given.
fn ordered_rows(chart: &ChartSpec) -> Vec<&Row> {
    let mut rows: Vec<_> = chart.rows.iter().collect();
    if let (Some(order), ChartKind::Line | ChartKind::Box) = (&chart.category_order, chart.kind) {
        let pos = |r: &Row| {
            let label = cell(r.get(&chart.x));
            order.iter().position(|o| *o == label).unwrap_or(order.len())
        };
        rows.sort_by_key(|r| pos(*r));
    }
    rows
}

/// A whole panel: title, charts, narrative and notices.
pub fn format_panel(panel: &Panel) -> String {
    let mut out = String::new();
    let title = panel.view.title();
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));
    out.push('\n');

    for chart in &panel.charts {
        out.push_str(&format_chart(chart));
        out.push('\n');
    }

    if let Some(text) = &panel.narrative {
        let _ = writeln!(out, "{text}");
        out.push('\n');
    }

    for notice in &panel.notices {
        let _ = writeln!(out, "! {notice}");
    }
    out
}

pub fn print_panel(panel: &Panel) {
    print!("{}", format_panel(panel));
}

/// Plotly figures of a panel as one JSON document.
pub fn panel_json(panel: &Panel) -> Value {
    serde_json::json!({
        "view": panel.view.slug(),
        "title": panel.view.title(),
        "figures": panel.charts.iter().map(ChartSpec::to_plotly).collect::<Vec<_>>(),
        "narrative": panel.narrative,
        "notices": panel.notices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::tests::sample;
    use crate::score::{Weight, score_all};
    use crate::select::ViewParams;
    use crate::views::{View, build};

    fn panel(view: View) -> Panel {
        let scored = score_all(&sample(), Weight::default());
        build(view, &scored, &ViewParams::default())
    }

    #[test]
    fn test_cell_formatting() {
        assert_eq!(cell(Some(&Value::from(12))), "12");
        assert_eq!(cell(Some(&Value::from(6.75))), "6.75");
        assert_eq!(cell(Some(&Value::from(3.0))), "3");
        assert_eq!(cell(Some(&Value::from("USA"))), "USA");
        assert_eq!(cell(None), "-");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Gérard Depardieu", 40), "Gérard Depardieu");
        assert_eq!(truncate("Gérard Depardieu", 8), "Gérar...");
        assert_eq!(truncate("Gérard Depardieu", 8).chars().count(), 8);
    }

    #[test]
    fn test_countries_table() {
        let text = format_panel(&panel(View::Countries));
        assert!(text.starts_with("Producing countries\n"));
        assert!(text.contains("Country"));
        assert!(text.contains("IMDb rating"));
        assert!(text.contains("USA"));
        assert!(text.contains("Japan"));
    }

    #[test]
    fn test_line_chart_rows_in_calendar_order() {
        let p = panel(View::Launch);
        let line = p.charts.iter().find(|c| c.kind == ChartKind::Line).unwrap();
        let text = format_chart(line);
        let jan = text.find("January").unwrap();
        let may = text.find("May").unwrap();
        let oct = text.find("October").unwrap();
        assert!(jan < may && may < oct);
    }

    #[test]
    fn test_summary_has_narrative() {
        let text = format_panel(&panel(View::Summary));
        assert!(text.contains("Based on the composite score (IMDb: 0.6, movie count: 0.4):"));
    }

    #[test]
    fn test_empty_chart() {
        let chart = ChartSpec::new(ChartKind::Bar, "Genres", "_id", "avgImdbRating", Vec::new());
        assert!(format_chart(&chart).contains("(no qualifying entries)"));
    }

    #[test]
    fn test_panel_json() {
        let v = panel_json(&panel(View::Runtime));
        assert_eq!(v["view"], "runtime");
        assert_eq!(v["figures"].as_array().unwrap().len(), 2);
        assert!(v["figures"][0]["data"].is_array());
    }
}
