//! Declarative chart specifications and their Plotly projection.
//!
//! A `ChartSpec` names the fields each visual channel is bound to and carries
//! the rows it draws. `to_plotly` turns it into a figure object that
//! `Plotly.newPlot` accepts verbatim.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};

use crate::table::Row;

/// Largest marker diameter (px) for sized scatter points.
const MAX_MARKER_PX: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
    Box,
    Scatter,
    Radar,
}

/// A labelled arrow pointing at one data point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub x: Value,
    pub y: Value,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    /// Field on the category / horizontal axis (theta for radar).
    pub x: String,
    /// Field on the value / vertical axis (radius for radar).
    pub y: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Field printed on bars as "N movies".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bar_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hover_data: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_order: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_angle: Option<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    pub rows: Vec<Row>,
}

impl ChartSpec {
    pub fn new(kind: ChartKind, title: impl Into<String>, x: &str, y: &str, rows: Vec<Row>) -> Self {
        Self {
            kind,
            title: title.into(),
            x: x.to_string(),
            y: y.to_string(),
            color: None,
            size: None,
            bar_text: None,
            hover_name: None,
            hover_data: Vec::new(),
            labels: BTreeMap::new(),
            category_order: None,
            tick_angle: None,
            annotations: Vec::new(),
            rows,
        }
    }

    pub fn color(mut self, field: &str) -> Self {
        self.color = Some(field.to_string());
        self
    }

    pub fn size(mut self, field: &str) -> Self {
        self.size = Some(field.to_string());
        self
    }

    pub fn bar_text(mut self, field: &str) -> Self {
        self.bar_text = Some(field.to_string());
        self
    }

    pub fn hover_name(mut self, field: &str) -> Self {
        self.hover_name = Some(field.to_string());
        self
    }

    pub fn hover_data(mut self, field: &str) -> Self {
        self.hover_data.push(field.to_string());
        self
    }

    pub fn label(mut self, field: &str, text: &str) -> Self {
        self.labels.insert(field.to_string(), text.to_string());
        self
    }

    pub fn category_order<S: AsRef<str>>(mut self, order: &[S]) -> Self {
        self.category_order = Some(order.iter().map(|s| s.as_ref().to_string()).collect());
        self
    }

    pub fn tick_angle(mut self, degrees: i32) -> Self {
        self.tick_angle = Some(degrees);
        self
    }

    pub fn annotate(&mut self, row: &Row, text: String) {
        self.annotations.push(Annotation {
            x: row.get(&self.x).cloned().unwrap_or(Value::Null),
            y: row.get(&self.y).cloned().unwrap_or(Value::Null),
            text,
        });
    }

    /// Display label for a field, falling back to the field name.
    pub fn axis_label<'a>(&'a self, field: &'a str) -> &'a str {
        self.labels.get(field).map(String::as_str).unwrap_or(field)
    }

    /// Values of one field across all rows, `null` where absent.
    pub fn column(&self, field: &str) -> Vec<Value> {
        self.rows
            .iter()
            .map(|r| r.get(field).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Project into a Plotly figure: `{"data": [...], "layout": {...}}`.
    pub fn to_plotly(&self) -> Value {
        let trace = match self.kind {
            ChartKind::Bar => self.bar_trace(),
            ChartKind::Line => json!({
                "type": "scatter",
                "mode": "lines+markers",
                "x": self.column(&self.x),
                "y": self.column(&self.y),
            }),
            ChartKind::Box => self.box_trace(),
            ChartKind::Scatter => self.scatter_trace(),
            ChartKind::Radar => self.radar_trace(),
        };
        json!({ "data": [trace], "layout": self.layout() })
    }

    fn color_marker(&self) -> Option<Value> {
        self.color.as_ref().map(|field| {
            json!({
                "color": self.column(field),
                "colorscale": "Plasma",
                "showscale": true,
                "colorbar": { "title": { "text": self.axis_label(field) } },
            })
        })
    }

    fn bar_trace(&self) -> Value {
        let mut trace = json!({
            "type": "bar",
            "x": self.column(&self.x),
            "y": self.column(&self.y),
        });
        if let Some(field) = &self.bar_text {
            trace["text"] = Value::from(self.column(field));
            trace["texttemplate"] = json!("%{text} movies");
            trace["textposition"] = json!("auto");
        }
        if let Some(marker) = self.color_marker() {
            trace["marker"] = marker;
        }
        trace
    }

    fn box_trace(&self) -> Value {
        let mut trace = json!({
            "type": "box",
            "x": self.column(&self.x),
            "y": self.column(&self.y),
            "boxpoints": "all",
        });
        if !self.hover_data.is_empty() {
            let custom: Vec<Vec<Value>> = self
                .rows
                .iter()
                .map(|r| {
                    self.hover_data
                        .iter()
                        .map(|f| r.get(f).cloned().unwrap_or(Value::Null))
                        .collect()
                })
                .collect();
            let extra: String = self
                .hover_data
                .iter()
                .enumerate()
                .map(|(i, f)| format!("<br>{}: %{{customdata[{i}]}}", self.axis_label(f)))
                .collect();
            trace["customdata"] = json!(custom);
            trace["hovertemplate"] = json!(format!("%{{x}}: %{{y}}{extra}<extra></extra>"));
        }
        trace
    }

    fn scatter_trace(&self) -> Value {
        let mut trace = json!({
            "type": "scatter",
            "mode": "markers",
            "x": self.column(&self.x),
            "y": self.column(&self.y),
        });
        if let Some(field) = &self.hover_name {
            trace["text"] = Value::from(self.column(field));
            trace["hovertemplate"] = json!("<b>%{text}</b><br>%{x}, %{y}<extra></extra>");
        }
        let mut marker = self.color_marker().unwrap_or_else(|| json!({}));
        if let Some(field) = &self.size {
            let sizes: Vec<f64> = self
                .rows
                .iter()
                .map(|r| r.number(field).unwrap_or(0.0).max(0.0))
                .collect();
            let max = sizes.iter().copied().fold(0.0, f64::max);
            marker["size"] = json!(sizes);
            marker["sizemode"] = json!("area");
            if max > 0.0 {
                marker["sizeref"] = json!(2.0 * max / (MAX_MARKER_PX * MAX_MARKER_PX));
            }
        }
        trace["marker"] = marker;
        trace
    }

    fn radar_trace(&self) -> Value {
        let mut theta = self.column(&self.x);
        let mut r = self.column(&self.y);
        // Close the polygon back onto the first vertex.
        if let (Some(t0), Some(r0)) = (theta.first().cloned(), r.first().cloned()) {
            theta.push(t0);
            r.push(r0);
        }
        json!({
            "type": "scatterpolar",
            "mode": "lines",
            "theta": theta,
            "r": r,
            "fill": "toself",
        })
    }

    fn layout(&self) -> Value {
        let annotations: Vec<Value> = self
            .annotations
            .iter()
            .map(|a| json!({ "x": a.x, "y": a.y, "text": a.text, "showarrow": true }))
            .collect();

        let mut layout = json!({
            "title": { "text": self.title },
            "annotations": annotations,
        });

        if self.kind == ChartKind::Radar {
            layout["polar"] = json!({ "radialaxis": { "visible": true } });
            return layout;
        }

        let mut xaxis = json!({ "title": { "text": self.axis_label(&self.x) } });
        if let Some(angle) = self.tick_angle {
            xaxis["tickangle"] = json!(angle);
        }
        if let Some(order) = &self.category_order {
            xaxis["categoryorder"] = json!("array");
            xaxis["categoryarray"] = json!(order);
        }
        layout["xaxis"] = xaxis;
        layout["yaxis"] = json!({ "title": { "text": self.axis_label(&self.y) } });
        layout
    }
}
