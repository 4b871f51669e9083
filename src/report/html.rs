//! Single-page HTML export with Plotly.js figures.

use std::io::{self, Write};

use chrono::Local;
use serde_json::Value;

use crate::chart::ChartSpec;
use crate::select::ViewParams;
use crate::views::{self, Panel};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Escape text for element content and double-quoted attributes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON safe to embed inside a `<script>` element.
fn script_json(v: &Value) -> String {
    v.to_string().replace("</", "<\\/")
}

pub fn write<W: Write>(
    writer: &mut W,
    base_url: &str,
    params: &ViewParams,
    panels: &[Panel],
) -> io::Result<()> {
    let generated = Local::now().format("%Y-%m-%d %H:%M:%S");

    write!(writer, r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Movie Statistics Dashboard</title>
    <script src="{PLOTLY_CDN}"></script>
    <style>
        :root {{
            --bg: #0d1117;
            --card: #161b22;
            --border: #30363d;
            --text: #e6edf3;
            --dim: #7d8590;
            --warn: #d29922;
            --accent: #58a6ff;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
            background: var(--bg);
            color: var(--text);
            line-height: 1.5;
        }}
        .container {{ max-width: 1400px; margin: 0 auto; padding: 2rem; }}
        header {{ margin-bottom: 1.5rem; padding-bottom: 1rem; border-bottom: 1px solid var(--border); }}
        h1 {{ font-size: 2rem; font-weight: 800; }}
        .subtitle {{ color: var(--dim); }}
        nav {{ display: flex; gap: 1rem; margin-bottom: 2rem; flex-wrap: wrap; }}
        nav a {{ color: var(--accent); text-decoration: none; }}
        section {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 1.5rem;
            margin-bottom: 2rem;
        }}
        section h2 {{ margin-bottom: 1rem; }}
        .chart {{ width: 100%; min-height: 450px; margin-bottom: 1rem; }}
        .narrative {{ white-space: pre-wrap; margin: 1rem 0; }}
        .notice {{ color: var(--warn); font-size: 0.9rem; }}
    </style>
</head>
<body>
<div class="container">
<header>
    <h1>Movie Statistics Dashboard</h1>
    <div class="subtitle">{header}</div>
    <div class="subtitle">API: {api} &middot; generated {generated}</div>
</header>
<nav>
"#,
        header = escape(&views::header(params)),
        api = escape(base_url),
    )?;

    for panel in panels {
        writeln!(
            writer,
            r##"    <a href="#{}">{}</a>"##,
            panel.view.slug(),
            escape(panel.view.title())
        )?;
    }
    writeln!(writer, "</nav>")?;

    for panel in panels {
        write_panel(writer, panel)?;
    }

    writeln!(writer, "</div>\n</body>\n</html>")?;
    Ok(())
}

fn write_panel<W: Write>(writer: &mut W, panel: &Panel) -> io::Result<()> {
    let slug = panel.view.slug();
    writeln!(writer, r#"<section id="{slug}">"#)?;
    writeln!(writer, "    <h2>{}</h2>", escape(panel.view.title()))?;

    for (i, chart) in panel.charts.iter().enumerate() {
        write_chart(writer, &format!("{slug}-{i}"), chart)?;
    }

    if let Some(text) = &panel.narrative {
        writeln!(writer, r#"    <div class="narrative">{}</div>"#, escape(text))?;
    }
    for notice in &panel.notices {
        writeln!(writer, r#"    <p class="notice">{}</p>"#, escape(notice))?;
    }
    writeln!(writer, "</section>")?;
    Ok(())
}

fn write_chart<W: Write>(writer: &mut W, id: &str, chart: &ChartSpec) -> io::Result<()> {
    let figure = chart.to_plotly();
    writeln!(writer, r#"    <div class="chart" id="{id}"></div>"#)?;
    writeln!(
        writer,
        r#"    <script>(function () {{ const fig = {}; Plotly.newPlot("{id}", fig.data, fig.layout, {{responsive: true}}); }})();</script>"#,
        script_json(&figure)
    )?;
    Ok(())
}
