//! Line-oriented dashboard session. Each control change re-renders the
//! current view from the memoized tables.

use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};

use crate::api::HttpClient;
use crate::dashboard::Dashboard;
use crate::report;
use crate::select::ViewParams;
use crate::views::{self, View};

pub const PROMPT: &str = ">> ";

#[derive(Parser)]
#[command(name = "", no_binary_name = true, disable_help_flag = true)]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Switch to a view and render it.
    View {
        #[arg(value_enum)]
        view: View,
    },

    /// Set the IMDb weight (0.0 to 1.0, movie count gets the rest).
    Weight { value: f64 },

    /// Point the session at another API base URL.
    Url { base_url: String },

    /// Number of countries on the countries view (5 to 20).
    TopCountries { n: u32 },

    /// Minimum movies per actor (1 to 50).
    MinActorMovies { n: u32 },

    /// Minimum movies per director (1 to 50).
    MinDirectorMovies { n: u32 },

    /// Minimum movies per genre (1 to 100).
    MinGenreMovies { n: u32 },

    /// Fetch all datasets again.
    Refresh,

    /// Show the current controls.
    Params,

    /// Close the session.
    #[command(alias = "quit")]
    Exit,
}

enum Outcome {
    Render,
    Quiet,
    Exit,
}

/// Run the session until `exit` or end of input.
pub fn run<C, R, W>(dashboard: &mut Dashboard<C>, input: R, out: &mut W) -> io::Result<()>
where
    C: HttpClient,
    R: BufRead,
    W: Write,
{
    let mut current = View::Launch;
    render(dashboard, current, out)?;

    write!(out, "{PROMPT}")?;
    out.flush()?;
    for line in input.lines() {
        let line = line?;
        match execute(dashboard, &mut current, line.trim(), out)? {
            Outcome::Exit => return Ok(()),
            Outcome::Render => render(dashboard, current, out)?,
            Outcome::Quiet => {}
        }
        write!(out, "{PROMPT}")?;
        out.flush()?;
    }
    writeln!(out)?;
    Ok(())
}

fn execute<C: HttpClient, W: Write>(
    dashboard: &mut Dashboard<C>,
    current: &mut View,
    line: &str,
    out: &mut W,
) -> io::Result<Outcome> {
    if line.is_empty() {
        return Ok(Outcome::Quiet);
    }

    let args = shlex::split(line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());
    let cli = match InnerCli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            writeln!(out, "{}", e.render())?;
            return Ok(Outcome::Quiet);
        }
    };

    let params = *dashboard.params();
    let changed = match cli.command {
        InnerCommand::View { view } => {
            *current = view;
            Ok(())
        }
        InnerCommand::Weight { value } => dashboard.set_weight(value),
        InnerCommand::Url { base_url } => {
            dashboard.set_base_url(&base_url);
            Ok(())
        }
        InnerCommand::TopCountries { n } => dashboard.set_params(ViewParams {
            top_countries: n,
            ..params
        }),
        InnerCommand::MinActorMovies { n } => dashboard.set_params(ViewParams {
            min_actor_movies: n,
            ..params
        }),
        InnerCommand::MinDirectorMovies { n } => dashboard.set_params(ViewParams {
            min_director_movies: n,
            ..params
        }),
        InnerCommand::MinGenreMovies { n } => dashboard.set_params(ViewParams {
            min_genre_movies: n,
            ..params
        }),
        InnerCommand::Refresh => {
            dashboard.refresh();
            Ok(())
        }
        InnerCommand::Params => {
            write_params(dashboard, *current, out)?;
            return Ok(Outcome::Quiet);
        }
        InnerCommand::Exit => return Ok(Outcome::Exit),
    };

    match changed {
        Ok(()) => Ok(Outcome::Render),
        Err(e) => {
            writeln!(out, "Error: {e}")?;
            Ok(Outcome::Quiet)
        }
    }
}

fn render<C: HttpClient, W: Write>(
    dashboard: &mut Dashboard<C>,
    view: View,
    out: &mut W,
) -> io::Result<()> {
    writeln!(out, "{}", views::header(dashboard.params()))?;
    writeln!(out)?;
    match dashboard.render(view) {
        Ok(panel) => write!(out, "{}", report::format_panel(&panel)),
        Err(e) => {
            log::warn!("Render of {view} failed: {e}");
            writeln!(out, "Error loading data: {e}")
        }
    }
}

fn write_params<C: HttpClient, W: Write>(
    dashboard: &Dashboard<C>,
    view: View,
    out: &mut W,
) -> io::Result<()> {
    let p = dashboard.params();
    writeln!(out, "API:                 {}", dashboard.base_url())?;
    writeln!(out, "View:                {}", view.slug())?;
    writeln!(out, "IMDb weight:         {}", p.weight)?;
    writeln!(out, "Top countries:       {}", p.top_countries)?;
    writeln!(out, "Min actor movies:    {}", p.min_actor_movies)?;
    writeln!(out, "Min director movies: {}", p.min_director_movies)?;
    writeln!(out, "Min genre movies:    {}", p.min_genre_movies)?;
    let memo = dashboard.loader().memo();
    writeln!(out, "Cached datasets:     {} ({} hits, {} misses)", memo.len(), memo.hits(), memo.misses())?;
    Ok(())
}
