use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use integral_calculator::api::IntegralClient;
use integral_calculator::catalog::PREDEFINED_FUNCTIONS;
use integral_calculator::chart::{build_chart, ChartEngine, SvgChartEngine};
use integral_calculator::form::{parse_bound, FieldChange};
use integral_calculator::formula::{
  definite_integral, format_bound_text, format_expression, FormulaRenderer,
  MarkupEngine,
};
use integral_calculator::orchestrator::{FormOrchestrator, ViewState};
use integral_calculator::{calculate, IntegralBackend, Settings};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Backend base URL (overrides the config file)
  #[arg(long, global = true, env = "INTEGRAL_BACKEND_URL")]
  backend_url: Option<String>,

  /// Config file (default: <config dir>/integral-calculator/config.toml)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Calculate a definite integral once
  Calc {
    /// Function of x, e.g. "2x+1" or "sin(x)"
    expression: String,
    /// Lower limit (number, pi, e, ...)
    #[arg(long, allow_hyphen_values = true, value_parser = parse_bound_arg)]
    from: f64,
    /// Upper limit
    #[arg(long, allow_hyphen_values = true, value_parser = parse_bound_arg)]
    to: f64,
    /// Write the chart as SVG
    #[arg(long)]
    svg: Option<PathBuf>,
    /// Write the rendered formula as HTML
    #[arg(long)]
    html: Option<PathBuf>,
  },
  /// Check that the backend is reachable
  Probe,
  /// Show the local LaTeX preview of an expression
  Latex {
    expression: String,
    #[arg(
      long,
      allow_hyphen_values = true,
      value_parser = parse_bound_arg,
      requires = "to"
    )]
    from: Option<f64>,
    #[arg(
      long,
      allow_hyphen_values = true,
      value_parser = parse_bound_arg,
      requires = "from"
    )]
    to: Option<f64>,
  },
  /// List the predefined functions
  Catalog,
  /// Interactive mode: read field edits (key=value) from stdin
  Watch {
    /// Rewrite this SVG file after every successful calculation
    #[arg(long)]
    svg: Option<PathBuf>,
  },
}

fn parse_bound_arg(s: &str) -> Result<f64, String> {
  parse_bound(s).map_err(|e| e.to_string())
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
  let mut settings = match &cli.config {
    Some(path) => Settings::load_from(path)?,
    None => Settings::load()?,
  };
  if let Some(url) = &cli.backend_url {
    settings.backend_url = url.clone();
  }
  Ok(settings)
}

fn client(settings: &Settings) -> anyhow::Result<IntegralClient> {
  IntegralClient::with_timeout(
    &settings.backend_url,
    settings.request_timeout(),
  )
  .context("creating HTTP client")
}

fn main() -> anyhow::Result<()> {
  env_logger::Builder::from_env(
    env_logger::Env::default().default_filter_or("warn"),
  )
  .init();

  let cli = Cli::parse();
  let settings = load_settings(&cli)?;

  match &cli.command {
    Commands::Latex {
      expression,
      from,
      to,
    } => {
      match (from, to) {
        (Some(from), Some(to)) => {
          println!("{}", definite_integral(expression, *from, *to))
        }
        _ => println!("{}", format_expression(expression)),
      }
      Ok(())
    }
    Commands::Catalog => {
      for f in PREDEFINED_FUNCTIONS {
        println!(
          "{:<12} {:<14} {:<12} [{}, {}]  {}",
          f.id,
          f.display_name,
          f.expression,
          format_bound_text(f.lower),
          format_bound_text(f.upper),
          f.description
        );
      }
      Ok(())
    }
    Commands::Probe => runtime()?.block_on(run_probe(&settings)),
    Commands::Calc {
      expression,
      from,
      to,
      svg,
      html,
    } => runtime()?.block_on(run_calc(
      &settings,
      expression,
      *from,
      *to,
      svg.as_deref(),
      html.as_deref(),
    )),
    Commands::Watch { svg } => {
      runtime()?.block_on(run_watch(&settings, svg.as_deref()))
    }
  }
}

/// Everything runs on one thread.
fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
  Ok(
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()?,
  )
}

async fn run_probe(settings: &Settings) -> anyhow::Result<()> {
  let client = client(settings)?;
  if !client.test_connection().await {
    anyhow::bail!("Backend at {} is not available", client.base_url());
  }
  println!("Connected to {}", client.base_url());
  Ok(())
}

async fn run_calc(
  settings: &Settings,
  expression: &str,
  from: f64,
  to: f64,
  svg: Option<&Path>,
  html: Option<&Path>,
) -> anyhow::Result<()> {
  let client = client(settings)?;
  let response = calculate(&client, expression, from, to).await?;

  let spec = build_chart(&response, from, to);
  println!("{}", spec.title);
  println!("f(x) = {}", response.latex_expression);
  if let Some(error) = &response.error {
    eprintln!("Warning: {error}");
  }

  if let Some(path) = svg {
    let engine =
      SvgChartEngine::new(settings.chart.width, settings.chart.height);
    let chart = engine.construct(&spec)?;
    std::fs::write(path, chart.svg)
      .with_context(|| format!("writing {}", path.display()))?;
  }

  if let Some(path) = html {
    let renderer = FormulaRenderer::new(MarkupEngine::new().handle());
    std::fs::write(path, renderer.render(&response.latex_expression))
      .with_context(|| format!("writing {}", path.display()))?;
  }

  Ok(())
}

async fn run_watch(
  settings: &Settings,
  svg: Option<&Path>,
) -> anyhow::Result<()> {
  let orchestrator = FormOrchestrator::new(
    client(settings)?,
    FormulaRenderer::new(MarkupEngine::new().handle()),
    SvgChartEngine::new(settings.chart.width, settings.chart.height),
    settings,
  );

  let (tx, rx) = mpsc::channel(64);
  tokio::spawn(async move {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
      let line = line.trim();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }
      match line.parse::<FieldChange>() {
        Ok(change) => {
          if tx.send(change).await.is_err() {
            break;
          }
        }
        Err(e) => eprintln!("Error: {e}"),
      }
    }
  });

  let mut last_printed: Option<ViewState> = None;
  let mut presenter = |view: &ViewState| {
    if last_printed.as_ref() == Some(view) {
      return;
    }
    print_view(view);
    if let (Some(path), Some(chart)) = (svg, &view.chart) {
      if let Err(e) = std::fs::write(path, &chart.svg) {
        eprintln!("Error: writing {}: {e}", path.display());
      }
    }
    last_printed = Some(view.clone());
  };

  orchestrator.run(rx, &mut presenter).await;
  Ok(())
}

fn print_view(view: &ViewState) {
  let form = &view.form;
  let bound = |b: Option<f64>| b.map(format_bound_text).unwrap_or_default();
  println!(
    "[{:?}] f(x) = {}  on [{}, {}]",
    view.phase,
    form.expression,
    bound(form.lower),
    bound(form.upper)
  );
  if let Some(banner) = &view.banner {
    println!("  ! {banner}");
  }
  if form.touched.expression || form.touched.lower || form.touched.upper {
    for message in view.errors.messages() {
      println!("  - {message}");
    }
  }
  if let Some(chart) = &view.chart {
    println!("  {}", chart.spec.title);
  }
  if let Some(error) = &view.error {
    println!("  Error: {error}");
  }
}
