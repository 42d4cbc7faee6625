use anyhow::{Context, Result};
use chartdeck::config::{Dashboard, SourceDescriptor};
use chartdeck::dashboard::{render_dashboard, ChartOutcome};
use chartdeck::data::RowSet;
use chartdeck::export::{embed_snippet, json_sample, to_csv};
use chartdeck::graph::render_chart;
use chartdeck::range::slice_rows;
use chartdeck::session::{Session, SunburstMode};
use chartdeck::source::{resolve_source, HttpFetcher};
use chartdeck::{OutputFormat, RenderOptions};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_CONFIGS: [&str; 2] = ["assets/config.json", "assets/config.sample.json"];

#[derive(Parser, Debug)]
#[command(name = "chartdeck")]
#[command(about = "Render chart dashboards and build chart configs from tabular data", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render every chart of a config document to image, JSON and CSV files
    Dashboard {
        /// Config document (defaults to assets/config.json, then assets/config.sample.json)
        config: Option<PathBuf>,

        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Image format (png or svg)
        #[arg(long, default_value = "png")]
        format: OutputFormat,

        #[arg(long, default_value_t = 1280)]
        width: u32,

        #[arg(long, default_value_t = 720)]
        height: u32,
    },

    /// Load data, pick a chart and print the config document for it
    Playground(PlaygroundArgs),
}

#[derive(Args, Debug)]
struct PlaygroundArgs {
    /// CSV file to load (stdin is read when neither --csv nor --url is given)
    #[arg(long, conflicts_with = "url")]
    csv: Option<PathBuf>,

    /// CSV URL or Google Sheets link
    #[arg(long)]
    url: Option<String>,

    /// A1 range applied to the loaded rows (e.g. A1:D20)
    #[arg(long)]
    range: Option<String>,

    /// Google visualization query for Sheets links
    #[arg(long)]
    query: Option<String>,

    /// Chart type: bar, line, scatter, pie, combo, sunburst
    #[arg(long = "type")]
    chart_type: Option<String>,

    /// X column (pie: label column)
    #[arg(long)]
    x: Option<String>,

    /// Y column (pie: value column, combo: bar column)
    #[arg(long)]
    y: Option<String>,

    /// Second Y column (combo: line column)
    #[arg(long)]
    y2: Option<String>,

    #[arg(long)]
    group: Option<String>,

    /// Stack grouped bars
    #[arg(long)]
    stacked: bool,

    /// Sunburst path columns, outermost first (comma separated)
    #[arg(long, value_delimiter = ',')]
    path: Vec<String>,

    /// Sunburst value column
    #[arg(long)]
    value: Option<String>,

    /// Sunburst labels column (labels/parents mode)
    #[arg(long)]
    labels: Option<String>,

    /// Sunburst parents column (labels/parents mode)
    #[arg(long)]
    parents: Option<String>,

    /// Palette colours (comma separated)
    #[arg(long, value_delimiter = ',')]
    colors: Vec<String>,

    #[arg(long)]
    save_session: Option<PathBuf>,

    #[arg(long)]
    load_session: Option<PathBuf>,

    /// Write the preview image (.png or .svg)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write an HTML embed snippet
    #[arg(long)]
    embed: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Dashboard {
            config,
            out,
            format,
            width,
            height,
        } => {
            let options = RenderOptions {
                width,
                height,
                format,
            };
            run_dashboard(config, &out, &options)
        }
        Commands::Playground(args) => run_playground(args),
    }
}

fn run_dashboard(config: Option<PathBuf>, out: &Path, options: &RenderOptions) -> Result<()> {
    let path = match config {
        Some(path) => path,
        None => DEFAULT_CONFIGS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
            .with_context(|| format!("No config given and none of {:?} exist", DEFAULT_CONFIGS))?,
    };
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config '{}'", path.display()))?;
    let dashboard = Dashboard::from_json_str(&text)
        .with_context(|| format!("Invalid config '{}'", path.display()))?;
    info!(config = %path.display(), charts = dashboard.charts.len(), "loaded dashboard");

    // relative source paths resolve against the config's directory
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let fetcher = HttpFetcher::with_base_dir(base_dir);

    fs::create_dir_all(out)
        .with_context(|| format!("Failed to create output directory '{}'", out.display()))?;

    let outcomes = render_dashboard(&dashboard, &fetcher);
    let mut failed = 0;
    for outcome in &outcomes {
        if let Err(e) = write_outcome(outcome, out, options) {
            failed += 1;
            eprintln!("Error in chart '{}': {:#}", outcome.config.file_stem(), e);
        }
    }

    println!(
        "Rendered {} of {} charts into {}",
        outcomes.len() - failed,
        outcomes.len(),
        out.display()
    );
    Ok(())
}

fn write_outcome(outcome: &ChartOutcome, out: &Path, options: &RenderOptions) -> Result<()> {
    let spec = match &outcome.result {
        Ok(spec) => spec,
        Err(e) => anyhow::bail!("{}", e),
    };
    let stem = outcome.config.file_stem();

    write_file(&out.join(format!("{}.json", stem)), json_sample(outcome.config, &outcome.rows)?.as_bytes())?;
    write_file(&out.join(format!("{}.csv", stem)), to_csv(&outcome.rows)?.as_bytes())?;

    let image = render_chart(spec, options).context("Failed to render image")?;
    write_file(&out.join(format!("{}.{}", stem, options.format.extension())), &image)?;
    Ok(())
}

fn run_playground(args: PlaygroundArgs) -> Result<()> {
    let mut session = match &args.load_session {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read session '{}'", path.display()))?;
            Session::load(&text).context("Invalid session file")?
        }
        None => Session::new(),
    };

    if let Some(rows) = load_rows(&args)? {
        session.set_rows(rows);
    }
    apply_selection(&mut session, &args);

    if let Some(path) = &args.save_session {
        write_file(path, session.save()?.as_bytes())?;
    }

    let spec = session.build().context("Failed to build chart")?;

    let config = session.to_dashboard().to_json_pretty()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", config).context("Failed to write config to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    if let Some(path) = &args.output {
        let options = RenderOptions {
            format: image_format(path),
            ..Default::default()
        };
        let image = render_chart(&spec, &options).context("Failed to render preview")?;
        write_file(path, &image)?;
    }
    if let Some(path) = &args.embed {
        write_file(path, embed_snippet(&spec).as_bytes())?;
    }
    Ok(())
}

/// Rows from --csv, --url or stdin. A loaded session without a new data
/// source keeps its own rows.
fn load_rows(args: &PlaygroundArgs) -> Result<Option<RowSet>> {
    let source = if let Some(path) = &args.csv {
        SourceDescriptor {
            kind: "csv".to_string(),
            path: Some(path.display().to_string()),
            range: args.range.clone(),
            ..Default::default()
        }
    } else if let Some(url) = &args.url {
        // non-Sheets links pass through unchanged
        SourceDescriptor {
            kind: "google_sheet".to_string(),
            url: Some(url.clone()),
            range: args.range.clone(),
            query: args.query.clone(),
            ..Default::default()
        }
    } else if args.load_session.is_some() {
        return Ok(None);
    } else {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read CSV from stdin")?;
        let rows = RowSet::from_csv_str(&text).context("Failed to parse CSV from stdin")?;
        let rows = match args.range.as_deref() {
            Some(range) => slice_rows(&rows, range),
            None => rows,
        };
        return Ok(Some(rows));
    };

    let rows = resolve_source(Some(&source), &HttpFetcher::default()).context("Failed to load data")?;
    Ok(Some(rows))
}

fn apply_selection(session: &mut Session, args: &PlaygroundArgs) {
    let sel = &mut session.selection;
    let set = |field: &mut String, value: &Option<String>| {
        if let Some(v) = value {
            *field = v.clone();
        }
    };
    set(&mut sel.chart_type, &args.chart_type);
    set(&mut sel.x_col, &args.x);
    set(&mut sel.y_col, &args.y);
    set(&mut sel.y2_col, &args.y2);
    set(&mut sel.group_col, &args.group);
    set(&mut sel.sb_value_col, &args.value);
    set(&mut sel.sb_labels_col, &args.labels);
    set(&mut sel.sb_parents_col, &args.parents);
    if args.stacked {
        sel.stacked = true;
    }
    if !args.path.is_empty() {
        sel.sb_mode = SunburstMode::Path;
        sel.path_cols = args.path.clone();
    } else if args.labels.is_some() || args.parents.is_some() {
        sel.sb_mode = SunburstMode::Labels;
    }

    for (i, color) in args.colors.iter().enumerate() {
        session.set_color(i, color.clone());
    }
}

fn image_format(path: &Path) -> OutputFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("svg") => OutputFormat::Svg,
        _ => OutputFormat::Png,
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("Failed to write '{}'", path.display()))
}
