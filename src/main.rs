use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Once;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use unseen_formats::compare::{compare, Collection};
use unseen_formats::report::{
    render_table, write_accumulation_csv, write_extensions_json, write_fit_csv, write_fit_json,
};
use unseen_formats::source::{JsonLines, JsonMap, YamlIndex};
use unseen_formats::{
    accumulate, fit_accumulation, AnalysisConfig, RegistryCollection, SourceFormat,
};

/// Environment variable overriding the `-v` log level, e.g. `UNSEEN_FORMATS_LOG=unseen_formats=debug`
const LOG_ENV: &str = "UNSEEN_FORMATS_LOG";

static INIT: Once = Once::new();

#[derive(Parser)]
#[command(name = "unseen-formats", version, about = "Estimate how many file formats exist using a species accumulation curve")]
struct Cli {
    /// Logging level; repeat for more output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the registries and compute the species accumulation curve
    Curve(CurveArgs),
    /// Compare an observed extension collection (CSV) with the registries
    Compare {
        #[command(flatten)]
        input: InputArgs,
        /// CSV file with `extension,file_count` columns
        csv_file: PathBuf,
    },
    /// Write the normalized registry extensions out as a JSON map
    Extensions {
        #[command(flatten)]
        input: InputArgs,
        /// JSON file to write
        json_file: PathBuf,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Registry extensions file (.json, .jsonl or .yml/.yaml)
    input_file: PathBuf,

    /// Input format; detected from the file name when omitted
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// TOML analysis configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Drop registries without usable extensions instead of failing
    #[arg(long)]
    skip_empty: bool,
}

#[derive(Args)]
struct CurveArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Lower bound of the fitted curve domain
    #[arg(long)]
    lower: Option<u64>,

    /// Upper bound of the fitted curve domain, the extrapolation target
    #[arg(long)]
    upper: Option<u64>,

    /// Use the observed range of `total_exts` as the curve domain
    #[arg(long, conflicts_with_all = ["lower", "upper"])]
    observed_range: bool,

    /// Number of evaluation points along the curve
    #[arg(long)]
    steps: Option<usize>,

    /// Normal quantile for the confidence band
    #[arg(long)]
    z: Option<f64>,

    /// Directory for the output files; defaults to the input file's directory
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Jsonl,
    Yaml,
}

impl From<FormatArg> for SourceFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => JsonMap.into(),
            FormatArg::Jsonl => JsonLines.into(),
            FormatArg::Yaml => YamlIndex.into(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Curve(args) => run_curve(args),
        Command::Compare { input, csv_file } => run_compare(input, &csv_file),
        Command::Extensions { input, json_file } => run_extensions(input, &json_file),
    }
}

fn init_tracing(verbose: u8) {
    INIT.call_once(|| {
        let default_level = match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        };
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    });
}

impl InputArgs {
    fn config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_path(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => AnalysisConfig::default(),
        };
        config.skip_empty_registries |= self.skip_empty;
        Ok(config)
    }

    fn load(&self, config: &AnalysisConfig) -> Result<RegistryCollection> {
        let format = self
            .format
            .map(SourceFormat::from)
            .unwrap_or_else(|| SourceFormat::detect(&self.input_file));
        let registries = format
            .load_path(&self.input_file)
            .with_context(|| format!("failed to load {}", self.input_file.display()))?;

        Ok(if config.skip_empty_registries {
            registries.without_empty()
        } else {
            registries
        })
    }
}

fn run_curve(args: CurveArgs) -> Result<()> {
    let mut config = args.input.config()?;
    if args.observed_range {
        config.fit.lower_bound = None;
        config.fit.upper_bound = None;
    }
    if let Some(lower) = args.lower {
        config.fit.lower_bound = Some(lower);
    }
    if let Some(upper) = args.upper {
        config.fit.upper_bound = Some(upper);
    }
    if let Some(steps) = args.steps {
        config.fit.steps = steps;
    }
    if let Some(z) = args.z {
        config.fit.confidence_z = z;
    }

    let registries = args.input.load(&config)?;
    let table = accumulate(&registries).context("failed to build accumulation table")?;
    let fit = fit_accumulation(&table, &config.fit).context("failed to fit accumulation curve")?;

    let input_file = &args.input.input_file;
    let out_dir = args.out_dir.as_deref();
    let table_path = output_path(input_file, out_dir, "species.csv");
    let curve_path = output_path(input_file, out_dir, "species.fit.csv");
    let fit_path = output_path(input_file, out_dir, "species.fit.json");

    write_accumulation_csv(&table, create(&table_path)?)
        .with_context(|| format!("failed to write {}", table_path.display()))?;
    write_fit_csv(&fit, create(&curve_path)?)
        .with_context(|| format!("failed to write {}", curve_path.display()))?;
    write_fit_json(&fit, create(&fit_path)?)
        .with_context(|| format!("failed to write {}", fit_path.display()))?;
    info!(
        table = %table_path.display(),
        curve = %curve_path.display(),
        fit = %fit_path.display(),
        "wrote outputs"
    );

    println!("{}", render_table(table.rows()));
    println!();
    println!("Fit: y = {:.2}ln(x) + {:.2}", fit.a, fit.b);
    if let Some(estimate) = fit.estimate() {
        println!(
            "Estimate at x = {:.0}: {:.0} distinct extensions ({:.0} to {:.0})",
            estimate.x, estimate.y_fit, estimate.y_lower, estimate.y_upper
        );
    }
    Ok(())
}

fn run_compare(input: InputArgs, csv_file: &Path) -> Result<()> {
    let config = input.config()?;
    let registries = input.load(&config)?;
    let file = File::open(csv_file).with_context(|| format!("failed to open {}", csv_file.display()))?;
    let collection = Collection::from_csv(file)
        .with_context(|| format!("failed to read collection {}", csv_file.display()))?;

    let rows = compare(&registries, &collection)?;
    println!("{}", render_table(&rows));
    Ok(())
}

fn run_extensions(input: InputArgs, json_file: &Path) -> Result<()> {
    let config = input.config()?;
    let registries = input.load(&config)?;
    write_extensions_json(&registries, create(json_file)?)
        .with_context(|| format!("failed to write {}", json_file.display()))?;
    info!(path = %json_file.display(), registries = registries.len(), "wrote extensions");
    Ok(())
}

/// `<out_dir or input dir>/<input stem>.<suffix>`
fn output_path(input: &Path, out_dir: Option<&Path>, suffix: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str()).to_string_lossy();
    let name = format!("{stem}.{suffix}");
    match out_dir.or_else(|| input.parent()) {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}
