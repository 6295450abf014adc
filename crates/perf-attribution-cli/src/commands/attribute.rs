use chrono::NaiveDate;
use clap::Args;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use perf_attribution_core::pipeline::{run_attribution, AttributionRequest, AttributionTables};
use perf_attribution_core::tables::{read_classifications, read_holdings};
use perf_attribution_core::Origin;

use crate::input;

/// Arguments for an attribution run
#[derive(Args)]
pub struct AttributeArgs {
    /// Path to a JSON or YAML request file
    #[arg(long)]
    pub config: Option<String>,

    /// Portfolio holdings CSV
    #[arg(long)]
    pub portfolios: Option<String>,

    /// Benchmark holdings CSV
    #[arg(long)]
    pub benchmarks: Option<String>,

    /// Classifications CSV
    #[arg(long)]
    pub classifications: Option<String>,

    /// Brinson-Fachler, Brinson-Hood-Beebower or "Fixed Income attribution"
    #[arg(long)]
    pub model: Option<String>,

    /// Classification criterion, e.g. "GICS sector" or "S&P rating"
    #[arg(long)]
    pub criterion: Option<String>,

    /// Fixed-income effects, comma separated, in display order
    #[arg(long, value_delimiter = ',')]
    pub effects: Vec<String>,

    /// Portfolio to include (repeatable)
    #[arg(long = "portfolio")]
    pub selected_portfolios: Vec<String>,

    /// Benchmark to compare against
    #[arg(long = "benchmark")]
    pub selected_benchmark: Option<String>,

    /// Link periods dated after this day (YYYY-MM-DD)
    #[arg(long)]
    pub reference_date: Option<NaiveDate>,

    /// Classification value to break down by instrument
    #[arg(long)]
    pub drill_down: Option<String>,

    /// Linking method: grap or carino
    #[arg(long)]
    pub linking: Option<String>,

    /// Include the per-period tables in the output
    #[arg(long)]
    pub periods: bool,
}

/// Input table locations, when given in the request file.
#[derive(Debug, Default, Deserialize)]
struct DataFiles {
    portfolios: Option<String>,
    benchmarks: Option<String>,
    classifications: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunConfig {
    #[serde(flatten)]
    request: AttributionRequest,
    #[serde(default)]
    data: DataFiles,
}

pub fn run_attribute(args: AttributeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let base: Option<RunConfig> = if let Some(ref path) = args.config {
        Some(input::file::read_config(path)?)
    } else {
        input::stdin::read_stdin()?
    };
    let (request, data) = merge(&args, base)?;
    debug!(?request, "attribution request");

    let portfolios_path = args
        .portfolios
        .or(data.portfolios)
        .ok_or("--portfolios <file.csv> or data.portfolios in the request is required")?;
    let benchmarks_path = args
        .benchmarks
        .or(data.benchmarks)
        .ok_or("--benchmarks <file.csv> or data.benchmarks in the request is required")?;
    let classifications_path = args
        .classifications
        .or(data.classifications)
        .ok_or("--classifications <file.csv> or data.classifications in the request is required")?;

    let tables = AttributionTables {
        portfolios: read_holdings(input::file::open(&portfolios_path)?, Origin::Portfolio)?,
        benchmarks: read_holdings(input::file::open(&benchmarks_path)?, Origin::Benchmark)?,
        classifications: read_classifications(input::file::open(&classifications_path)?)?,
    };

    let result = run_attribution(&request, &tables)?;
    let mut value = serde_json::to_value(result)?;
    if !args.periods {
        strip_periods(&mut value);
    }
    Ok(value)
}

/// Flags override the request file; without one, flags form the request.
fn merge(
    args: &AttributeArgs,
    base: Option<RunConfig>,
) -> Result<(AttributionRequest, DataFiles), Box<dyn std::error::Error>> {
    let (mut request, data) = match base {
        Some(config) => (config.request, config.data),
        None => {
            let request = AttributionRequest {
                model: args
                    .model
                    .clone()
                    .ok_or("--model is required without --config")?,
                criterion: args
                    .criterion
                    .clone()
                    .ok_or("--criterion is required without --config")?,
                effects: Vec::new(),
                selected_portfolios: Vec::new(),
                selected_benchmark: args
                    .selected_benchmark
                    .clone()
                    .ok_or("--benchmark is required without --config")?,
                reference_date: None,
                drill_down: None,
                linking: None,
                tolerance: None,
            };
            (request, DataFiles::default())
        }
    };

    if let Some(ref model) = args.model {
        request.model = model.clone();
    }
    if let Some(ref criterion) = args.criterion {
        request.criterion = criterion.clone();
    }
    if !args.effects.is_empty() {
        request.effects = args.effects.clone();
    }
    if !args.selected_portfolios.is_empty() {
        request.selected_portfolios = args.selected_portfolios.clone();
    }
    if let Some(ref benchmark) = args.selected_benchmark {
        request.selected_benchmark = benchmark.clone();
    }
    if args.reference_date.is_some() {
        request.reference_date = args.reference_date;
    }
    if args.drill_down.is_some() {
        request.drill_down = args.drill_down.clone();
    }
    if args.linking.is_some() {
        request.linking = args.linking.clone();
    }

    Ok((request, data))
}

/// Drop the per-date tables, keeping only the linked ones.
fn strip_periods(value: &mut Value) {
    if let Some(result) = value.get_mut("result").and_then(Value::as_object_mut) {
        result.remove("periods");
        if let Some(drill) = result.get_mut("drill_down").and_then(Value::as_object_mut) {
            drill.remove("periods");
        }
    }
}
