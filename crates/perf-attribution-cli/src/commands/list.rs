use clap::Args;
use serde_json::{json, Value};

use perf_attribution_core::classification::Criterion;
use perf_attribution_core::data_preparation::{available_benchmarks, available_portfolios};
use perf_attribution_core::models::ModelKind;
use perf_attribution_core::tables::read_holdings;
use perf_attribution_core::{FixedIncomeEffect, Origin};

use crate::input;

/// Arguments for listing what a run can select
#[derive(Args)]
pub struct ListArgs {
    /// Portfolio holdings CSV
    #[arg(long)]
    pub portfolios: Option<String>,

    /// Benchmark holdings CSV
    #[arg(long)]
    pub benchmarks: Option<String>,
}

pub fn run_list(args: ListArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let portfolios = match args.portfolios {
        Some(ref path) => available_portfolios(&read_holdings(
            input::file::open(path)?,
            Origin::Portfolio,
        )?),
        None => Vec::new(),
    };
    let benchmarks = match args.benchmarks {
        Some(ref path) => available_benchmarks(&read_holdings(
            input::file::open(path)?,
            Origin::Benchmark,
        )?),
        None => Vec::new(),
    };

    let models: Vec<&str> = [
        ModelKind::BrinsonFachler,
        ModelKind::BrinsonHoodBeebower,
        ModelKind::FixedIncome,
    ]
    .iter()
    .map(|m| m.name())
    .collect();
    let criteria: Vec<&str> = Criterion::ALL.iter().map(|c| c.name()).collect();
    let effects: Vec<&str> = FixedIncomeEffect::ALL.iter().map(|e| e.name()).collect();

    Ok(json!({
        "portfolios": portfolios,
        "benchmarks": benchmarks,
        "models": models,
        "criteria": criteria,
        "effects": effects,
    }))
}
