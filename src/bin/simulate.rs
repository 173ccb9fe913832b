//! Run a branch trace through a predictor and report its accuracy
use anyhow::Context;
use branch_predictor::{
    ConditionalBranchPredictor, Predictor, PredictorConfig, Simulator, format_percent,
    get_progress_style, read_trace, read_trace_from,
};
use clap::Parser;
use cli_table::{Cell, Table, print_stdout};
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to trace file, reads stdin if omitted
    #[arg(short, long)]
    trace_path: Option<PathBuf>,

    /// Predictor: static, gshare:<ghist>, tournament:<ghist>:<lhist>:<pcindex> or custom:<ghist>:<choice>
    #[arg(short, long, default_value = "static", conflicts_with = "config")]
    predictor: PredictorConfig,

    /// Path to a toml predictor config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Warmup count in branches
    #[arg(short, long, default_value = "0")]
    warmup: u64,

    /// Print the most mispredicted branches
    #[arg(short, long)]
    verbose: bool,

    /// Path to result json
    #[arg(short, long)]
    output_path: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();

    let config = match &args.config {
        Some(path) => PredictorConfig::load(path)?,
        None => args.predictor,
    };
    let mut predictor = Predictor::new(config)
        .with_context(|| format!("Invalid predictor configuration {config}"))?;

    let records = match &args.trace_path {
        Some(path) => read_trace(path)?,
        None => read_trace_from(std::io::stdin().lock())?,
    };
    info!("Loaded {} branches", records.len());

    let pbar = indicatif::ProgressBar::new(records.len() as u64);
    pbar.set_style(get_progress_style());

    let mut simulator = Simulator::new(args.warmup);
    for (i, record) in records.iter().enumerate() {
        simulator.step(&mut predictor, record);
        if i % 65536 == 0 {
            pbar.set_position(i as u64);
        }
    }
    pbar.finish_and_clear();

    let result = simulator.finish(predictor.name(), Some(config), args.trace_path.clone());

    println!("{}", predictor.name());
    println!("Branches:        {:>10}", result.total_branches);
    println!("Incorrect:       {:>10}", result.total_mispred_count);
    println!("Misprediction Rate: {:>7.3}", result.misprediction_rate);

    if args.verbose {
        println!("Top branches by misprediction count:");
        let mut table = vec![];
        for info in result.top_mispredicted(10) {
            table.push(vec![
                format!("0x{:08x}", info.pc).cell(),
                info.execution_count.cell(),
                info.mispred_count.cell(),
                format_percent(info.taken_rate(), 2).cell(),
                format_percent(info.misprediction_rate(), 2).cell(),
            ]);
        }
        let table = table.table().title(vec![
            "Branch PC".cell(),
            "Execution Count".cell(),
            "Misprediction Count".cell(),
            "Taken Rate".cell(),
            "Misprediction Rate".cell(),
        ]);
        print_stdout(table)?;
    }

    if let Some(output_path) = &args.output_path {
        std::fs::write(output_path, serde_json::to_vec(&result)?)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        println!("Result written to {}", output_path.display());
    }

    Ok(())
}
