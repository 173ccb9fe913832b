//! Compare simulation results of several predictors or traces
use branch_predictor::{SimulateResult, format_percent};
use clap::Parser;
use cli_table::{Cell, Table, print_stdout};
use std::{fs::File, io::BufReader, path::PathBuf};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Simulate result paths
    #[arg(short, long, required = true)]
    simulate_path: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();

    let mut table = vec![];
    let mut rates = vec![];
    for input_file in &args.simulate_path {
        log::info!("Loading simulation result from {}", input_file.display());
        let result: SimulateResult =
            serde_json::from_reader(BufReader::new(File::open(input_file)?))?;

        let trace = result
            .trace_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        let config = result
            .config
            .map(|config| config.to_string())
            .unwrap_or_else(|| result.predictor.clone());

        rates.push(result.misprediction_rate);
        table.push(vec![
            trace.cell(),
            config.cell(),
            result.total_branches.cell(),
            result.total_mispred_count.cell(),
            format_percent(result.misprediction_rate, 3).cell(),
        ]);
    }

    table.push(vec![
        "Average".cell(),
        "".cell(),
        "".cell(),
        "".cell(),
        format_percent(rates.iter().sum::<f64>() / rates.len() as f64, 3).cell(),
    ]);

    let table = table.table().title(vec![
        "Trace".cell(),
        "Predictor".cell(),
        "Branches".cell(),
        "Incorrect".cell(),
        "Misprediction Rate".cell(),
    ]);
    print_stdout(table)?;

    Ok(())
}
