//! CLI front-end mirroring the original `CalculateWeights` executable:
//! load a config, load source/target samples, train an ensemble, and
//! write the result out as a weights file.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;

use mlreweight::codec::write_weights_file;
use mlreweight::config::Config;
use mlreweight::ensemble::{Ensemble, EnsembleParams};
use mlreweight::row::InMemoryRows;
use mlreweight::variable::VariableRegistry;
use mlreweight::{Context, ReweighterError};

#[derive(Parser, Debug)]
#[command(author, version, about = "Train a tree-ensemble reweighter from a config file")]
struct Args {
    /// Plain-text config file (`<type> <key> = <value>` lines).
    #[arg(long)]
    config: PathBuf,

    /// Comma-delimited source sample, with a header row.
    #[arg(long)]
    source: PathBuf,

    /// Comma-delimited target sample, with a header row.
    #[arg(long)]
    target: PathBuf,

    /// Where to write the trained weights file.
    #[arg(long)]
    output: PathBuf,
}

fn run(args: Args) -> Result<(), ReweighterError> {
    let config = Config::from_file(&args.config)?;
    let event_weight_variable = config
        .get_str("EventWeightVariableName")
        .unwrap_or("weight")
        .to_string();

    let mut registry = VariableRegistry::new();
    for name in config.get_list("Variables")? {
        registry.register(name.clone())?;
    }

    let ctx = Context::new(registry, config, event_weight_variable);

    let mut source = InMemoryRows::from_csv(&args.source, &ctx.event_weight_variable)?;
    let mut target = InMemoryRows::from_csv(&args.target, &ctx.event_weight_variable)?;

    let params = EnsembleParams::from_config(&ctx.config)?;
    log::info!(
        "training {} with {} trees over {} variables",
        params.method.as_str(),
        params.number_of_trees,
        ctx.registry.len()
    );
    let ensemble = Ensemble::train(&params, &ctx.registry, &mut source, &mut target)?;

    let file = File::create(&args.output).map_err(|e| ReweighterError::Codec {
        line: 0,
        message: format!("failed to create '{}': {e}", args.output.display()),
    })?;
    let mut writer = BufWriter::new(file);
    write_weights_file(&mut writer, &ensemble, &ctx.registry, &ctx.config).map_err(|e| ReweighterError::Codec {
        line: 0,
        message: e.to_string(),
    })?;

    log::info!("wrote weights file to {}", args.output.display());
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(err) = run(args) {
        log::error!("{err}");
        std::process::exit(1);
    }
}
