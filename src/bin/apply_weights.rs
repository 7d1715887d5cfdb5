//! CLI front-end mirroring the original `ApplyWeights` executable: read
//! back a weights file and score every row of a source sample as
//! `(weight, weight_err)`.

use std::fs;
use std::path::PathBuf;

use clap::Parser;

use mlreweight::codec::read_forests;
use mlreweight::config::Method;
use mlreweight::ensemble::Ensemble;
use mlreweight::row::{InMemoryRows, RowCursor};
use mlreweight::ReweighterError;

#[derive(Clone, Debug, clap::ValueEnum)]
enum MethodArg {
    Bdt,
    Rf,
    Et,
}

impl From<MethodArg> for Method {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Bdt => Method::Bdt,
            MethodArg::Rf => Method::Rf,
            MethodArg::Et => Method::Et,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Apply a trained weights file to a source sample")]
struct Args {
    /// Weights file produced by `calculate-weights`.
    #[arg(long)]
    weights: PathBuf,

    /// Comma-delimited source sample, with a header row.
    #[arg(long)]
    source: PathBuf,

    /// Ensemble method the weights file was trained with.
    #[arg(long, value_enum)]
    method: MethodArg,

    #[arg(long, default_value = "weight")]
    event_weight_variable: String,
}

fn run(args: Args) -> Result<(), ReweighterError> {
    let text = fs::read_to_string(&args.weights).map_err(|e| ReweighterError::Codec {
        line: 0,
        message: format!("failed to read '{}': {e}", args.weights.display()),
    })?;
    let forests = read_forests(&text)?;
    let ensemble = Ensemble {
        method: args.method.clone().into(),
        forests,
    };

    let mut source = InMemoryRows::from_csv(&args.source, &args.event_weight_variable)?;
    println!("row,weight,weight_err");
    for i in 0..source.row_count() {
        let (weight, error) = ensemble.infer(&mut source, i)?;
        println!("{i},{weight},{error}");
    }
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
