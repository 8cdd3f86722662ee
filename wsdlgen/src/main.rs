use std::{fs::File, io::Write};

use structopt::StructOpt;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

use wsdlgen_codegen as codegen;

#[derive(Debug, Error)]
enum Error {
    #[error("Error generating code")]
    Generate(#[from] codegen::Error),

    #[error("Error writing output")]
    IoError(#[from] std::io::Error),
}

#[derive(StructOpt)]
#[structopt(about = "Generates a Rust SOAP client from a WSDL document")]
struct Args {
    #[structopt(short, long, default_value = "./output.rs")]
    output: String,

    #[structopt(short, long, default_value = "myservice")]
    package: String,

    /// Fail on XSD primitives without a Rust mapping
    #[structopt(long)]
    strict: bool,

    #[structopt(short, long)]
    verbose: bool,

    input: String,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(args: Args) -> Result<(), Error> {
    let config = codegen::Config::new(args.package).deny_unmapped_primitives(args.strict);
    let artifacts = codegen::generate(&args.input, &config)?;

    for warning in artifacts.warnings() {
        warn!("{}", warning);
    }

    let mut file = File::create(&args.output)?;
    write!(&mut file, "{}", artifacts.concatenate())?;

    info!(output = %args.output, "wrote generated client");
    Ok(())
}

fn main() {
    let args = Args::from_args();
    init_logging(args.verbose);

    if let Err(err) = run(args) {
        eprintln!("{}", err);

        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }

        std::process::exit(1);
    }
}
