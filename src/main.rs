mod archive;
mod batch;
mod error;
mod parser;
mod processor;
mod serialiser;
mod srt;
mod wrap;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::builder::TypedValueParser;
use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("An error occurred: {}", err);
            for cause in err.chain().skip(1) {
                eprintln!("    {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(ClapParser)]
#[command(about = "Rewrap the text of SRT subtitles to a maximum line width")]
struct Cli {
    #[arg(value_name = "DIR", help = "The directory containing the SRT files.")]
    dir: PathBuf,
    #[arg(short, long, help = "Also process SRT files in subdirectories.")]
    recursive: bool,
    #[arg(
        long = "no-zip",
        help = "Do not store the original files in backup.zip before rewriting them."
    )]
    no_zip: bool,
    #[arg(
        short,
        long,
        value_name = "CHARS",
        default_value_t = processor::DEFAULT_WIDTH,
        value_parser = clap::value_parser!(u16).range(1..).map(usize::from),
        help = "Maximum number of characters per subtitle line."
    )]
    width: usize,
    #[arg(long, help = "Enable verbose debug and trace logs.")]
    debug: bool,
}

fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("subwrap=trace,info")
        } else {
            EnvFilter::new("subwrap=info,warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns whether every file in the batch went through.
fn run(cli: Cli) -> Result<bool> {
    let opts = batch::Options {
        recursive: cli.recursive,
        archive: !cli.no_zip,
        wrap: processor::WrapOpts { width: cli.width },
    };

    let report = batch::run(&cli.dir, opts)?;
    Ok(report.is_success())
}
