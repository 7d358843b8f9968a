use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};

use clap::Parser;

use ipset_rs::bdd::Bdd;
use ipset_rs::ipset::IpSet;

/// Render a binary IP set as a GraphViz graph of its decision diagram.
#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Input file ("-" for stdin).
    #[arg(short, long, value_name = "FILE", default_value = "-")]
    input: String,

    /// Output file ("-" for stdout).
    #[arg(short, long, value_name = "FILE", default_value = "-")]
    output: String,

    /// Show debug output.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show errors.
    #[arg(short, long)]
    quiet: bool,
}

fn open_input(name: &str) -> io::Result<Box<dyn Read>> {
    if name == "-" {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(BufReader::new(File::open(name)?)))
    }
}

fn open_output(name: &str) -> io::Result<Box<dyn Write>> {
    if name == "-" {
        Ok(Box::new(BufWriter::new(io::stdout())))
    } else {
        Ok(Box::new(BufWriter::new(File::create(name)?)))
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    let level = if args.verbose {
        simplelog::LevelFilter::Debug
    } else if args.quiet {
        simplelog::LevelFilter::Error
    } else {
        simplelog::LevelFilter::Warn
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let mut bdd = Bdd::new();
    let mut input = open_input(&args.input)?;
    let set = IpSet::load(&mut bdd, &mut input)?;

    let mut output = open_output(&args.output)?;
    let dot = bdd.to_dot(set.root())?;
    output.write_all(dot.as_bytes())?;
    output.flush()?;
    Ok(())
}
