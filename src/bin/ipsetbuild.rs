use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use clap::Parser;

use ipset_rs::bdd::Bdd;
use ipset_rs::ipset::IpSet;
use ipset_rs::text;

/// Build a binary IP set from address-list files.
///
/// Each input file holds one address or CIDR network per line; a leading
/// '!' removes the entry, and lines starting with '#' or whitespace are
/// ignored.
#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Input files ("-" for stdin).
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<String>,

    /// Output file ("-" for stdout).
    #[arg(short, long, value_name = "FILE", default_value = "-")]
    output: String,

    /// Accept networks with host bits set, masking them off.
    #[arg(short = 'l', long)]
    loose_cidr: bool,

    /// Show debug output.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show errors.
    #[arg(short, long)]
    quiet: bool,
}

fn open_input(name: &str) -> io::Result<Box<dyn BufRead>> {
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
    let mut set = IpSet::new();
    let mut failed = false;

    for input in &args.inputs {
        let reader = match open_input(input) {
            Ok(reader) => reader,
            Err(e) => {
                eprintln!("{}: {}", input, e);
                failed = true;
                continue;
            }
        };
        let errors = text::read_into(&mut bdd, &mut set, reader, args.loose_cidr)?;
        for error in &errors {
            eprintln!("{}: {}", input, error);
        }
        failed |= !errors.is_empty();
    }

    log::info!("set uses {} bytes of memory", set.memory_size(&bdd));

    let mut output = open_output(&args.output)?;
    set.save(&bdd, &mut output)?;
    output.flush()?;

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
