use std::{fs::File, io::Read, path::PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use core_cache::{
    backing::DelayedMemory,
    config::CacheConfig,
    sim::Simulator,
    trace::Trace,
};

#[cfg(feature = "stat")]
use terminal_size::terminal_size;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// run a stimulus trace against the cache
    Run(RunArgs),
    /// parse a stimulus trace and report its shape
    Parse(ParseArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// File path to input stimulus trace
    #[arg(short, long)]
    input: PathBuf,
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    delegate: CommonArgs,
    /// File path to a JSON cache config (overrides --ways/--cam-ways)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Cache associativity (power of two)
    #[arg(long, default_value_t = 4)]
    ways: usize,
    /// Outstanding-miss capacity
    #[arg(long = "cam-ways", default_value_t = 4)]
    cam_ways: usize,
    /// Backing store latency in ticks
    #[arg(long, default_value_t = 4)]
    latency: usize,
}

#[derive(Args, Debug)]
struct ParseArgs {
    #[command(flatten)]
    delegate: CommonArgs,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    match args.command {
        Command::Run(RunArgs {
            delegate: CommonArgs { input, verbose },
            config,
            ways,
            cam_ways,
            latency,
        }) => {
            init_logger(verbose);
            let trace = Trace::parse(&read_input(input)?)?;
            let config = match config {
                Some(p) => CacheConfig::from_json(&read_input(p)?)?,
                None => CacheConfig::new(ways, cam_ways)?,
            };
            let mut backing = DelayedMemory::new(latency);
            for &(address, data) in &trace.preload {
                backing.preload(address, data);
            }
            let mut sim = Simulator::new(&config, backing)?;
            sim.run_trace(&trace)?;
            log::info!("finished execution in {} ticks.", sim.cycle());
            output_stat(&sim);
            for resp in sim.delivered() {
                println!("{resp}");
            }
            Ok(())
        }
        Command::Parse(ParseArgs {
            delegate: CommonArgs { input, verbose },
        }) => {
            init_logger(verbose);
            let trace = Trace::parse(&read_input(input)?)?;
            println!(
                "{} preloaded words, {} events",
                trace.preload.len(),
                trace.events.len()
            );
            Ok(())
        }
    }
}

fn init_logger(verbose: bool) {
    if verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::init();
    }
}

#[cfg(not(feature = "stat"))]
fn output_stat<B>(_: &Simulator<B>) {}

#[cfg(feature = "stat")]
fn output_stat<B>(sim: &Simulator<B>) {
    let max_width = get_terminal_width().unwrap_or(120) as usize;
    log::info!("statistics:\n{}", sim.collect_stat().view(max_width));
}

#[cfg(feature = "stat")]
fn get_terminal_width() -> Option<u16> {
    terminal_size().map(|(w, _)| w.0 - 20)
}

fn read_input(input: PathBuf) -> Result<String> {
    let mut buf = String::new();
    let mut file = File::open(input)?;
    file.read_to_string(&mut buf)?;
    Ok(buf)
}
