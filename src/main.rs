use anyhow::Result;
use clap::Parser;

use mcasm::{
    assembler::{assemble, AssemblyArgs},
    instrumentation::{self, LogOptions, DEBUG_FLAGS},
};

#[derive(Parser)]
#[command(version, disable_version_flag = true)]
#[command(about = "Compile a microcode description into control-store ROM images")]
struct Cli {
    #[clap(long)]
    #[clap(help = "Enable chrome tracing")]
    #[clap(long_help = "Enable chrome tracing which on program exit will generate
a json file to be opened with a chrome tracing compatible
viewer.")]
    trace: bool,
    #[clap(short, long)]
    #[clap(num_args = 0..=1, require_equals = true, default_missing_value = DEBUG_FLAGS)]
    #[clap(value_parser = parse_debug_flags, value_name = "FLAGS")]
    #[clap(help = "Debug output: l(oader), p(arser), g(enerator), all when empty")]
    debug: Option<String>,
    #[clap(short, long, visible_alias = "quiet")]
    #[clap(help = "Only print warnings and errors")]
    silent: bool,
    #[clap(short = 'v', long, action = clap::ArgAction::Version)]
    #[clap(help = "Print version")]
    #[allow(dead_code)]
    version: Option<bool>,
    #[command(flatten)]
    args: AssemblyArgs,
}

fn parse_debug_flags(flags: &str) -> Result<String, String> {
    match flags.chars().find(|flag| !DEBUG_FLAGS.contains(*flag)) {
        Some(flag) => Err(format!("unknown debug flag '{}', expected any of '{}'", flag, DEBUG_FLAGS)),
        None => Ok(flags.to_owned()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _trace_guard = instrumentation::init(&LogOptions {
        debug: cli.debug.clone(),
        silent: cli.silent,
        trace: cli.trace,
    });

    assemble(&cli.args)
}
