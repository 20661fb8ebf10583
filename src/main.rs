#![forbid(unsafe_code)]

//! fosd — FPGA OSD engine CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run(&args) {
        eprintln!("fosd: {e}");
        if e.is_retryable() {
            eprintln!("fosd: transient failure, retry the command");
        }
        std::process::exit(e.exit_code());
    }
}
