use clap::Parser;
use papertrade::cli::{Cli, init_tracing, run};

fn main() -> std::process::ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();
    run(Cli::parse())
}
