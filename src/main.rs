mod cli;
mod config;
mod dedup;
mod error;
mod extract;
mod frontmatter;
mod hook;
mod logging;
mod state;
mod storage;
mod store;
mod tasks;
mod timestamp;
mod types;

use clap::Parser;
use cli::Cli;
use config::Config;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let dir = cli.dir.clone();
    let result = Config::load()
        .map(|config| match dir {
            Some(dir) => config.with_sessions_dir(dir),
            None => config,
        })
        .map_err(anyhow::Error::from)
        .and_then(|config| cli::run(cli, &config));

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("session-log: {err:#}");
            ExitCode::FAILURE
        }
    }
}
