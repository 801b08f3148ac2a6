// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use autotest::cli::{Cli, Command};
use autotest::config::AutotestConfig;
use autotest::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_tracing(cli.global.log_level.as_deref(), &cli.global.log_format);

    let config = AutotestConfig::load(&cli.global.config);

    let exit_code = match dispatch(config, cli.command).await {
        Ok(code) => code,
        Err(e) => {
            error!("fatal: {e:#}");
            e.downcast_ref::<autotest::error::AutotestError>().map(|e| e.code.exit_code()).unwrap_or(1)
        }
    };

    std::process::exit(exit_code);
}

async fn dispatch(config: AutotestConfig, command: Command) -> anyhow::Result<i32> {
    match command {
        Command::Devices => {
            autotest::commands::devices::run(&config).await?;
            Ok(0)
        }
        Command::Run(args) => {
            let summary = autotest::commands::run::run(&config, args).await?;
            Ok(if summary.is_success() { 0 } else { 1 })
        }
        Command::Info(args) => {
            autotest::commands::info::run(&config, &args.serial).await?;
            Ok(0)
        }
        Command::Report(args) => {
            autotest::commands::report::run(&args.input_dir, &args.formats)?;
            Ok(0)
        }
        Command::Dashboard(args) => {
            autotest::commands::dashboard::run(&args.host, args.port, args.reports).await?;
            Ok(0)
        }
    }
}
