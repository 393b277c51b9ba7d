use anyhow::Result;
use broker_migrate::cli::commands::migrate::{MigrateCommand, MigrateCommandHandler};
use broker_migrate::cli::commands::status::{StatusCommand, StatusCommandHandler};
use broker_migrate::cli::{Cli, Commands};
use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // CLIをパースして実行
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // sqlx::Any で使用するドライバを登録
    sqlx::any::install_default_drivers();

    // 非同期ランタイムを作成して実行
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: Failed to create Tokio runtime: {}", e);
            process::exit(1);
        }
    };

    let result = runtime.block_on(run_command(cli));

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// ログ出力を初期化する
///
/// RUST_LOG が設定されていればそれを優先します。
fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "broker_migrate=debug"
    } else {
        "broker_migrate=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// コマンドを実行する
async fn run_command(cli: Cli) -> Result<String> {
    match cli.command {
        Commands::Migrate { lookup_timeout } => {
            let handler = MigrateCommandHandler::new();
            let command = MigrateCommand {
                config_path: cli.config,
                env: cli.env,
                lookup_timeout,
            };
            handler.execute(&command).await
        }

        Commands::Status => {
            let handler = StatusCommandHandler::new();
            let command = StatusCommand {
                config_path: cli.config,
                env: cli.env,
            };
            handler.execute(&command).await
        }
    }
}
