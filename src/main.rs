use clap::Parser;
use gray_batch::cli::{execute_run, Cli};
use gray_batch::BatchError;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn setup_logging(verbose: bool) {
    let default = if verbose {
        "gray_batch=debug,warn"
    } else {
        "gray_batch=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match execute_run(&cli) {
        // 個別ジョブの失敗はサマリーに出力済み。バッチ自体は完走している
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ エラー: {e:#}");
            match e.downcast_ref::<BatchError>() {
                Some(batch) if batch.is_configuration() => ExitCode::from(1),
                _ => ExitCode::from(3),
            }
        }
    }
}
