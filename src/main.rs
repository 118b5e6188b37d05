use clap::Parser;
use gvm::cli::{Cli, CommandHandler, OutputFormat};
use std::process;
use tracing_subscriber::EnvFilter;

/// 日志输出到 stderr，级别由 `GVM_LOG` / `RUST_LOG` 控制，`--verbose` 提升到 debug
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("gvm=debug")
    } else {
        EnvFilter::try_from_env("GVM_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("gvm=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let handler = match CommandHandler::new(OutputFormat::from_flag(cli.json)) {
        Ok(handler) => handler,
        Err(e) => {
            eprint!("{}", e.user_message());
            process::exit(1);
        }
    };

    match handler.handle_command(cli.command).await {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprint!("{}", e.user_message());
            process::exit(1);
        }
    }
}
