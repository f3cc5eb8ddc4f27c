//! reportgen CLI entry point

use clap::Parser;

fn main() {
    let cli = reportgen::cli::Cli::parse();

    // Logs go to stderr so `--json` output on stdout stays machine-readable
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .try_init();

    reportgen::cli::run(cli);
}
