use include_gardener::cli::parse;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let cli = parse();

    // RUST_LOG wins over -v/-q when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("include_gardener={}", cli.log_level())));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();

    let code = include_gardener::app::run_cli(cli);
    if code != 0 {
        std::process::exit(code);
    }
}
