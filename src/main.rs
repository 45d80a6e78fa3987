//! cf CLI application
//!
//! Command-line client for Cloud Foundry style backends: targets an API
//! endpoint, logs in against its identity service and runs a handful of
//! commands on the persisted session.

use std::process;

use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use cf_cli::cli::{report_parse_error, run, Cli, Ui};
use cf_cli::config::{EnvOverride, SessionState};

#[tokio::main]
async fn main() {
    let code = run_cli().await;
    process::exit(code);
}

/// Main application logic
async fn run_cli() -> i32 {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let env = EnvOverride::from_env();
    let stdout_is_tty = atty::is(atty::Stream::Stdout);
    // Persisted colour preference is applied once the state is loaded
    let mut ui = Ui::stdio(env.color_enabled(&SessionState::default(), stdout_is_tty));

    let args: Vec<String> = std::env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let cli = match Cli::try_parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => return report_parse_error(&e, &args, &mut ui),
    };

    init_logging(&cli, env.trace_enabled());
    info!("cf v{} starting", env!("CARGO_PKG_VERSION"));

    run(cli, env, &mut ui).await
}

/// Initialize logging based on CLI verbosity settings and CF_TRACE
fn init_logging(cli: &Cli, trace_enabled: bool) {
    let log_level = cli.log_level(trace_enabled);

    // Create environment filter
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("cf_cli={}", log_level).parse() {
        filter = filter.add_directive(directive);
    }

    // Stdout is reserved for command output
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .with_writer(std::io::stderr)
        .init();

    if trace_enabled {
        debug!("Request tracing enabled");
    }
}
