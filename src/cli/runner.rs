//! Command runner
//!
//! Loads the session, checks the command's requirement chain, dispatches to
//! its handler and turns the outcome into terminal output and an exit code.
//! Backend warnings and state write failures collected along the way are
//! reported on stderr after the command's own output; they never change the
//! exit code.

use clap::error::ErrorKind as ClapErrorKind;
use tracing::{debug, info};

use crate::app::AuthenticatedSession;
use crate::cli::args::{Cli, Commands};
use crate::cli::commands::{
    handle_api, handle_apps, handle_auth, handle_config, handle_curl, handle_login,
    handle_logout, handle_oauth_token, handle_orgs, handle_spaces, handle_target,
};
use crate::cli::ui::Ui;
use crate::config::EnvOverride;
use crate::errors::{AppError, Result};

/// Run a parsed command line and return the process exit code
pub async fn run(cli: Cli, env: EnvOverride, ui: &mut Ui) -> i32 {
    let command = cli.command;
    let name = command.name();

    let mut session = match AuthenticatedSession::open(env) {
        Ok(session) => session,
        Err(e) => return report_failure(&e, name, ui),
    };
    let color = session.env().color_enabled(session.state(), ui.color());
    ui.set_color(color);

    let code = match execute(command, &mut session, ui).await {
        Ok(()) => 0,
        Err(e) => report_failure(&e, name, ui),
    };
    report_diagnostics(&mut session, ui);
    ui.flush();
    code
}

/// Check requirements, then run the command's handler
pub async fn execute(
    command: Commands,
    session: &mut AuthenticatedSession,
    ui: &mut Ui,
) -> Result<()> {
    command.requirements().evaluate(session).await?;

    info!("Executing {} command", command.name());
    match command {
        Commands::Api(args) => handle_api(args, session, ui).await,
        Commands::Auth(args) => handle_auth(args, session, ui).await,
        Commands::Login(args) => handle_login(args, session, ui).await,
        Commands::Logout => handle_logout(session, ui).await,
        Commands::Target(args) => handle_target(args, session, ui).await,
        Commands::OauthToken => handle_oauth_token(session, ui).await,
        Commands::Curl(args) => handle_curl(args, session, ui).await,
        Commands::Orgs => handle_orgs(session, ui).await,
        Commands::Spaces => handle_spaces(session, ui).await,
        Commands::Apps => handle_apps(session, ui).await,
        Commands::Config(args) => handle_config(args, session, ui).await,
    }
}

/// Print backend warnings and persistence failures to stderr
pub fn report_diagnostics(session: &mut AuthenticatedSession, ui: &mut Ui) {
    for warning in session.take_warnings() {
        ui.warn(warning);
    }
    for failure in session.write_failures() {
        ui.error(failure.to_string());
    }
}

/// `FAILED` on stdout and the message on stderr; usage errors also show the
/// command's usage
pub fn report_failure(error: &AppError, command: &str, ui: &mut Ui) -> i32 {
    debug!(
        "Command failed ({}, {:?}): {}",
        error.category(),
        error.kind(),
        error
    );
    match error {
        AppError::Usage { .. } => {
            ui.error(error.to_string());
            ui.say(Cli::usage_for(&["cf".to_string(), command.to_string()]));
            ui.failed();
        }
        _ => {
            ui.failed();
            ui.error(error.to_string());
        }
    }
    ui.flush();
    1
}

/// Render a command line that did not parse
///
/// Help and version requests are not failures: they print to stdout and exit
/// 0. Anything else is reported like a usage error.
pub fn report_parse_error(error: &clap::Error, args: &[String], ui: &mut Ui) -> i32 {
    let rendered = error.to_string();
    let code = match error.kind() {
        ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
            ui.write_raw(&rendered);
            0
        }
        ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            ui.error("Incorrect Usage: a command is required");
            ui.write_raw(&rendered);
            ui.failed();
            1
        }
        _ => {
            let message = rendered
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("error: ");
            ui.error(AppError::usage(message).to_string());
            ui.say(Cli::usage_for(args));
            ui.failed();
            1
        }
    };
    ui.flush();
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigStore, SessionState};
    use crate::constants::messages;
    use tempfile::TempDir;

    fn parse_error(args: &[&str]) -> (clap::Error, Vec<String>) {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let error = Cli::try_parse_args(&args).unwrap_err();
        (error, args)
    }

    #[test]
    fn test_usage_error_rendering() {
        let (error, args) = parse_error(&["cf", "curl", "--bogus"]);
        let (mut ui, out, err) = Ui::captured();

        assert_eq!(report_parse_error(&error, &args, &mut ui), 1);
        assert!(err
            .contents()
            .starts_with("Incorrect Usage: unexpected argument '--bogus' found"));
        assert!(out.contents().contains("Usage:"));
        assert!(out.contents().ends_with("FAILED\n"));
    }

    #[test]
    fn test_help_is_not_a_failure() {
        let (error, args) = parse_error(&["cf", "--help"]);
        let (mut ui, out, err) = Ui::captured();

        assert_eq!(report_parse_error(&error, &args, &mut ui), 0);
        assert!(out.contents().contains("Usage:"));
        assert!(err.contents().is_empty());
    }

    #[tokio::test]
    async fn test_requirement_failure_reporting() {
        let temp_dir = TempDir::new().unwrap();
        let env = EnvOverride {
            cf_home: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let cli = Cli::try_parse_args(["cf", "orgs"]).unwrap();
        let (mut ui, out, err) = Ui::captured();

        assert_eq!(run(cli, env, &mut ui).await, 1);
        assert_eq!(out.contents(), "FAILED\n");
        assert_eq!(err.contents(), format!("{}\n", messages::NO_API_ENDPOINT));
    }

    #[tokio::test]
    async fn test_write_failure_keeps_exit_code() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join(".cf");
        std::fs::write(&blocker, "not a directory").unwrap();

        let store = ConfigStore::new(blocker.join("config.json"));
        let state = SessionState {
            target: "https://api.example.com".to_string(),
            access_token: "bearer abc".to_string(),
            ..Default::default()
        };
        let mut session = AuthenticatedSession::new(store, state, EnvOverride::default()).unwrap();
        let (mut ui, out, err) = Ui::captured();

        let result = execute(Commands::Logout, &mut session, &mut ui).await;
        report_diagnostics(&mut session, &mut ui);

        assert!(result.is_ok());
        assert!(out.contents().ends_with("OK\n"));
        assert!(err.contents().contains("Error writing config file"));
        assert!(!session.state().is_logged_in());
    }
}
