//! Command-line interface components
//!
//! This module contains CLI-specific code for the cf binary: argument
//! parsing, terminal output, the command handlers and the runner that ties
//! them to the session.

pub mod args;
pub mod commands;
pub mod runner;
pub mod ui;

pub use args::{
    ApiArgs, AuthArgs, Cli, Commands, ConfigArgs, CurlArgs, GlobalArgs, LoginArgs, TargetArgs,
};
pub use commands::{
    handle_api, handle_apps, handle_auth, handle_config, handle_curl, handle_login,
    handle_logout, handle_oauth_token, handle_orgs, handle_spaces, handle_target,
};
pub use runner::{report_parse_error, run};
pub use ui::{Capture, Ui};
