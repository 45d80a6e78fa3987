//! Command-line argument parsing for the cf CLI
//!
//! This module defines the CLI structure using clap derive macros. Each
//! subcommand also declares the [`RequirementChain`] that must hold before it
//! runs, so the runner can check preconditions without knowing the commands.

use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::app::{Requirement, RequirementChain};
use crate::constants::api_version;

/// cf - command line client for Cloud Foundry
#[derive(Parser, Debug)]
#[command(
    name = "cf",
    version,
    about = "A command line tool to interact with Cloud Foundry",
    long_about = "A command line tool to interact with Cloud Foundry.
Targets an API endpoint, logs in against its identity service and keeps the session in $CF_HOME/.cf/config.json."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Log requests and responses (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log everything (trace level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Set or view target api url
    Api(ApiArgs),

    /// Authenticate non-interactively
    Auth(AuthArgs),

    /// Log user in
    Login(LoginArgs),

    /// Log user out
    Logout,

    /// Set or view the targeted org or space
    Target(TargetArgs),

    /// Retrieve and display the OAuth token for the current session
    OauthToken,

    /// Execute a raw request, content-type set to application/json by default
    Curl(CurlArgs),

    /// List all orgs
    Orgs,

    /// List all spaces in the targeted org
    Spaces,

    /// List all apps in the targeted space
    Apps,

    /// Write default values to the config
    Config(ConfigArgs),
}

/// Arguments for the api command
#[derive(Args, Debug, Clone, Default)]
pub struct ApiArgs {
    /// API endpoint, e.g. https://api.example.com
    pub url: Option<String>,

    /// Skip verification of the API endpoint. Not recommended!
    #[arg(long)]
    pub skip_ssl_validation: bool,

    /// Remove all api endpoint targeting
    #[arg(long, conflicts_with = "url")]
    pub unset: bool,
}

/// Arguments for the auth command
#[derive(Args, Debug, Clone, Default)]
pub struct AuthArgs {
    /// Username, or client id with --client-credentials (default: CF_USERNAME)
    pub username: Option<String>,

    /// Password, or client secret with --client-credentials (default: CF_PASSWORD)
    pub password: Option<String>,

    /// Use (non-user) service account (also called client credentials)
    #[arg(long)]
    pub client_credentials: bool,
}

/// Arguments for the login command
#[derive(Args, Debug, Clone, Default)]
pub struct LoginArgs {
    /// API endpoint (e.g. https://api.example.com)
    #[arg(short = 'a', value_name = "API_URL")]
    pub api: Option<String>,

    /// Username
    #[arg(short = 'u', value_name = "USERNAME")]
    pub username: Option<String>,

    /// Password
    #[arg(short = 'p', value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Org
    #[arg(short = 'o', value_name = "ORG")]
    pub organization: Option<String>,

    /// Space
    #[arg(short = 's', value_name = "SPACE")]
    pub space: Option<String>,

    /// Skip verification of the API endpoint. Not recommended!
    #[arg(long)]
    pub skip_ssl_validation: bool,
}

/// Arguments for the target command
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Organization
    #[arg(short = 'o', value_name = "ORG")]
    pub organization: Option<String>,

    /// Space
    #[arg(short = 's', value_name = "SPACE")]
    pub space: Option<String>,
}

impl TargetArgs {
    /// No flags: just show the current target
    pub fn is_show(&self) -> bool {
        self.organization.is_none() && self.space.is_none()
    }
}

/// Arguments for the curl command
#[derive(Args, Debug, Clone, Default)]
pub struct CurlArgs {
    /// Path relative to the API endpoint, e.g. /v3/apps
    pub path: String,

    /// HTTP method (GET, POST, PUT, DELETE, etc)
    #[arg(short = 'X', value_name = "METHOD")]
    pub method: Option<String>,

    /// Custom headers to include in the request, flag can be specified multiple times
    #[arg(short = 'H', value_name = "HEADER")]
    pub headers: Vec<String>,

    /// HTTP data to include in the request body, or '@' followed by a file name to read the data from
    #[arg(short = 'd', value_name = "DATA")]
    pub data: Option<String>,

    /// Include response headers in the output
    #[arg(short = 'i')]
    pub include_headers: bool,
}

/// Arguments for the config command
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Enable or disable color
    #[arg(long, value_name = "true|false")]
    pub color: Option<bool>,

    /// Set default locale. If LOCALE is 'CLEAR', previous locale is deleted.
    #[arg(long, value_name = "LOCALE")]
    pub locale: Option<String>,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub dial_timeout: Option<u64>,
}

impl ConfigArgs {
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.locale.is_none() && self.dial_timeout.is_none()
    }
}

impl Commands {
    /// Preconditions checked before the command runs
    pub fn requirements(&self) -> RequirementChain {
        match self {
            Commands::Api(_) | Commands::Login(_) | Commands::Logout | Commands::Config(_) => {
                RequirementChain::default()
            }
            Commands::Auth(_) => RequirementChain::new(vec![Requirement::ApiEndpoint]),
            Commands::Target(args) => {
                // Changing only the space needs an org to look it up in
                if args.space.is_some() && args.organization.is_none() {
                    RequirementChain::targeted_organization(None)
                } else {
                    RequirementChain::logged_in()
                }
            }
            Commands::OauthToken | Commands::Curl(_) | Commands::Orgs => {
                RequirementChain::logged_in()
            }
            Commands::Spaces => RequirementChain::targeted_organization(None),
            Commands::Apps => {
                RequirementChain::targeted_space(Some(api_version::APPS_MIN_VERSION))
            }
        }
    }

    /// Name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Api(_) => "api",
            Commands::Auth(_) => "auth",
            Commands::Login(_) => "login",
            Commands::Logout => "logout",
            Commands::Target(_) => "target",
            Commands::OauthToken => "oauth-token",
            Commands::Curl(_) => "curl",
            Commands::Orgs => "orgs",
            Commands::Spaces => "spaces",
            Commands::Apps => "apps",
            Commands::Config(_) => "config",
        }
    }
}

impl Cli {
    /// Parse command line arguments without exiting on errors
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args)
    }

    /// Get the logging level based on global arguments and `CF_TRACE`
    pub fn log_level(&self, trace_enabled: bool) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::TRACE
        } else if self.global.verbose || trace_enabled {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        }
    }

    /// Help text for the subcommand named in `args`, or the top-level help
    pub fn usage_for(args: &[String]) -> String {
        let mut command = Self::command();
        command.build();

        let subcommand = args
            .iter()
            .skip(1)
            .filter(|arg| !arg.starts_with('-'))
            .find_map(|arg| command.find_subcommand(arg.as_str()).cloned());

        match subcommand {
            Some(mut subcommand) => subcommand.render_help().to_string(),
            None => command.render_help().to_string(),
        }
    }
}
