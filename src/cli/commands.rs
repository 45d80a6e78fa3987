//! Command handlers for the cf CLI
//!
//! Each handler runs after its command's requirement chain has passed and
//! works only through the [`AuthenticatedSession`], so every backend call gets
//! the same token renewal and every state change is checkpointed the same way.

use std::str::FromStr;

use reqwest::{Method, StatusCode};
use semver::Version;
use tracing::{debug, info};
use url::Url;

use crate::app::client::info::parse_lenient;
use crate::app::{
    decode_user, ApiRequest, AuthenticatedSession, CloudController, Credentials, Resource,
    RootInfo,
};
use crate::auth::{
    login_password, login_username, prompt_line, resolve_auth_credentials, stdin_is_interactive,
    CredentialSource,
};
use crate::cli::args::{ApiArgs, AuthArgs, ConfigArgs, CurlArgs, LoginArgs, TargetArgs};
use crate::cli::ui::Ui;
use crate::config::{normalize_locale, GrantType, Organization, SessionState, Space};
use crate::constants::{auth, config, messages};
use crate::errors::{AppError, AuthError, ConfigError, NetworkError, RequirementError, Result};

/// Handle the api command
pub async fn handle_api(
    args: ApiArgs,
    session: &mut AuthenticatedSession,
    ui: &mut Ui,
) -> Result<()> {
    if args.unset {
        info!("Unsetting API endpoint");
        ui.say("Unsetting api endpoint...");
        session.state_mut().unset_target_information();
        session.checkpoint();
        ui.ok();
        return Ok(());
    }

    match args.url {
        Some(url) => {
            target_api(session, &url, args.skip_ssl_validation, ui).await?;
            ui.say("");
            show_api(session.state(), ui);
            if !session.state().is_logged_in() {
                ui.say(messages::NOT_LOGGED_IN);
            }
        }
        None if session.state().has_target() => show_api(session.state(), ui),
        None => ui.say(messages::NO_API_SET_SHORT),
    }
    Ok(())
}

/// Handle the auth command
pub async fn handle_auth(
    args: AuthArgs,
    session: &mut AuthenticatedSession,
    ui: &mut Ui,
) -> Result<()> {
    let credentials = resolve_auth_credentials(
        args.username,
        args.password,
        args.client_credentials,
        session.env(),
    )?;

    let state = session.state();
    if !args.client_credentials
        && state.grant_type == GrantType::ClientCredentials
        && state.is_logged_in()
    {
        return Err(AuthError::ServiceAccountLoggedIn.into());
    }

    ui.say(format!("API endpoint: {}", state.target));
    ui.say("Authenticating...");
    session.authenticate(&credentials).await?;
    ui.ok();
    ui.say("");
    ui.say("Use 'cf target' to view or set your target org and space.");
    Ok(())
}

/// Handle the login command
pub async fn handle_login(
    args: LoginArgs,
    session: &mut AuthenticatedSession,
    ui: &mut Ui,
) -> Result<()> {
    match &args.api {
        Some(api) => target_api(session, api, args.skip_ssl_validation, ui).await?,
        None if session.state().has_target() => {}
        None => {
            if !stdin_is_interactive() {
                return Err(RequirementError::NoApiEndpoint.into());
            }
            let api = prompt_line("API endpoint")?;
            target_api(session, &api, args.skip_ssl_validation, ui).await?;
        }
    }
    ui.say("");
    ui.say(format!("API endpoint: {}", session.state().target));
    ui.say("");

    let username = login_username(args.username.clone())?;
    let mut attempt = 0;
    loop {
        attempt += 1;
        let password = login_password(args.password.clone())?;
        let prompted = username.source == CredentialSource::Prompt
            || password.source == CredentialSource::Prompt;
        let credentials = Credentials::Password {
            username: username.value.clone(),
            password: password.value,
        };

        ui.say("Authenticating...");
        match session.authenticate(&credentials).await {
            Ok(()) => {
                ui.ok();
                break;
            }
            Err(AuthError::CredentialsRejected) if prompted => {
                ui.error(messages::CREDENTIALS_REJECTED);
                if attempt >= auth::MAX_LOGIN_ATTEMPTS {
                    return Err(AuthError::UnableToAuthenticate.into());
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
    ui.say("");

    target_after_login(session, args.organization, args.space, ui).await?;
    ui.say("");
    show_target(session.state(), ui);
    Ok(())
}

/// Handle the logout command
pub async fn handle_logout(session: &mut AuthenticatedSession, ui: &mut Ui) -> Result<()> {
    match decode_user(&session.state().access_token) {
        Some(user) => ui.say(format!("Logging out {}...", user.name)),
        None => ui.say("Logging out..."),
    }
    session.state_mut().unset_user_information();
    session.checkpoint();
    ui.ok();
    Ok(())
}

/// Handle the target command
pub async fn handle_target(
    args: TargetArgs,
    session: &mut AuthenticatedSession,
    ui: &mut Ui,
) -> Result<()> {
    if args.is_show() {
        show_target(session.state(), ui);
        return Ok(());
    }

    if let Some(name) = &args.organization {
        let found = CloudController::new(session).find_organization(name).await;
        match found {
            Ok(organization) => {
                session.state_mut().set_organization(organization);
                session.checkpoint();
            }
            Err(e) => {
                session.state_mut().unset_organization_and_space();
                session.checkpoint();
                return Err(e);
            }
        }
    }

    if let Some(name) = &args.space {
        let organization_guid = session.state().organization.guid.clone();
        let space = CloudController::new(session)
            .find_space(&organization_guid, name)
            .await?;
        session.state_mut().set_space(space)?;
        session.checkpoint();
    }

    show_target(session.state(), ui);
    Ok(())
}

/// Handle the oauth-token command
pub async fn handle_oauth_token(session: &mut AuthenticatedSession, ui: &mut Ui) -> Result<()> {
    session.refresh_access_token().await?;
    ui.say(&session.state().access_token);
    Ok(())
}

/// Handle the curl command
///
/// Whatever status the backend answers with, its body is printed as is and
/// the command succeeds; only transport and credential failures fail it.
pub async fn handle_curl(
    args: CurlArgs,
    session: &mut AuthenticatedSession,
    ui: &mut Ui,
) -> Result<()> {
    let method_name = args
        .method
        .clone()
        .unwrap_or_else(|| (if args.data.is_some() { "POST" } else { "GET" }).to_string());
    let method = Method::from_str(&method_name.to_ascii_uppercase())
        .map_err(|_| AppError::usage(format!("invalid HTTP method '{}'", method_name)))?;

    let mut request = ApiRequest::new(method, session.url_for(&args.path)?);
    for header in &args.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| AppError::usage(format!("invalid header '{}'", header)))?;
        request = request.with_header(name.trim(), value.trim());
    }
    if let Some(data) = &args.data {
        let body = match data.strip_prefix('@') {
            Some(path) => std::fs::read_to_string(path)?,
            None => data.clone(),
        };
        request = request.with_body(body);
    }

    debug!("curl {} {}", request.method, request.url);
    let response = session.execute(request).await?;

    if args.include_headers {
        let reason = StatusCode::from_u16(response.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or_default();
        ui.say(format!("HTTP/1.1 {} {}", response.status, reason));
        for (name, value) in &response.headers {
            ui.say(format!("{}: {}", name, value));
        }
        ui.say("");
    }
    ui.write_raw(&response.body);
    if !response.body.is_empty() && !response.body.ends_with('\n') {
        ui.say("");
    }
    Ok(())
}

/// Handle the orgs command
pub async fn handle_orgs(session: &mut AuthenticatedSession, ui: &mut Ui) -> Result<()> {
    ui.say(format!("Getting orgs as {}...", current_user(session.state())));
    let organizations = CloudController::new(session).organizations().await?;
    ui.ok();
    ui.say("");
    print_names(&organizations, "orgs", ui);
    Ok(())
}

/// Handle the spaces command
pub async fn handle_spaces(session: &mut AuthenticatedSession, ui: &mut Ui) -> Result<()> {
    let state = session.state();
    let organization = state.organization.clone();
    ui.say(format!(
        "Getting spaces in org {} as {}...",
        organization.name,
        current_user(state)
    ));
    let spaces = CloudController::new(session)
        .spaces(&organization.guid)
        .await?;
    ui.ok();
    ui.say("");
    print_names(&spaces, "spaces", ui);
    Ok(())
}

/// Handle the apps command
pub async fn handle_apps(session: &mut AuthenticatedSession, ui: &mut Ui) -> Result<()> {
    let state = session.state();
    let space = state.space.clone();
    ui.say(format!(
        "Getting apps in org {} / space {} as {}...",
        state.organization.name,
        space.name,
        current_user(state)
    ));
    let apps = CloudController::new(session).apps(&space.guid).await?;
    ui.ok();
    ui.say("");

    if apps.is_empty() {
        ui.say("No apps found");
        return Ok(());
    }
    let width = apps.iter().map(|app| app.name.len()).max().unwrap_or(0).max(4) + 3;
    ui.say(format!("{:<width$}{}", "name", "requested state", width = width));
    for app in &apps {
        let state = app.state.as_deref().unwrap_or_default().to_ascii_lowercase();
        ui.say(format!("{:<width$}{}", app.name, state, width = width));
    }
    Ok(())
}

/// Handle the config command
pub async fn handle_config(
    args: ConfigArgs,
    session: &mut AuthenticatedSession,
    ui: &mut Ui,
) -> Result<()> {
    if args.is_empty() {
        return Err(AppError::usage("No flag provided"));
    }

    let locale = match &args.locale {
        Some(raw) if raw.eq_ignore_ascii_case(config::CLEAR_LOCALE) => {
            Some(config::CLEAR_LOCALE.to_string())
        }
        Some(raw) => Some(normalize_locale(raw).ok_or_else(|| ConfigError::InvalidValue {
            field: "locale".to_string(),
            value: raw.clone(),
            reason: format!(
                "Supported locales are: {}",
                config::SUPPORTED_LOCALES.join(", ")
            ),
        })?),
        None => None,
    };
    if args.dial_timeout == Some(0) {
        return Err(ConfigError::InvalidValue {
            field: "dial-timeout".to_string(),
            value: "0".to_string(),
            reason: "Expected a positive number of seconds".to_string(),
        }
        .into());
    }

    ui.say("Setting values in config...");
    let state = session.state_mut();
    if let Some(color) = args.color {
        state.color_enabled = Some(color);
    }
    if let Some(locale) = &locale {
        state.set_locale(locale);
    }
    if let Some(secs) = args.dial_timeout {
        state.dial_timeout_secs = Some(secs);
    }
    session.checkpoint();
    ui.ok();
    Ok(())
}

/// Probe `raw_url` and make it the target
async fn target_api(
    session: &mut AuthenticatedSession,
    raw_url: &str,
    skip_ssl_validation: bool,
    ui: &mut Ui,
) -> Result<()> {
    let api = normalize_api_url(raw_url);
    info!("Targeting {}", api);
    ui.say(format!("Setting api endpoint to {}...", api));

    let url = Url::parse(&api).map_err(|e| NetworkError::InvalidUrl {
        url: api.clone(),
        reason: e.to_string(),
    })?;
    session.state_mut().skip_ssl_validation = skip_ssl_validation;
    session.reconfigure_client()?;

    let info = session.probe(&url).await?;
    session
        .state_mut()
        .set_target_information(info.target_info(&api, skip_ssl_validation));
    session.checkpoint();
    ui.ok();

    if url.scheme() == "http" {
        ui.warn(messages::INSECURE_ENDPOINT);
    }
    warn_min_cli_version(&info, ui);
    Ok(())
}

/// Default to https and drop trailing slashes
fn normalize_api_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn warn_min_cli_version(info: &RootInfo, ui: &mut Ui) {
    let (Some(minimum), Some(current)) = (info.min_cli_version(), cli_version()) else {
        return;
    };
    if current < minimum {
        ui.warn(format!(
            "Cloud Foundry API version {} requires CLI version {}. You are currently on version {}. To upgrade your CLI, please visit: https://github.com/cloudfoundry/cli#downloads",
            info.api_version_text(),
            minimum,
            current
        ));
    }
}

/// Target the named org and space, or the only one there is
async fn target_after_login(
    session: &mut AuthenticatedSession,
    organization: Option<String>,
    space: Option<String>,
    ui: &mut Ui,
) -> Result<()> {
    let organization = {
        let mut cc = CloudController::new(session);
        match organization {
            Some(name) => Some(cc.find_organization(&name).await?),
            None => only(cc.organizations().await?).map(|org| Organization::new(org.guid, org.name)),
        }
    };
    let Some(organization) = organization else {
        return Ok(());
    };
    ui.say(format!("Targeted org {}", organization.name));
    let organization_guid = organization.guid.clone();
    session.state_mut().set_organization(organization);
    session.checkpoint();

    let space = {
        let mut cc = CloudController::new(session);
        match space {
            Some(name) => Some(cc.find_space(&organization_guid, &name).await?),
            None => only(cc.spaces(&organization_guid).await?)
                .map(|space| Space::new(space.guid, space.name)),
        }
    };
    if let Some(space) = space {
        ui.say(format!("Targeted space {}", space.name));
        session.state_mut().set_space(space)?;
        session.checkpoint();
    }
    Ok(())
}

fn only(mut resources: Vec<Resource>) -> Option<Resource> {
    if resources.len() == 1 {
        resources.pop()
    } else {
        None
    }
}

fn current_user(state: &SessionState) -> String {
    decode_user(&state.access_token)
        .map(|user| user.name)
        .unwrap_or_default()
}

fn show_api(state: &SessionState, ui: &mut Ui) {
    ui.say_table(&[
        ("API endpoint:", state.target.clone()),
        ("API version:", state.api_version.clone()),
    ]);
}

fn show_target(state: &SessionState, ui: &mut Ui) {
    let mut rows = vec![
        ("API endpoint:", state.target.clone()),
        ("API version:", state.api_version.clone()),
        ("user:", current_user(state)),
    ];
    if state.has_organization() {
        rows.push(("org:", state.organization.name.clone()));
    }
    if state.has_space() {
        rows.push(("space:", state.space.name.clone()));
    }
    ui.say_table(&rows);

    if !state.has_organization() {
        ui.say(messages::NO_TARGET_SET);
    } else if !state.has_space() {
        ui.say("No space targeted, use 'cf target -s SPACE'");
    }
}

fn print_names(resources: &[Resource], kind: &str, ui: &mut Ui) {
    if resources.is_empty() {
        ui.say(format!("No {} found.", kind));
        return;
    }
    ui.say("name");
    for resource in resources {
        ui.say(&resource.name);
    }
}

fn cli_version() -> Option<Version> {
    parse_lenient(env!("CARGO_PKG_VERSION"))
}
