//! End-to-end runs of the cf binary with state isolated under CF_HOME

use std::fs;
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};

fn cf(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cf"));
    cmd.env("CF_HOME", home)
        .env("CF_COLOR", "false")
        .env_remove("CF_USERNAME")
        .env_remove("CF_PASSWORD")
        .env_remove("CF_DIAL_TIMEOUT")
        .env_remove("CF_TRACE");
    cmd
}

fn write_config(home: &Path, config: Value) {
    let dir = home.join(".cf");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.json"), config.to_string()).unwrap();
}

fn read_config(home: &TempDir) -> Value {
    let raw = fs::read_to_string(home.path().join(".cf").join("config.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn version_and_help_succeed() {
    let home = tempdir().unwrap();
    cf(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    cf(home.path())
        .args(["login", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--skip-ssl-validation"));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let home = tempdir().unwrap();
    cf(home.path())
        .args(["target", "--bogus"])
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("Incorrect Usage:"))
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::ends_with("FAILED\n"));
}

#[test]
fn command_without_endpoint_fails_requirements() {
    let home = tempdir().unwrap();
    cf(home.path())
        .arg("orgs")
        .assert()
        .code(1)
        .stdout("FAILED\n")
        .stderr(predicate::str::contains(
            "No API endpoint set. Use 'cf login' or 'cf api' to target an endpoint.",
        ));
}

#[test]
fn malformed_config_is_reported() {
    let home = tempdir().unwrap();
    let dir = home.path().join(".cf");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.json"), "{ not json").unwrap();

    cf(home.path())
        .arg("target")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid config file"));
}

#[test]
fn rejected_auth_clears_targeting() {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST)
            .path("/oauth/token")
            .body_includes("grant_type=password")
            .body_includes("username=admin");
        then.status(401).json_body(json!({
            "error": "unauthorized",
            "error_description": "Bad credentials"
        }));
    });

    let home = tempdir().unwrap();
    write_config(
        home.path(),
        json!({
            "ConfigVersion": 3,
            "Target": server.base_url(),
            "UaaEndpoint": server.base_url(),
            "AccessToken": "bearer previous",
            "OrganizationFields": {"GUID": "org-guid", "Name": "org"},
            "SpaceFields": {"GUID": "space-guid", "Name": "dev", "AllowSSH": false}
        }),
    );

    cf(home.path())
        .args(["auth", "admin", "wrong"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Authenticating..."))
        .stdout(predicate::str::ends_with("FAILED\n"))
        .stderr(predicate::str::contains(
            "Credentials were rejected, please try again.",
        ));

    token.assert_calls(1);
    let config = read_config(&home);
    assert_eq!(config["OrganizationFields"]["GUID"], "");
    assert_eq!(config["SpaceFields"]["GUID"], "");
    assert_eq!(config["Target"], server.base_url());
}

#[test]
fn auth_reads_credentials_from_environment() {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST)
            .path("/oauth/token")
            .body_includes("username=env-user")
            .body_includes("password=env-pass");
        then.status(200).json_body(json!({
            "access_token": "issued",
            "refresh_token": "refresh",
            "token_type": "bearer"
        }));
    });

    let home = tempdir().unwrap();
    write_config(
        home.path(),
        json!({"Target": server.base_url(), "UaaEndpoint": server.base_url()}),
    );

    cf(home.path())
        .arg("auth")
        .env("CF_USERNAME", "env-user")
        .env("CF_PASSWORD", "env-pass")
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));

    token.assert_calls(1);
    let config = read_config(&home);
    assert_eq!(config["AccessToken"], "bearer issued");
    assert_eq!(config["RefreshToken"], "refresh");
    assert_eq!(config["UAAGrantType"], "password");
}

#[test]
fn api_targets_endpoint() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).json_body(json!({
            "links": {
                "cloud_controller_v2": {
                    "href": server.url("/v2"),
                    "meta": {"min_cli_version": "99.0.0"}
                },
                "cloud_controller_v3": {"href": server.url("/v3"), "meta": {"version": "3.140.0"}},
                "login": {"href": server.url("/login")},
                "uaa": {"href": server.url("/uaa")}
            }
        }));
    });

    let home = tempdir().unwrap();
    cf(home.path())
        .args(["api", server.base_url().as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("API version:"))
        .stdout(predicate::str::contains("3.140.0"))
        .stderr(predicate::str::contains("Insecure http API endpoint"))
        .stderr(predicate::str::contains("requires CLI version 99.0.0"));

    let config = read_config(&home);
    assert_eq!(config["Target"], server.base_url());
    assert_eq!(config["UaaEndpoint"], server.url("/uaa"));
    assert_eq!(config["AuthorizationEndpoint"], server.url("/login"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(home.path().join(".cf").join("config.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

/// Listener whose accept queue is full, so new connections never complete
fn saturated_listener() -> (TcpListener, Vec<TcpStream>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let mut held = Vec::new();
    for _ in 0..4096 {
        match TcpStream::connect_timeout(&addr, Duration::from_millis(200)) {
            Ok(stream) => held.push(stream),
            Err(_) => return (listener, held),
        }
    }
    panic!("accept queue never filled");
}

#[test]
fn dial_timeout_bounds_unreachable_endpoint() {
    let (listener, _held) = saturated_listener();
    let endpoint = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());
    let home = tempdir().unwrap();
    let started = Instant::now();

    cf(home.path())
        .args(["api", endpoint.as_str()])
        .env("CF_DIAL_TIMEOUT", "1")
        .timeout(Duration::from_secs(20))
        .assert()
        .code(1)
        .stdout(predicate::str::ends_with("FAILED\n"))
        .stderr(predicate::str::contains(format!(
            "timed out connecting to {} after 1s",
            endpoint
        )));

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(900), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(2500), "{:?}", elapsed);
}

#[test]
fn config_and_logout_persist() {
    let home = tempdir().unwrap();
    write_config(
        home.path(),
        json!({
            "Target": "https://api.example.com",
            "AccessToken": "bearer token",
            "RefreshToken": "refresh",
            "OrganizationFields": {"GUID": "org-guid", "Name": "org"}
        }),
    );

    cf(home.path())
        .args(["config", "--locale", "de_DE.UTF-8", "--dial-timeout", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));

    cf(home.path()).arg("logout").assert().success();

    let config = read_config(&home);
    assert_eq!(config["Locale"], "de-DE");
    assert_eq!(config["DialTimeout"], 7);
    assert_eq!(config["AccessToken"], "");
    assert_eq!(config["RefreshToken"], "");
    assert_eq!(config["OrganizationFields"]["GUID"], "");
    assert_eq!(config["Target"], "https://api.example.com");
}
