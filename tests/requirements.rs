//! Requirement chains evaluated against a mock backend

use cf_cli::app::{AuthenticatedSession, Requirement, RequirementChain};
use cf_cli::config::{ConfigStore, EnvOverride, Organization, SessionState};
use cf_cli::errors::{AppError, ErrorKind, RequirementError, TargetScope};
use httpmock::prelude::*;
use semver::Version;
use serde_json::json;
use tempfile::TempDir;

fn root_document(server: &MockServer, version: &str) -> serde_json::Value {
    json!({
        "links": {
            "cloud_controller_v3": {"href": server.url("/v3"), "meta": {"version": version}},
            "uaa": {"href": server.url("/uaa")}
        }
    })
}

fn session(target: &str, state: SessionState) -> (TempDir, AuthenticatedSession) {
    let temp_dir = TempDir::new().unwrap();
    let store = ConfigStore::new(temp_dir.path().join(".cf").join("config.json"));
    let state = SessionState {
        target: target.to_string(),
        ..state
    };
    let session = AuthenticatedSession::new(store, state, EnvOverride::default()).unwrap();
    (temp_dir, session)
}

fn logged_in_with_org() -> SessionState {
    let mut state = SessionState {
        access_token: "bearer token".to_string(),
        ..Default::default()
    };
    state.set_organization(Organization::new("org-guid", "org"));
    state
}

#[tokio::test]
async fn test_chain_stops_before_version_probe() {
    let server = MockServer::start();
    let root = server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).json_body(root_document(&server, "3.99.0"));
    });

    // Targeted but not logged in
    let (_dir, mut session) = session(&server.base_url(), SessionState::default());
    let chain = RequirementChain::targeted_space(Some(Version::new(3, 27, 0)));

    let err = chain.evaluate(&mut session).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Requirement(RequirementError::NotLoggedIn)
    ));
    root.assert_calls(0);
}

#[tokio::test]
async fn test_no_endpoint_is_reported_first() {
    let (_dir, mut session) = session("", SessionState::default());
    let err = RequirementChain::targeted_space(None)
        .evaluate(&mut session)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoApiEndpoint);
    assert_eq!(
        err.to_string(),
        "No API endpoint set. Use 'cf login' or 'cf api' to target an endpoint."
    );
}

#[tokio::test]
async fn test_version_floor() {
    let cases = [("3.0.0", false), ("3.11.0", true), ("3.20.0", true)];

    for (advertised, passes) in cases {
        let server = MockServer::start();
        let root = server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200).json_body(root_document(&server, advertised));
        });

        let (_dir, mut session) = session(&server.base_url(), logged_in_with_org());
        let chain = RequirementChain::targeted_organization(Some(Version::new(3, 11, 0)));
        let result = chain.evaluate(&mut session).await;

        assert_eq!(result.is_ok(), passes, "advertised {}", advertised);
        if let Err(err) = result {
            assert_eq!(err.kind(), ErrorKind::MinApiVersionNotMet);
            assert!(matches!(
                err,
                AppError::Requirement(RequirementError::MinApiVersionNotMet {
                    current: Some(_),
                    ..
                })
            ));
        }
        root.assert_calls(1);
    }
}

#[tokio::test]
async fn test_unparsable_version_is_not_met() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).json_body(root_document(&server, "banana"));
    });

    let (_dir, mut session) = session(&server.base_url(), logged_in_with_org());
    let err = RequirementChain::new(vec![Requirement::MinApiVersion(Version::new(3, 0, 0))])
        .evaluate(&mut session)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Requirement(RequirementError::MinApiVersionNotMet { current: None, .. })
    ));
}

#[tokio::test]
async fn test_root_probed_once_per_session() {
    let server = MockServer::start();
    let root = server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).json_body(root_document(&server, "3.50.0"));
    });

    let (_dir, mut session) = session(&server.base_url(), logged_in_with_org());
    let chain = RequirementChain::new(vec![
        Requirement::MinApiVersion(Version::new(3, 1, 0)),
        Requirement::MinApiVersion(Version::new(3, 2, 0)),
    ]);
    chain.evaluate(&mut session).await.unwrap();
    chain.evaluate(&mut session).await.unwrap();

    root.assert_calls(1);
    assert_eq!(session.state().api_version, "3.50.0");
}

#[tokio::test]
async fn test_space_missing_after_version_check() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).json_body(root_document(&server, "3.50.0"));
    });

    let (_dir, mut session) = session(&server.base_url(), logged_in_with_org());
    let err = RequirementChain::targeted_space(Some(Version::new(3, 27, 0)))
        .evaluate(&mut session)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Requirement(RequirementError::TargetNotSet(TargetScope::Space))
    ));
    assert_eq!(
        err.to_string(),
        "No space targeted, use 'cf target -s SPACE' to target a space."
    );
}

#[tokio::test]
async fn test_unreachable_backend_fails_version_requirement() {
    // Nothing listens on the port once the listener is dropped
    let target = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    };

    let (_dir, mut session) = session(&target, logged_in_with_org());
    let err = RequirementChain::new(vec![Requirement::MinApiVersion(Version::new(3, 0, 0))])
        .evaluate(&mut session)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NetworkError);
}
