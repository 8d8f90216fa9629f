use assertr::prelude::*;
use leptos_pkce_auth::{
    AuthError, KeyValueStorage, RequestError, StateToken, TokenOperation, generate_challenge,
};
use time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

use common::{Harness, REVOKE_PATH, TOKEN_PATH, form, jwt, requests_to, token_response};

#[tokio::test]
async fn state_without_separator_fails_before_any_request() {
    common::tracing::init_subscriber();
    let server = MockServer::start().await;
    let harness = Harness::new(common::options(&server));

    let err = harness
        .controller
        .token_client()
        .exchange_code("some-code", "abc")
        .await
        .unwrap_err();

    assert_that(matches!(err, AuthError::InvalidState { .. })).is_true();
    assert_that(server.received_requests().await.unwrap().len()).is_equal_to(0);
}

#[tokio::test]
async fn state_with_undecodable_verifier_fails_before_any_request() {
    common::tracing::init_subscriber();
    let server = MockServer::start().await;
    let harness = Harness::new(common::options(&server));

    let err = harness
        .controller
        .token_client()
        .exchange_code("some-code", "nonce.not*base64")
        .await
        .unwrap_err();

    assert_that(matches!(err, AuthError::InvalidState { .. })).is_true();
    assert_that(server.received_requests().await.unwrap().len()).is_equal_to(0);
}

#[tokio::test]
async fn exchange_sends_verifier_from_state_and_stores_tokens() {
    common::tracing::init_subscriber();
    let server = MockServer::start().await;
    let harness = Harness::new(common::options(&server));
    let access_token = jwt("alice", harness.now() + Duration::hours(1));

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_response(&access_token, Some("r"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    harness.durable.set("webchat-state", "legacy");
    harness.session.set("webchat-code-verifier", "legacy");

    let pkce = generate_challenge(128).unwrap();
    let state = StateToken::new(pkce.code_verifier.clone(), 32).encode();

    let tokens = harness
        .controller
        .token_client()
        .exchange_code("the-code", &state)
        .await
        .unwrap();
    assert_that(tokens.access_token.clone()).is_equal_to(access_token.clone());

    let requests = requests_to(&server, TOKEN_PATH).await;
    let form = form(&requests[0]);
    assert_that(form["client_id"].as_str()).is_equal_to("webchat");
    assert_that(form["code"].as_str()).is_equal_to("the-code");
    assert_that(form["redirect_uri"].as_str()).is_equal_to("http://localhost:3000/auth");
    assert_that(form["code_verifier"].as_str()).is_equal_to(pkce.code_verifier.code_verifier());

    assert_that(harness.durable.get("webchat-access-token")).is_equal_to(Some(access_token));
    assert_that(harness.durable.get("webchat-refresh-token")).is_equal_to(Some("r".to_owned()));
    assert_that(harness.durable.contains_key("webchat-state")).is_false();
    assert_that(harness.session.contains_key("webchat-code-verifier")).is_false();
    assert_that(harness.controller.is_authenticated()).is_true();
}

#[tokio::test]
async fn failed_exchange_carries_response_body() {
    common::tracing::init_subscriber();
    let server = MockServer::start().await;
    let harness = Harness::new(common::options(&server));

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            r#"{"error":"invalid_grant","error_description":"Code not valid"}"#,
        ))
        .mount(&server)
        .await;

    let pkce = generate_challenge(43).unwrap();
    let state = StateToken::new(pkce.code_verifier, 32).encode();
    let err = harness
        .controller
        .token_client()
        .exchange_code("used-code", &state)
        .await
        .unwrap_err();

    let AuthError::TokenExchangeFailed {
        source:
            RequestError::ErrResponse {
                status,
                body,
                error_response,
            },
    } = &err
    else {
        panic!("unexpected error: {err:?}");
    };
    assert_that(status.as_u16()).is_equal_to(400);
    assert_that(body.contains("Code not valid")).is_true();
    assert_that(error_response.as_ref().is_some_and(|it| it.is_invalid_grant())).is_true();
    assert_that(harness.durable.is_empty()).is_true();
}

#[tokio::test]
async fn refresh_without_refresh_token_fails_without_request() {
    common::tracing::init_subscriber();
    let server = MockServer::start().await;
    let harness = Harness::new(common::options(&server));

    let err = harness.controller.token_client().refresh().await.unwrap_err();

    assert_that(matches!(err, AuthError::NoRefreshToken)).is_true();
    assert_that(server.received_requests().await.unwrap().len()).is_equal_to(0);
}

#[tokio::test]
async fn rejected_refresh_clears_all_tokens() {
    common::tracing::init_subscriber();
    let server = MockServer::start().await;
    let harness = Harness::new(common::options(&server));
    harness.seed_tokens(&jwt("alice", harness.now() + Duration::hours(1)), Some("r"));
    assert_that(harness.controller.is_authenticated()).is_true();

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let err = harness.controller.token_client().refresh().await.unwrap_err();

    assert_that(matches!(err, AuthError::RefreshFailed { .. })).is_true();
    assert_that(harness.durable.is_empty()).is_true();
    assert_that(harness.controller.is_authenticated()).is_false();
}

#[tokio::test]
async fn refresh_keeps_refresh_token_when_none_is_returned() {
    common::tracing::init_subscriber();
    let server = MockServer::start().await;
    let harness = Harness::new(common::options(&server));
    harness.seed_tokens("expired", Some("r1"));
    let fresh = jwt("alice", harness.now() + Duration::hours(1));

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response(&fresh, None)))
        .mount(&server)
        .await;

    harness.controller.token_client().refresh().await.unwrap();

    let requests = requests_to(&server, TOKEN_PATH).await;
    let form = form(&requests[0]);
    assert_that(form["grant_type"].as_str()).is_equal_to("refresh_token");
    assert_that(form["refresh_token"].as_str()).is_equal_to("r1");
    assert_that(form["client_id"].as_str()).is_equal_to("webchat");

    assert_that(harness.durable.get("webchat-access-token")).is_equal_to(Some(fresh));
    assert_that(harness.durable.get("webchat-refresh-token")).is_equal_to(Some("r1".to_owned()));
}

#[tokio::test]
async fn timed_out_refresh_is_reported_as_such() {
    common::tracing::init_subscriber();
    let server = MockServer::start().await;
    let harness = Harness::new(common::options(&server));
    harness.seed_tokens("expired", Some("r"));

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_response("never", None))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = harness.controller.token_client().refresh().await.unwrap_err();

    assert_that(matches!(
        err,
        AuthError::TimedOut {
            operation: TokenOperation::Refresh,
            ..
        }
    ))
    .is_true();
}

#[tokio::test]
async fn revoke_posts_given_token_and_swallows_failures() {
    common::tracing::init_subscriber();
    let server = MockServer::start().await;
    let harness = Harness::new(common::options(&server));
    harness.seed_tokens("access", Some("stored"));

    Mock::given(method("POST"))
        .and(path(REVOKE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    harness.controller.token_client().revoke("taken").await;

    let requests = requests_to(&server, REVOKE_PATH).await;
    let form = form(&requests[0]);
    assert_that(form["token"].as_str()).is_equal_to("taken");
    assert_that(form["client_id"].as_str()).is_equal_to("webchat");
    assert_that(form["token_type_hint"].as_str()).is_equal_to("refresh_token");
    // Revocation leaves local state to the caller.
    assert_that(harness.durable.get("webchat-refresh-token")).is_equal_to(Some("stored".to_owned()));
}
