//! Slack and webhook announcers against a mock server

use secrecy::SecretString;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crane::announce::notification::Notification;
use crane::announce::slack::SlackAnnouncer;
use crane::announce::webhook::WebhookAnnouncer;
use crane::announce::{Announcer, Stage};

fn note(channels: &[&str]) -> Notification {
    Notification {
        message: "(But please supervise me at https://rancher.example.com)".to_string(),
        channels: channels.iter().map(|c| c.to_string()).collect(),
        timestamp: "1700000000000".to_string(),
        version: "80185b8".to_string(),
        ..Default::default()
    }
}

fn slack(server: &MockServer) -> SlackAnnouncer {
    SlackAnnouncer::new(&server.uri(), SecretString::from("xoxb-1".to_string())).unwrap()
}

#[tokio::test]
async fn test_slack_posts_once_per_channel() {
    let server = MockServer::start().await;
    for channel in ["deploys", "releases"] {
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(header("Authorization", "Bearer xoxb-1"))
            .and(body_partial_json(json!({ "channel": channel })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let announcer = slack(&server);
    assert_ok!(announcer.announce(Stage::Start, &note(&["deploys", "releases"])).await);
}

#[tokio::test]
async fn test_slack_success_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(body_partial_json(json!({
            "channel": "deploys",
            "text": "Deployed version 80185b8 :tada:"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    assert_ok!(slack(&server).announce(Stage::Success, &note(&["deploys"])).await);
}

#[tokio::test]
async fn test_slack_api_error_keeps_posting() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(body_partial_json(json!({ "channel": "gone" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ok": false, "error": "channel_not_found" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(body_partial_json(json!({ "channel": "deploys" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let result = slack(&server)
        .announce(Stage::Failure, &note(&["gone", "deploys"]))
        .await;
    let err = assert_err!(result);
    assert!(err.to_string().contains("channel_not_found"));
}

#[tokio::test]
async fn test_slack_without_channels_posts_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(0)
        .mount(&server)
        .await;

    assert_ok!(slack(&server).announce(Stage::Start, &note(&[])).await);
}

#[tokio::test]
async fn test_webhook_posts_to_every_url_after_a_failure() {
    let broken = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&broken)
        .await;

    let healthy = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("Auth-Token", "hook-secret"))
        .and(body_partial_json(json!({ "status": "success", "version": "80185b8" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&healthy)
        .await;

    let announcer = WebhookAnnouncer::new(
        vec![broken.uri(), healthy.uri()],
        Some(SecretString::from("hook-secret".to_string())),
    )
    .unwrap();

    let err = assert_err!(announcer.announce(Stage::Success, &note(&[])).await);
    assert!(err.to_string().contains(&broken.uri()));
}

#[tokio::test]
async fn test_webhook_ignores_other_stages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let announcer = WebhookAnnouncer::new(vec![server.uri()], None).unwrap();
    assert_ok!(announcer.announce(Stage::Start, &note(&[])).await);
    assert_ok!(announcer.announce(Stage::Failure, &note(&[])).await);
}
