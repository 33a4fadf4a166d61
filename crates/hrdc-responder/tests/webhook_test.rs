use std::time::Duration;

use hrdc_responder::{Responder, ResponderError, ResponderRequest, WebhookConfig, WebhookResponder};
use hrdc_types::{AuthUser, Identity};
use mockito::Matcher;
use serde_json::json;

fn request() -> ResponderRequest {
    let mut identity = Identity::minimal(&AuthUser::new("u-1", "ada@example.com"));
    identity.first_name = "Ada".to_string();
    identity.last_name = "Lovelace".to_string();
    ResponderRequest::new("Hello", &identity, "t-1")
}

fn responder(url: String) -> WebhookResponder {
    WebhookResponder::new(WebhookConfig::new(url)).unwrap()
}

#[tokio::test]
async fn test_plain_text_reply() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/webhook/HDRC")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "message": "Hello",
            "userId": "u-1",
            "conversationId": "t-1",
            "userProfile": { "name": "Ada Lovelace", "email": "ada@example.com" }
        })))
        .with_status(200)
        .with_header("content-type", "text/plain")
        .with_body("Hi there")
        .create_async()
        .await;

    let reply = responder(format!("{}/webhook/HDRC", server.url()))
        .respond(request())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(reply, "Hi there");
}

#[tokio::test]
async fn test_json_output_field_reply() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/hook")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"output": "Here is your policy outline"}"#)
        .create_async()
        .await;

    let reply = responder(format!("{}/hook", server.url()))
        .respond(request())
        .await
        .unwrap();
    assert_eq!(reply, "Here is your policy outline");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/hook")
        .with_status(502)
        .with_body("upstream down")
        .create_async()
        .await;

    let err = responder(format!("{}/hook", server.url()))
        .respond(request())
        .await
        .unwrap_err();
    match err {
        ResponderError::Status { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body, "upstream down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_success_body_has_no_content() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/hook")
        .with_status(200)
        .with_body("")
        .create_async()
        .await;

    let err = responder(format!("{}/hook", server.url()))
        .respond(request())
        .await
        .unwrap_err();
    assert!(matches!(err, ResponderError::NoContent));
}

#[tokio::test]
async fn test_slow_responder_times_out() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/hook")
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_secs(2));
            w.write_all(b"too late")
        })
        .create_async()
        .await;

    let config = WebhookConfig::new(format!("{}/hook", server.url()))
        .with_timeout(Duration::from_millis(200));
    let err = WebhookResponder::new(config)
        .unwrap()
        .respond(request())
        .await
        .unwrap_err();
    assert!(matches!(err, ResponderError::Timeout(_)), "got {err:?}");
}
