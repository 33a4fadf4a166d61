use hrdc_persist::{ConversationStore, NewMessage, PersistError, PostgrestClient, ProfileStore, UsageStore};
use hrdc_types::Sender;
use mockito::Matcher;

#[tokio::test]
async fn test_list_threads_sends_nested_select() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/v1/conversations")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("select".into(), "*,messages(*)".into()),
            Matcher::UrlEncoded("user_id".into(), "eq.u-1".into()),
            Matcher::UrlEncoded("order".into(), "updated_at.desc".into()),
        ]))
        .match_header("apikey", "anon")
        .match_header("authorization", "Bearer user-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[{
                "id": "t-1",
                "user_id": "u-1",
                "title": "Hello",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:05:00Z",
                "messages": [
                    {"id": "m-2", "conversation_id": "t-1", "content": "Hi there", "sender": "ai", "is_error": null, "created_at": "2024-01-01T00:01:00Z"},
                    {"id": "m-1", "conversation_id": "t-1", "content": "Hello", "sender": "user", "created_at": "2024-01-01T00:00:30Z"}
                ]
            }]"#,
        )
        .create_async()
        .await;

    let client = PostgrestClient::new(server.url(), "anon").unwrap();
    client.set_access_token(Some("user-token".to_string())).await;

    let threads = client.list_threads("u-1").await.unwrap();
    mock.assert_async().await;
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].messages.len(), 2);
    assert_eq!(threads[0].messages[0].sender, Sender::Ai);
    assert_eq!(threads[0].messages[0].is_error, None);
}

#[tokio::test]
async fn test_insert_message_returns_representation() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/rest/v1/messages")
        .match_header("prefer", "return=representation")
        .match_body(Matcher::PartialJsonString(
            r#"{"conversation_id": "t-1", "sender": "user", "is_error": false}"#.to_string(),
        ))
        .with_status(201)
        .with_body(
            r#"[{"id": "m-1", "conversation_id": "t-1", "content": "Hello", "sender": "user", "is_error": false, "created_at": "2024-01-01T00:00:30Z"}]"#,
        )
        .create_async()
        .await;

    let client = PostgrestClient::new(server.url(), "anon").unwrap();
    let record = client
        .insert_message(NewMessage::user("t-1", "Hello"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(record.id, "m-1");
}

#[tokio::test]
async fn test_error_status_surfaces_store_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("DELETE", "/rest/v1/conversations")
        .match_query(Matcher::UrlEncoded("id".into(), "eq.t-1".into()))
        .with_status(401)
        .with_body(r#"{"message": "JWT expired"}"#)
        .create_async()
        .await;

    let client = PostgrestClient::new(server.url(), "anon").unwrap();
    let err = client.delete_thread("t-1").await.unwrap_err();
    match err {
        PersistError::Status { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "JWT expired");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_profile_is_none() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/rest/v1/profiles")
        .match_query(Matcher::UrlEncoded("id".into(), "eq.u-9".into()))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let client = PostgrestClient::new(server.url(), "anon").unwrap();
    assert!(client.get_profile("u-9").await.unwrap().is_none());
}

#[tokio::test]
async fn test_usage_rpc_empty_result_is_permissive() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/rest/v1/rpc/check_usage_limit")
        .match_body(Matcher::Json(serde_json::json!({ "user_id": "u-1" })))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let client = PostgrestClient::new(server.url(), "anon").unwrap();
    let usage = client.check_usage_limit("u-1").await.unwrap();
    mock.assert_async().await;
    assert!(usage.can_query);
    assert_eq!(usage.queries_today, 0);
}
