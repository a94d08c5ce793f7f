#![allow(clippy::unwrap_used)]
// Integration tests for `NotificationClient` using wiremock.

use serde_json::json;
use tokio::sync::watch;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notisync_api::{Credential, Error, Mutation, NotificationApi, NotificationClient, PageQuery};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, NotificationClient) {
    let server = MockServer::start().await;
    let (_tx, rx) = watch::channel(Some(Credential::new("test-token")));
    let client =
        NotificationClient::with_client(&server.uri(), reqwest::Client::new(), rx).unwrap();
    (server, client)
}

fn page_body(ids: &[&str], page: u32, total: u64) -> serde_json::Value {
    let notifications: Vec<_> = ids
        .iter()
        .map(|id| {
            json!({
                "_id": id,
                "title": format!("Title {id}"),
                "description": "body",
                "read": false,
                "type": "activity",
                "priority": "normal",
                "timestamp": "2026-01-05T10:00:00Z"
            })
        })
        .collect();
    json!({
        "notifications": notifications,
        "pagination": { "page": page, "limit": 10, "total": total }
    })
}

// ── Fetch API ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_page_sends_bearer_and_filters() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/users/notifications"))
        .and(header("Authorization", "Bearer test-token"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "10"))
        .and(query_param("status", "unread"))
        .and(query_param("search", "deadline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&["a", "b"], 1, 12)))
        .expect(1)
        .mount(&server)
        .await;

    let mut query = PageQuery::new(1, 10);
    query.status = Some("unread".into());
    query.search = Some("deadline".into());

    let page = client.fetch_page(&query).await.unwrap();
    assert_eq!(page.notifications.len(), 2);
    assert_eq!(page.notifications[0].id, "a");
    assert_eq!(page.pagination.total, 12);
    assert!(page.has_more());
}

#[tokio::test]
async fn test_fetch_page_respects_explicit_has_more() {
    let (server, client) = setup().await;

    let mut body = page_body(&["a"], 1, 50);
    body["hasMore"] = json!(false);

    Mock::given(method("GET"))
        .and(path("/users/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let page = client.fetch_page(&PageQuery::new(1, 10)).await.unwrap();
    assert!(!page.has_more());
}

#[tokio::test]
async fn test_quick_check() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/users/notifications/quick-check"))
        .and(query_param("lastCount", "4"))
        .and(query_param("lastUnread", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hasChanges": true,
            "totalCount": 5,
            "unreadCount": 3
        })))
        .mount(&server)
        .await;

    let probe = client.quick_check(4, 2).await.unwrap();
    assert!(probe.has_changes);
    assert_eq!(probe.total_count, 5);
    assert_eq!(probe.unread_count, 3);
}

#[tokio::test]
async fn test_base_url_with_path_prefix() {
    let server = MockServer::start().await;
    let (_tx, rx) = watch::channel(Some(Credential::new("t")));
    let client = NotificationClient::with_client(
        &format!("{}/api", server.uri()),
        reqwest::Client::new(),
        rx,
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/users/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&[], 1, 0)))
        .expect(1)
        .mount(&server)
        .await;

    let page = client.fetch_page(&PageQuery::new(1, 10)).await.unwrap();
    assert!(page.notifications.is_empty());
}

// ── Mutation API ────────────────────────────────────────────────────

#[tokio::test]
async fn test_mutations_hit_expected_routes() {
    let (server, client) = setup().await;

    for (verb, route) in [
        ("PATCH", "/users/notifications/n1/read"),
        ("PATCH", "/users/notifications/n1/unread"),
        ("DELETE", "/users/notifications/n1"),
        ("PATCH", "/users/notifications/mark-all-read"),
        ("POST", "/users/clear-notifications"),
    ] {
        Mock::given(method(verb))
            .and(path(route))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
            .expect(1)
            .mount(&server)
            .await;
    }

    for mutation in [
        Mutation::MarkRead("n1".into()),
        Mutation::MarkUnread("n1".into()),
        Mutation::Delete("n1".into()),
        Mutation::MarkAllRead,
        Mutation::ClearAll,
    ] {
        let ack = client.mutate(&mutation).await.unwrap();
        assert_eq!(ack.message.as_deref(), Some("ok"));
    }
}

#[tokio::test]
async fn test_mutation_with_empty_body_acks() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/users/notifications/n2"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let ack = client.mutate(&Mutation::Delete("n2".into())).await.unwrap();
    assert_eq!(ack.message, None);
}

// ── Error handling ──────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_maps_to_credential_rejection() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/users/notifications"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "jwt expired" })),
        )
        .mount(&server)
        .await;

    let err = client.fetch_page(&PageQuery::new(1, 10)).await.unwrap_err();
    match err {
        Error::Unauthorized { message } => assert_eq!(message, "jwt expired"),
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn test_forbidden_maps_to_credential_rejection() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/users/notifications/mark-all-read"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client.mutate(&Mutation::MarkAllRead).await.unwrap_err();
    assert!(err.is_auth_rejected());
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/users/notifications/quick-check"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client.quick_check(0, 0).await.unwrap_err();
    match &err {
        Error::Http { status, message } => {
            assert_eq!(*status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("expected Http, got {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/users/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client.fetch_page(&PageQuery::new(1, 10)).await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "<html>oops</html>"),
        other => panic!("expected Deserialization, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_credential_sends_nothing() {
    let server = MockServer::start().await;
    let (_tx, rx) = watch::channel(None);
    let client = NotificationClient::with_client(&server.uri(), reqwest::Client::new(), rx).unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client.fetch_page(&PageQuery::new(1, 10)).await.unwrap_err();
    assert!(matches!(err, Error::MissingCredential));
}

#[tokio::test]
async fn test_token_change_applies_to_next_request() {
    let server = MockServer::start().await;
    let (tx, rx) = watch::channel(Some(Credential::new("old")));
    let client = NotificationClient::with_client(&server.uri(), reqwest::Client::new(), rx).unwrap();

    Mock::given(method("GET"))
        .and(path("/users/notifications/quick-check"))
        .and(header("Authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hasChanges": false,
            "totalCount": 0,
            "unreadCount": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    tx.send_replace(Some(Credential::new("new")));
    let probe = client.quick_check(0, 0).await.unwrap();
    assert!(!probe.has_changes);
}
