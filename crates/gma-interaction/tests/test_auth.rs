mod common;

use common::*;
use gma_core::error::{AuthStage, GmaError};
use gma_core::transport::{HttpMethod, HttpResponse, RequestBody};
use gma_interaction::GmaClient;
use serde_json::json;

#[tokio::test]
async fn test_login_establishes_session() {
    let mock = MockTransport::new();
    script_login(&mock);
    let client = client(&mock);

    let user = client.login("jo", "secret").await.unwrap();

    assert_eq!(user.ren_id, "77");
    assert_eq!(user.preferred_name, "Jo Tester");
    assert!(client.is_logged_in());
    assert_eq!(client.csrf_token().as_deref(), Some("csrf-abc"));
    assert_eq!(client.user().unwrap().guid, "GUID-77");

    let requests = mock.requests();
    let urls: Vec<&str> = requests.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://cas.test/cas/v1/tickets",
            TGT_URL,
            "https://gma.test/?q=en/node&destination=node&ticket=ST-1",
            "https://gma.test/?q=services/session/token",
            "https://gma.test/?q=gmaservices/gma_user&type=current",
        ]
    );
    assert_eq!(
        requests[0].body,
        RequestBody::Form(vec![
            ("username".to_string(), "jo".to_string()),
            ("password".to_string(), "secret".to_string()),
        ])
    );
    assert_eq!(
        requests[1].body,
        RequestBody::Form(vec![(
            "service".to_string(),
            "https://gma.test/?q=en/node&destination=node".to_string()
        )])
    );
    assert_eq!(mock.cookie_clears(), 1);
}

#[tokio::test]
async fn test_login_succeeds_without_csrf_token() {
    let mock = MockTransport::new();
    mock.on(TICKETS, HttpResponse::new(201, "").with_header("Location", TGT_URL));
    mock.on_html("TGT-1", 200, "ST-1");
    mock.on_html(HOME_WITH_TICKET, 200, "<html>Welcome</html>");
    mock.on_html(TOKEN, 404, "not found");
    mock.on_data(CURRENT_USER, user_json());
    let client = client(&mock);

    client.login("jo", "secret").await.unwrap();

    assert!(client.is_logged_in());
    assert_eq!(client.csrf_token(), None);
}

#[tokio::test]
async fn test_login_rejected_credentials() {
    let mock = MockTransport::new();
    mock.on_html(TICKETS, 400, "");
    let client = client(&mock);

    let err = client.login("jo", "wrong").await.unwrap_err();

    assert_eq!(err.auth_stage(), Some(AuthStage::TicketGranting));
    assert!(err.to_string().contains("Credentials were not accepted"));
    assert!(!client.is_logged_in());
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn test_login_unreachable_cas_mentions_vpn() {
    let mock = MockTransport::new();
    mock.on_html(TICKETS, 404, "");
    let client = client(&mock);

    let err = client.login("jo", "secret").await.unwrap_err();
    assert!(err.to_string().contains("VPN"));
}

#[tokio::test]
async fn test_login_missing_location_is_rejected() {
    let mock = MockTransport::new();
    mock.on_html(TICKETS, 201, "");
    let client = client(&mock);

    let err = client.login("jo", "secret").await.unwrap_err();
    assert_eq!(err.auth_stage(), Some(AuthStage::TicketGranting));
    assert!(err.to_string().contains("Credentials were not accepted"));
}

#[tokio::test]
async fn test_login_other_status_is_reported() {
    let mock = MockTransport::new();
    mock.on_html(TICKETS, 503, "");
    let client = client(&mock);

    let err = client.login("jo", "secret").await.unwrap_err();
    assert!(err.to_string().contains("status: 503"));
}

#[tokio::test]
async fn test_login_cas_failure_page() {
    let mock = MockTransport::new();
    mock.on(TICKETS, HttpResponse::new(201, "").with_header("Location", TGT_URL));
    mock.on_html("TGT-1", 200, "ST-1");
    mock.on_html(
        HOME_WITH_TICKET,
        200,
        "<html><div class=\"error\">CAS Authentication failed!</div></html>",
    );
    let client = client(&mock);

    let err = client.login("jo", "secret").await.unwrap_err();

    assert_eq!(err.auth_stage(), Some(AuthStage::ServiceLogin));
    assert!(err.to_string().contains("problem authenticating"));
    assert!(!client.is_logged_in());
}

#[tokio::test]
async fn test_login_user_lookup_failure_logs_out() {
    let mock = MockTransport::new();
    mock.on(TICKETS, HttpResponse::new(201, "").with_header("Location", TGT_URL));
    mock.on_html("TGT-1", 200, "ST-1");
    mock.on_html(HOME_WITH_TICKET, 200, "<html>Welcome</html>");
    mock.on_html(TOKEN, 200, "csrf-abc");
    mock.on_json(
        CURRENT_USER,
        json!({ "success": false, "error": { "errorMessage": "no such user" } }),
    );
    mock.on_html(LOGOUT, 200, "");
    let client = client(&mock);

    let err = client.login("jo", "secret").await.unwrap_err();

    assert_eq!(err.auth_stage(), Some(AuthStage::UserInfo));
    assert!(err.to_string().contains("Could not get user info"));
    assert!(err.to_string().contains("no such user"));
    assert_eq!(mock.count(LOGOUT), 1);
    assert!(!client.is_logged_in());
    assert_eq!(client.csrf_token(), None);
}

#[tokio::test]
async fn test_login_when_logged_in_logs_out_first() {
    let mock = MockTransport::new();
    let client = logged_in_client(&mock).await;
    script_relogin(&mock);

    client.login("jo", "secret").await.unwrap();

    let requests = mock.requests();
    assert_eq!(requests[0].method, HttpMethod::Head);
    assert!(requests[0].url.ends_with(LOGOUT));
    assert!(client.is_logged_in());
}

#[tokio::test]
async fn test_rejected_ticket_on_live_session_logs_out() {
    let mock = MockTransport::new();
    let client = logged_in_client(&mock).await;
    mock.on_html(LOGOUT, 200, "");
    mock.on_html(
        "&ticket=ST-BAD",
        200,
        "<html><div class=\"error\">CAS Authentication failed!</div></html>",
    );

    let err = client.login_with_ticket("ST-BAD").await.unwrap_err();

    assert_eq!(err.auth_stage(), Some(AuthStage::ServiceLogin));
    assert_eq!(mock.count(LOGOUT), 1);
    assert_eq!(mock.requests()[0].method, HttpMethod::Head);
    assert!(!client.is_logged_in());
    assert_eq!(client.user(), None);
    assert_eq!(client.csrf_token(), None);
}

#[tokio::test]
async fn test_logout_clears_state_even_on_failure() {
    let mock = MockTransport::new();
    let client = logged_in_client(&mock).await;
    mock.on_error(LOGOUT, GmaError::transport("connection reset"));
    let clears_before = mock.cookie_clears();

    let result = client.logout().await;

    assert!(result.unwrap_err().is_transport());
    assert!(!client.is_logged_in());
    assert_eq!(client.csrf_token(), None);
    assert_eq!(client.user(), None);
    assert_eq!(mock.cookie_clears(), clears_before + 1);
}

#[tokio::test]
async fn test_restful_cas_ticket_for_other_service() {
    let mock = MockTransport::new();
    mock.on(TICKETS, HttpResponse::new(201, "").with_header("Location", TGT_URL));
    mock.on_html("TGT-1", 200, "  ST-99  ");
    let client = client(&mock);

    let ticket = client
        .restful_cas_ticket("jo", "secret", "https://other.test/")
        .await
        .unwrap();

    assert_eq!(ticket, "ST-99");
    assert!(!client.is_logged_in());
}

#[tokio::test]
async fn test_forwarded_for_is_sent_on_every_request() {
    let mock = MockTransport::new();
    script_login(&mock);
    let client = GmaClient::builder(config().with_forwarded_for("10.1.2.3"))
        .with_transport(mock.clone())
        .build()
        .unwrap();

    client.login("jo", "secret").await.unwrap();

    let requests = mock.requests();
    assert!(!requests.is_empty());
    for request in requests {
        assert_eq!(request.header("X-Forwarded-For"), Some("10.1.2.3"), "{}", request.url);
    }
}
