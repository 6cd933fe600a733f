#![allow(dead_code)]

use async_trait::async_trait;
use gma_core::config::GmaConfig;
use gma_core::error::{GmaError, Result};
use gma_core::transport::{HttpMethod, HttpRequest, HttpResponse, Transport};
use gma_interaction::{BusyIndicator, GmaClient, ReloginHandler};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const GMA_BASE: &str = "https://gma.test/";
pub const CAS_URL: &str = "https://cas.test/cas";
pub const TGT_URL: &str = "https://cas.test/cas/v1/tickets/TGT-1";

pub const TICKETS: &str = "/v1/tickets";
pub const HOME_WITH_TICKET: &str = "&ticket=ST-1";
pub const TOKEN: &str = "?q=services/session/token";
pub const CURRENT_USER: &str = "?q=gmaservices/gma_user&type=current";
pub const LOGOUT: &str = "?q=logout";
pub const LANGUAGES: &str = "?q=gmaservices/gma_language";

pub const LOGIN_PAGE: &str = "<!DOCTYPE html><html><body>Please log in</body></html>";

enum Scripted {
    Response(HttpResponse),
    Error(GmaError),
}

/// Replays scripted responses, routed by URL suffix.
///
/// Each route is a queue; a request takes the front of the first route
/// whose suffix matches and whose queue is not empty.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<(String, VecDeque<Scripted>)>>,
    requests: Mutex<Vec<HttpRequest>>,
    cookie_clears: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push_scripted(&self, suffix: &str, scripted: Scripted) {
        let mut routes = self.routes.lock().unwrap();
        match routes.iter_mut().find(|(s, _)| s == suffix) {
            Some((_, queue)) => queue.push_back(scripted),
            None => routes.push((suffix.to_string(), VecDeque::from([scripted]))),
        }
    }

    pub fn on(&self, suffix: &str, response: HttpResponse) {
        self.push_scripted(suffix, Scripted::Response(response));
    }

    pub fn on_json(&self, suffix: &str, body: Value) {
        self.on(suffix, HttpResponse::new(200, body.to_string()));
    }

    pub fn on_data(&self, suffix: &str, data: Value) {
        self.on_json(suffix, json!({ "success": true, "data": data }));
    }

    pub fn on_html(&self, suffix: &str, status: u16, body: &str) {
        self.on(suffix, HttpResponse::new(status, body));
    }

    pub fn on_error(&self, suffix: &str, err: GmaError) {
        self.push_scripted(suffix, Scripted::Error(err));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, suffix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.url.ends_with(suffix))
            .count()
    }

    pub fn requests_by_method(&self, method: HttpMethod) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    pub fn cookie_clears(&self) -> usize {
        self.cookie_clears.load(Ordering::SeqCst)
    }

    pub fn reset_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        // Let concurrent calls interleave the way real I/O would.
        tokio::task::yield_now().await;

        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        let scripted = {
            let mut routes = self.routes.lock().unwrap();
            routes
                .iter_mut()
                .find(|(suffix, queue)| url.ends_with(suffix.as_str()) && !queue.is_empty())
                .and_then(|(_, queue)| queue.pop_front())
        };
        match scripted {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Error(err)) => Err(err),
            None => Err(GmaError::transport(format!("no scripted response for {url}"))),
        }
    }

    async fn clear_cookies(&self) -> Result<()> {
        self.cookie_clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn config() -> GmaConfig {
    GmaConfig::new(GMA_BASE, CAS_URL)
}

pub fn user_json() -> Value {
    json!([{ "renId": 77, "preferredName": "Jo Tester", "GUID": "GUID-77" }])
}

/// Scripts one successful CAS + Drupal login.
pub fn script_login(mock: &MockTransport) {
    mock.on(TICKETS, HttpResponse::new(201, "").with_header("Location", TGT_URL));
    mock.on_html("TGT-1", 200, "ST-1\n");
    mock.on_html(HOME_WITH_TICKET, 200, "<html>Welcome to GMA</html>");
    mock.on_html(TOKEN, 200, "csrf-abc");
    mock.on_data(CURRENT_USER, user_json());
}

/// Scripts the logout-then-login sequence a relogin performs.
pub fn script_relogin(mock: &MockTransport) {
    mock.on_html(LOGOUT, 200, "");
    script_login(mock);
}

pub fn client(mock: &Arc<MockTransport>) -> GmaClient {
    GmaClient::builder(config())
        .with_transport(mock.clone())
        .build()
        .unwrap()
}

pub async fn logged_in_client(mock: &Arc<MockTransport>) -> GmaClient {
    script_login(mock);
    let client = client(mock);
    client.login("jo", "secret").await.unwrap();
    mock.reset_requests();
    client
}

/// Relogin collaborator that counts invocations and delegates to `login`.
pub struct CountingRelogin {
    pub calls: Arc<AtomicUsize>,
    pub succeed: bool,
}

#[async_trait]
impl ReloginHandler for CountingRelogin {
    async fn relogin(&self, client: &GmaClient) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.succeed {
            return Err(GmaError::auth(
                gma_core::AuthStage::TicketGranting,
                "Credentials were not accepted",
            ));
        }
        client.login("jo", "secret").await.map(|_| ())
    }
}

#[derive(Default)]
pub struct RecordingIndicator {
    pub shows: AtomicUsize,
    pub hides: AtomicUsize,
}

impl BusyIndicator for RecordingIndicator {
    fn show(&self) {
        self.shows.fetch_add(1, Ordering::SeqCst);
    }
    fn hide(&self) {
        self.hides.fetch_add(1, Ordering::SeqCst);
    }
}
