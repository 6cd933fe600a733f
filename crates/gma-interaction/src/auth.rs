//! Authentication engine: CAS ticket handshake and Drupal session setup.
//!
//! ```text
//! login(user, pass)
//!   1. logout if logged in (best-effort), clear cookies
//!   2. POST cas/v1/tickets {username, password}  -> Location: TGT url
//!   3. POST TGT url {service: gma_home}          -> body: service ticket
//!   4. GET gma_home&ticket=ST                     -> Drupal session cookie
//!   5. GET ?q=services/session/token              -> CSRF token (non-fatal)
//!   6. GET current user                           -> identity, else logout + fail
//! ```

use crate::client::GmaClient;
use crate::executor::ServiceCall;
use gma_core::envelope::Envelope;
use gma_core::error::{AuthStage, GmaError, Result};
use gma_core::session::User;
use gma_core::transport::{HttpMethod, HttpRequest, HttpResponse};
use tracing::{debug, info, warn};

const TOKEN_PATH: &str = "?q=services/session/token";
const LOGOUT_PATH: &str = "?q=logout";
pub(crate) const CURRENT_USER_PATH: &str = "?q=gmaservices/gma_user&type=current";

/// Drupal renders this in the page body when it rejects a service ticket,
/// still answering 200.
const CAS_FAILURE_MARKER: &str = "CAS Authentication failed";

impl GmaClient {
    /// Logs in through CAS and establishes the GMA session.
    ///
    /// On failure the session stays logged out. A failing CSRF token fetch
    /// only logs a warning; a failing user lookup logs out again and fails.
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        self.end_existing_session().await;
        self.reset_session().await;

        let service = self.config().gma_home();
        let ticket = self.restful_cas_ticket(username, password, &service).await?;
        self.login_with_ticket(&ticket).await
    }

    /// Obtains a CAS service ticket for `service` through the REST API.
    pub async fn restful_cas_ticket(&self, username: &str, password: &str, service: &str) -> Result<String> {
        let tgt_url = self.request_ticket_granting_ticket(username, password).await?;
        self.request_service_ticket(&tgt_url, service).await
    }

    /// Finishes a login with a service ticket obtained elsewhere
    /// (e.g. through a CAS proxy). An existing session is logged out first,
    /// so a rejected ticket leaves the client logged out.
    pub async fn login_with_ticket(&self, ticket: &str) -> Result<User> {
        self.end_existing_session().await;
        let url = format!("{}&ticket={}", self.config().gma_home(), ticket.trim());
        let response = self.send_raw(HttpRequest::new(HttpMethod::Get, url)).await?;

        if response.status >= 400 {
            return Err(GmaError::auth(
                AuthStage::ServiceLogin,
                format!("status: {}", response.status),
            ));
        }
        if response.body.contains(CAS_FAILURE_MARKER) {
            return Err(GmaError::auth(
                AuthStage::ServiceLogin,
                "Sorry, there was a problem authenticating with the server",
            ));
        }
        debug!("GMA accepted the service ticket");

        if let Err(err) = self.refresh_csrf_token().await {
            warn!(error = %err, "could not fetch CSRF token, continuing without it");
        }

        match self.fetch_current_user(false).await {
            Ok(user) => {
                self.session_mut().establish(user.clone());
                info!(ren_id = %user.ren_id, name = %user.preferred_name, "logged in to GMA");
                Ok(user)
            }
            Err(err) => {
                warn!(error = %err, "could not resolve current user, logging out");
                if let Err(logout_err) = self.logout().await {
                    warn!(error = %logout_err, "logout after failed user lookup also failed");
                }
                Err(GmaError::auth(
                    AuthStage::UserInfo,
                    format!("Could not get user info: {err}"),
                ))
            }
        }
    }

    /// Fetches and stores the Drupal CSRF token.
    pub async fn refresh_csrf_token(&self) -> Result<String> {
        let body = self
            .execute(&ServiceCall::get(TOKEN_PATH).html(), false)
            .await
            .map_err(|err| GmaError::auth(AuthStage::CsrfToken, err.to_string()))?
            .into_text();
        self.session_mut().set_csrf_token(&body);
        Ok(body.trim().to_string())
    }

    /// Logs out of Drupal. Local session state, caches and cookies are
    /// cleared whether or not the request succeeds.
    pub async fn logout(&self) -> Result<()> {
        let result = self
            .execute(&ServiceCall::head(LOGOUT_PATH).html(), false)
            .await;
        self.reset_session().await;
        result.map(|_| info!("logged out of GMA"))
    }

    /// Best-effort logout of a live session; local state is cleared either way.
    async fn end_existing_session(&self) {
        if !self.is_logged_in() {
            return;
        }
        if let Err(err) = self.logout().await {
            warn!(error = %err, "logout before login failed, continuing");
        }
    }

    pub(crate) async fn fetch_current_user(&self, session_aware: bool) -> Result<User> {
        let body = self
            .execute(&ServiceCall::get(CURRENT_USER_PATH), session_aware)
            .await?;
        let data = Envelope::from_value(body.into_json(), CURRENT_USER_PATH)?
            .into_data(CURRENT_USER_PATH)?;
        let first = data.get(0).cloned().ok_or_else(|| {
            GmaError::parse("JSON", "current user response contained no user")
        })?;
        Ok(serde_json::from_value(first)?)
    }

    async fn request_ticket_granting_ticket(&self, username: &str, password: &str) -> Result<String> {
        let request = HttpRequest::new(HttpMethod::Post, self.config().cas_tickets_url())
            .with_form([("username", username), ("password", password)]);
        let response = self.send_raw(request).await?;
        let stage = AuthStage::TicketGranting;

        match response.status {
            404 => Err(GmaError::auth(
                stage,
                "Make sure your VPN and server settings are correct",
            )),
            400 => Err(GmaError::auth(stage, "Credentials were not accepted")),
            status if (200..300).contains(&status) => response
                .header("location")
                .map(str::trim)
                .filter(|location| !location.is_empty())
                .map(str::to_string)
                .ok_or_else(|| GmaError::auth(stage, "Credentials were not accepted")),
            status => Err(GmaError::auth(stage, format!("status: {status}"))),
        }
    }

    async fn request_service_ticket(&self, tgt_url: &str, service: &str) -> Result<String> {
        let request =
            HttpRequest::new(HttpMethod::Post, tgt_url).with_form([("service", service)]);
        let response = self.send_raw(request).await?;

        if !response.is_success() {
            return Err(GmaError::auth(
                AuthStage::ServiceTicket,
                format!("status: {}", response.status),
            ));
        }
        let ticket = response.body.trim();
        if ticket.is_empty() {
            return Err(GmaError::auth(
                AuthStage::ServiceTicket,
                "CAS did not return a service ticket",
            ));
        }
        Ok(ticket.to_string())
    }

    /// Sends a handshake request outside the service executor.
    async fn send_raw(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        if let Some(address) = &self.config().forwarded_for {
            request = request.with_header("X-Forwarded-For", address.clone());
        }
        debug!(method = %request.method, url = %request.url, "CAS handshake request");
        self.transport().send(request).await
    }
}
