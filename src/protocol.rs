//! # Web Connector Protocol State Machine
//!
//! Implements the polling cycle behind the SOAP boundary: authenticate opens
//! a session, sendRequestXML drains the pending queue one entry at a time,
//! receiveResponseXML correlates each answer back to its log entry, and the
//! close/error calls tear the session down.
//!
//! Every method produces a response. The Web Connector has no error channel
//! besides its own sentinels, so internal failures are logged, remembered for
//! `getLastError`, and mapped to the protocol's "no work" / "invalid user"
//! shapes instead of propagating.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, error, info, warn};

use crate::credentials::verify_password;
use crate::orchestrator::SyncOrchestrator;
use crate::repositories::QbwcConfigRepository;
use crate::sessions::SessionManager;
use crate::soap::{
    AuthOutcome, ClientVersionResult, QbwcRequest, QbwcResponse, SendOutcome,
};

/// Transport-level success: the Web Connector reports an empty or zero
/// hresult when QuickBooks processed the request.
fn hresult_is_success(hresult: &str) -> bool {
    let trimmed = hresult.trim();
    trimmed.is_empty() || trimmed == "0"
}

/// Stateless dispatcher over the shared session table and orchestrator.
pub struct ProtocolHandler {
    sessions: Arc<SessionManager>,
    orchestrator: Arc<SyncOrchestrator>,
    config: QbwcConfigRepository,
}

impl ProtocolHandler {
    pub fn new(
        sessions: Arc<SessionManager>,
        orchestrator: Arc<SyncOrchestrator>,
        config: QbwcConfigRepository,
    ) -> Self {
        Self {
            sessions,
            orchestrator,
            config,
        }
    }

    /// Route one parsed call to its handler.
    pub async fn dispatch(&self, request: QbwcRequest) -> QbwcResponse {
        counter!("qbwc_requests_total", "method" => request.method_name()).increment(1);

        match request {
            QbwcRequest::ServerVersion => {
                QbwcResponse::ServerVersion(env!("CARGO_PKG_VERSION").to_string())
            }
            QbwcRequest::ClientVersion { version } => {
                debug!(version, "Web Connector client version");
                QbwcResponse::ClientVersion(ClientVersionResult::Accept)
            }
            QbwcRequest::Authenticate { username, password } => {
                QbwcResponse::Authenticate(self.authenticate(&username, &password).await)
            }
            QbwcRequest::SendRequestXml { ticket, .. } => {
                QbwcResponse::SendRequestXml(self.send_request_xml(&ticket).await)
            }
            QbwcRequest::ReceiveResponseXml {
                ticket,
                response,
                hresult,
                message,
            } => QbwcResponse::ReceiveResponseXml(
                self.receive_response_xml(&ticket, &response, &hresult, &message)
                    .await,
            ),
            QbwcRequest::CloseConnection { ticket } => {
                self.sessions.close_session(&ticket).await;
                QbwcResponse::CloseConnection("OK".to_string())
            }
            QbwcRequest::ConnectionError {
                ticket,
                hresult,
                message,
            } => {
                warn!(hresult, message, "Web Connector reported a connection error");
                self.sessions.close_session(&ticket).await;
                if let Err(e) = self.config.set_connection_status("error").await {
                    error!(error = %e, "Failed to record connection error status");
                }
                // "done" tells the connector not to retry within this cycle.
                QbwcResponse::ConnectionError("done".to_string())
            }
            QbwcRequest::GetLastError { ticket } => {
                QbwcResponse::GetLastError(self.get_last_error(&ticket).await)
            }
        }
    }

    async fn authenticate(&self, username: &str, password: &str) -> AuthOutcome {
        let config = match self.config.get().await {
            Ok(Some(config)) => config,
            Ok(None) => {
                warn!("Authenticate rejected: bridge is not configured");
                return AuthOutcome::InvalidUser;
            }
            Err(e) => {
                error!(error = %e, "Authenticate failed to load configuration");
                return AuthOutcome::InvalidUser;
            }
        };

        if !config.sync_enabled {
            info!("Authenticate rejected: sync is disabled");
            return AuthOutcome::InvalidUser;
        }

        let credentials_match = config.qbwc_username == username
            && verify_password(password, &config.qbwc_password_hash);
        if !credentials_match {
            counter!("qbwc_auth_failures_total").increment(1);
            warn!(username, "Authenticate rejected: invalid credentials");
            return AuthOutcome::InvalidUser;
        }

        let ticket = self
            .sessions
            .create_session(username, config.company_file.clone())
            .await;
        if let Err(e) = self.config.set_connection_status("connected").await {
            error!(error = %e, "Failed to record connected status");
        }
        info!(username, "Web Connector authenticated");
        AuthOutcome::Valid { ticket }
    }

    /// Hand out the next pending request, loading the cycle's batch on first
    /// call. An unknown ticket means a dead session; answer "no work" so the
    /// connector ends the cycle.
    async fn send_request_xml(&self, ticket: &str) -> SendOutcome {
        let Some(handle) = self.sessions.get_session(ticket).await else {
            debug!("sendRequestXML for unknown ticket");
            return SendOutcome::NoWork;
        };
        let mut session = handle.lock().await;

        if !session.work_loaded {
            let batch = self.orchestrator.settings().pending_batch_size;
            match self.orchestrator.get_pending_requests(batch).await {
                Ok(mut pending) => {
                    // Rows without a request body cannot be sent; they only
                    // exist if queued by hand.
                    pending.retain(|entry| entry.qbxml_request.is_some());
                    info!(pending = pending.len(), "Polling cycle work loaded");
                    session.pending_requests = pending;
                    session.work_loaded = true;
                }
                Err(e) => {
                    error!(error = %e, "Failed to load pending sync requests");
                    session.last_error = Some(e.to_string());
                    return SendOutcome::NoWork;
                }
            }
        }

        let Some(entry) = session.pending_requests.get(session.current_index) else {
            debug!("Polling cycle drained");
            return SendOutcome::NoWork;
        };
        let Some(xml) = entry.qbxml_request.clone() else {
            return SendOutcome::NoWork;
        };

        if let Err(e) = self.orchestrator.mark_request_sent(entry.id).await {
            error!(log_id = %entry.id, error = %e, "Failed to mark request as sent");
            session.last_error = Some(e.to_string());
            return SendOutcome::NoWork;
        }

        session.current_index += 1;
        SendOutcome::Work(xml)
    }

    /// Correlate a response to the entry handed out by the previous
    /// `sendRequestXML` and process it. Always reports 100 percent; the
    /// connector keeps polling `sendRequestXML` until it gets "no work".
    async fn receive_response_xml(
        &self,
        ticket: &str,
        response: &str,
        hresult: &str,
        message: &str,
    ) -> i32 {
        let Some(handle) = self.sessions.get_session(ticket).await else {
            debug!("receiveResponseXML for unknown ticket");
            return 100;
        };
        let mut session = handle.lock().await;

        let outstanding = session
            .current_index
            .checked_sub(1)
            .and_then(|i| session.pending_requests.get(i));
        let Some(entry) = outstanding else {
            warn!("receiveResponseXML with no outstanding request");
            return 100;
        };
        let entry_id = entry.id;

        let transport_success = hresult_is_success(hresult);
        if !transport_success {
            warn!(log_id = %entry_id, hresult, message, "Transport-level response error");
        }

        match self
            .orchestrator
            .process_qb_response(entry_id, response, transport_success)
            .await
        {
            Ok(updated) => {
                if let Some(error_message) = updated.error_message {
                    session.last_error = Some(error_message);
                }
            }
            Err(e) => {
                error!(log_id = %entry_id, error = %e, "Failed to process response");
                session.last_error = Some(e.to_string());
            }
        }

        100
    }

    async fn get_last_error(&self, ticket: &str) -> String {
        let Some(handle) = self.sessions.get_session(ticket).await else {
            return String::new();
        };
        let session = handle.lock().await;
        session.last_error.clone().unwrap_or_default()
    }
}
