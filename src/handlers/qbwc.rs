//! SOAP endpoint polled by the QuickBooks Web Connector.
//!
//! One route, always HTTP 200 with a text/xml body: the connector treats
//! transport errors as fatal for the whole cycle, so even an unparseable
//! envelope is answered in-band with a SOAP fault.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::server::AppState;
use crate::soap;

const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

pub async fn soap_endpoint(State(state): State<AppState>, body: String) -> Response {
    let request = match soap::parse_request(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Unparseable SOAP request");
            return fault_response(&e.to_string());
        }
    };

    let response = state.protocol.dispatch(request).await;
    match soap::serialize_response(&response) {
        Ok(xml) => ([(CONTENT_TYPE, SOAP_CONTENT_TYPE)], xml).into_response(),
        Err(e) => {
            // Serialization only fails on writer errors, which should not
            // happen for our own response shapes.
            warn!(error = %e, "Failed to serialize SOAP response");
            fault_response("internal error")
        }
    }
}

fn fault_response(message: &str) -> Response {
    let xml = soap::serialize_fault(message).unwrap_or_else(|_| String::new());
    ([(CONTENT_TYPE, SOAP_CONTENT_TYPE)], xml).into_response()
}
