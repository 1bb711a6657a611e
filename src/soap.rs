//! SOAP boundary for the Web Connector protocol.
//!
//! The Web Connector POSTs SOAP 1.1 envelopes naming one of eight methods in
//! the `http://developer.intuit.com/` namespace. Requests are parsed into
//! typed per-method structs with a real XML parser; responses are rendered as
//! `<soap:Envelope><soap:Body><{m}Response><{m}Result>` with the protocol's
//! sentinel strings (`"nvu"`, `""`, `"done"`) produced only here at the wire
//! edge. Everything behind this module works with tagged enums.

use quick_xml::Reader;
use quick_xml::events::{BytesDecl, Event};
use thiserror::Error;

use crate::qbxml::XmlWriter;

/// Namespace the Web Connector uses for its method elements.
pub const QBWC_NAMESPACE: &str = "http://developer.intuit.com/";

const SOAP_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Errors from the SOAP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SoapError {
    #[error("malformed SOAP envelope: {0}")]
    Parse(String),
    #[error("SOAP body contains no method element")]
    MissingMethod,
    #[error("unsupported Web Connector method: {0}")]
    UnknownMethod(String),
    #[error("failed to serialize SOAP response: {0}")]
    Serialize(String),
}

/// One parsed Web Connector call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QbwcRequest {
    ServerVersion,
    ClientVersion {
        version: String,
    },
    Authenticate {
        username: String,
        password: String,
    },
    SendRequestXml {
        ticket: String,
        company_file: String,
        country: String,
    },
    ReceiveResponseXml {
        ticket: String,
        response: String,
        hresult: String,
        message: String,
    },
    CloseConnection {
        ticket: String,
    },
    ConnectionError {
        ticket: String,
        hresult: String,
        message: String,
    },
    GetLastError {
        ticket: String,
    },
}

impl QbwcRequest {
    /// Wire name of the method, used for the `{m}Response` wrapper and
    /// per-method metrics.
    pub fn method_name(&self) -> &'static str {
        match self {
            QbwcRequest::ServerVersion => "serverVersion",
            QbwcRequest::ClientVersion { .. } => "clientVersion",
            QbwcRequest::Authenticate { .. } => "authenticate",
            QbwcRequest::SendRequestXml { .. } => "sendRequestXML",
            QbwcRequest::ReceiveResponseXml { .. } => "receiveResponseXML",
            QbwcRequest::CloseConnection { .. } => "closeConnection",
            QbwcRequest::ConnectionError { .. } => "connectionError",
            QbwcRequest::GetLastError { .. } => "getLastError",
        }
    }
}

/// Outcome of `authenticate`, serialized as a two-string array: the ticket
/// plus an empty second element on success, or the `"nvu"` sentinel. The
/// protocol has no HTTP error channel for bad credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Valid { ticket: String },
    InvalidUser,
}

/// Outcome of `clientVersion`: accept silently, warn, or refuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientVersionResult {
    Accept,
    Warn(String),
    Reject(String),
}

/// Outcome of `sendRequestXML`. `NoWork` serializes to the empty string the
/// Web Connector interprets as "cycle finished".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Work(String),
    NoWork,
}

/// Typed response for each method, turned into a SOAP envelope at the edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QbwcResponse {
    ServerVersion(String),
    ClientVersion(ClientVersionResult),
    Authenticate(AuthOutcome),
    SendRequestXml(SendOutcome),
    /// Percent complete; this implementation always reports 100.
    ReceiveResponseXml(i32),
    CloseConnection(String),
    ConnectionError(String),
    GetLastError(String),
}

fn local_name(qname: &[u8]) -> String {
    let name = String::from_utf8_lossy(qname);
    match name.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => name.into_owned(),
    }
}

/// Parse a SOAP envelope into a typed request. The method element is the
/// first child of `Body`; its leaf children are collected as parameters.
pub fn parse_request(envelope: &str) -> Result<QbwcRequest, SoapError> {
    let mut reader = Reader::from_str(envelope);
    reader.config_mut().trim_text(true);

    let mut in_body = false;
    let mut method: Option<String> = None;
    let mut current_param: Option<String> = None;
    let mut params: Vec<(String, String)> = Vec::new();

    loop {
        match reader
            .read_event()
            .map_err(|e| SoapError::Parse(e.to_string()))?
        {
            Event::Start(start) => {
                let name = local_name(start.name().as_ref());
                if method.is_none() {
                    if name == "Body" {
                        in_body = true;
                    } else if in_body {
                        method = Some(name);
                    }
                } else {
                    // Parameter elements carry text; register them even when
                    // the connector sends them empty.
                    params.push((name.clone(), String::new()));
                    current_param = Some(name);
                }
            }
            Event::Empty(start) => {
                let name = local_name(start.name().as_ref());
                if method.is_some() {
                    params.push((name, String::new()));
                } else if in_body {
                    method = Some(name);
                }
            }
            Event::Text(text) => {
                if current_param.is_some() {
                    let value = text
                        .unescape()
                        .map_err(|e| SoapError::Parse(e.to_string()))?
                        .into_owned();
                    if let Some((_, slot)) = params.last_mut() {
                        slot.push_str(&value);
                    }
                }
            }
            Event::End(end) => {
                let name = local_name(end.name().as_ref());
                if current_param.as_deref() == Some(&name) {
                    current_param = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let method = method.ok_or(SoapError::MissingMethod)?;
    let param = |name: &str| -> String {
        params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
            .unwrap_or_default()
    };

    match method.as_str() {
        "serverVersion" => Ok(QbwcRequest::ServerVersion),
        "clientVersion" => Ok(QbwcRequest::ClientVersion {
            version: param("strVersion"),
        }),
        "authenticate" => Ok(QbwcRequest::Authenticate {
            username: param("strUserName"),
            password: param("strPassword"),
        }),
        "sendRequestXML" => Ok(QbwcRequest::SendRequestXml {
            ticket: param("ticket"),
            company_file: param("strCompanyFileName"),
            country: param("qbXMLCountry"),
        }),
        "receiveResponseXML" => Ok(QbwcRequest::ReceiveResponseXml {
            ticket: param("ticket"),
            response: param("response"),
            hresult: param("hresult"),
            message: param("message"),
        }),
        "closeConnection" => Ok(QbwcRequest::CloseConnection {
            ticket: param("ticket"),
        }),
        "connectionError" => Ok(QbwcRequest::ConnectionError {
            ticket: param("ticket"),
            hresult: param("hresult"),
            message: param("message"),
        }),
        "getLastError" => Ok(QbwcRequest::GetLastError {
            ticket: param("ticket"),
        }),
        other => Err(SoapError::UnknownMethod(other.to_string())),
    }
}

/// Render a typed response as the SOAP envelope the Web Connector expects.
pub fn serialize_response(response: &QbwcResponse) -> Result<String, SoapError> {
    let (method, body): (&str, ResponseBody) = match response {
        QbwcResponse::ServerVersion(version) => ("serverVersion", ResponseBody::Text(version)),
        QbwcResponse::ClientVersion(result) => (
            "clientVersion",
            match result {
                ClientVersionResult::Accept => ResponseBody::OwnedText(String::new()),
                ClientVersionResult::Warn(msg) => ResponseBody::OwnedText(format!("W:{msg}")),
                ClientVersionResult::Reject(msg) => ResponseBody::OwnedText(format!("E:{msg}")),
            },
        ),
        QbwcResponse::Authenticate(outcome) => (
            "authenticate",
            match outcome {
                AuthOutcome::Valid { ticket } => {
                    ResponseBody::StringArray(vec![ticket.clone(), String::new()])
                }
                AuthOutcome::InvalidUser => {
                    ResponseBody::StringArray(vec![String::new(), "nvu".to_string()])
                }
            },
        ),
        QbwcResponse::SendRequestXml(outcome) => (
            "sendRequestXML",
            match outcome {
                SendOutcome::Work(xml) => ResponseBody::Text(xml),
                SendOutcome::NoWork => ResponseBody::OwnedText(String::new()),
            },
        ),
        QbwcResponse::ReceiveResponseXml(percent) => (
            "receiveResponseXML",
            ResponseBody::OwnedText(percent.to_string()),
        ),
        QbwcResponse::CloseConnection(message) => ("closeConnection", ResponseBody::Text(message)),
        QbwcResponse::ConnectionError(message) => ("connectionError", ResponseBody::Text(message)),
        QbwcResponse::GetLastError(message) => ("getLastError", ResponseBody::Text(message)),
    };

    render_envelope(method, &body).map_err(|e| SoapError::Serialize(e.to_string()))
}

/// Render a client-fault envelope for requests that could not be parsed.
/// Answered with HTTP 200; the Web Connector treats transport errors as
/// fatal but reports faults through its own UI.
pub fn serialize_fault(message: &str) -> Result<String, SoapError> {
    let mut w = XmlWriter::new();
    w.event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(|e| SoapError::Serialize(e.to_string()))?;
    let body = (|| {
        w.open_with_attrs("soap:Envelope", &[("xmlns:soap", SOAP_NAMESPACE)])?;
        w.open("soap:Body")?;
        w.open("soap:Fault")?;
        w.leaf("faultcode", "soap:Client")?;
        w.leaf("faultstring", message)?;
        w.close("soap:Fault")?;
        w.close("soap:Body")?;
        w.close("soap:Envelope")
    })();
    body.map_err(|e| SoapError::Serialize(e.to_string()))?;
    Ok(w.finish())
}

enum ResponseBody<'a> {
    Text(&'a str),
    OwnedText(String),
    StringArray(Vec<String>),
}

fn render_envelope(
    method: &str,
    body: &ResponseBody<'_>,
) -> Result<String, crate::qbxml::QbxmlError> {
    let response_elem = format!("{method}Response");
    let result_elem = format!("{method}Result");

    let mut w = XmlWriter::new();
    w.event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    w.open_with_attrs("soap:Envelope", &[("xmlns:soap", SOAP_NAMESPACE)])?;
    w.open("soap:Body")?;
    w.open_with_attrs(&response_elem, &[("xmlns", QBWC_NAMESPACE)])?;

    // Results always carry a text node, even when empty: the empty string is
    // itself a protocol sentinel and must serialize as `<r></r>`, not `<r/>`
    // split across indented lines.
    match body {
        ResponseBody::Text(text) => w.leaf(&result_elem, text)?,
        ResponseBody::OwnedText(text) => w.leaf(&result_elem, text)?,
        ResponseBody::StringArray(entries) => {
            w.open(&result_elem)?;
            for entry in entries {
                w.leaf("string", entry)?;
            }
            w.close(&result_elem)?;
        }
    }

    w.close(&response_elem)?;
    w.close("soap:Body")?;
    w.close("soap:Envelope")?;
    Ok(w.finish())
}
