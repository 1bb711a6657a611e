//! # QBXML Adapter
//!
//! Pure conversion between domain DTOs and QBXML request/response strings.
//! No I/O and no state: builders emit version-stamped QBXML documents, parsers
//! turn `*Rs` response segments into typed results. QuickBooks-reported
//! failures (statusCode != 0) are data, not errors; only malformed XML and
//! unmapped items surface as [`QbxmlError`].

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use thiserror::Error;

pub mod requests;
pub mod responses;

pub use requests::{
    CustomerAdd, InventoryAdjustment, InventoryQuery, PaymentMethod, ReceiptLine, SalesReceipt,
    build_customer_add_request, build_inventory_adjustment_request,
    build_inventory_query_request, build_sales_receipt_request,
};
pub use responses::{
    CustomerAddResponse, InventoryItemRow, InventoryQueryResponse, SalesReceiptResponse,
    parse_customer_add_response, parse_inventory_query_response, parse_sales_receipt_response,
};

/// QBXML dialect version advertised in the processing instruction
/// (QuickBooks POS 2013).
pub const QBXML_VERSION: &str = "13.0";

/// Errors raised by the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QbxmlError {
    /// A sale line references an item with no QuickBooks mapping. Raised
    /// before any XML is produced so the caller can record a visible failure
    /// instead of sending an incomplete request.
    #[error("line item \"{0}\" has no QuickBooks item mapping")]
    UnmappedItem(String),

    /// Response XML could not be parsed or is missing the expected segment.
    #[error("malformed QBXML: {0}")]
    Parse(String),

    /// Request XML could not be serialized.
    #[error("failed to serialize QBXML: {0}")]
    Serialize(String),
}

/// Per-segment status reported by QuickBooks in a `*Rs` element.
///
/// `"0"` means success; any other code is a remote failure carried with the
/// verbatim message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseStatus {
    pub code: String,
    pub message: String,
}

impl ResponseStatus {
    pub fn is_success(&self) -> bool {
        self.code == "0"
    }
}

/// Thin wrapper over the quick-xml writer so builders stay declarative.
pub(crate) struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl XmlWriter {
    pub(crate) fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    pub(crate) fn event(&mut self, event: Event<'_>) -> Result<(), QbxmlError> {
        self.inner
            .write_event(event)
            .map_err(|e| QbxmlError::Serialize(e.to_string()))
    }

    pub(crate) fn open(&mut self, name: &str) -> Result<(), QbxmlError> {
        self.event(Event::Start(BytesStart::new(name)))
    }

    pub(crate) fn open_with_attrs(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> Result<(), QbxmlError> {
        let mut start = BytesStart::new(name);
        for (key, value) in attrs {
            start.push_attribute((*key, *value));
        }
        self.event(Event::Start(start))
    }

    pub(crate) fn close(&mut self, name: &str) -> Result<(), QbxmlError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    /// Write `<name>text</name>`; text is escaped by the writer.
    pub(crate) fn leaf(&mut self, name: &str, text: &str) -> Result<(), QbxmlError> {
        self.open(name)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    pub(crate) fn finish(self) -> String {
        String::from_utf8_lossy(&self.inner.into_inner()).into_owned()
    }
}

/// Wrap a request body in the uniform document frame: XML declaration, the
/// `<?qbxml version="13.0"?>` processing instruction, and the `<QBXML>` root
/// with a `<QBXMLMsgsRq onError="stopOnError">` message envelope.
pub(crate) fn format_qbxml<F>(body: F) -> Result<String, QbxmlError>
where
    F: FnOnce(&mut XmlWriter) -> Result<(), QbxmlError>,
{
    let mut writer = XmlWriter::new();
    writer.event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    let version_pi = format!("qbxml version=\"{QBXML_VERSION}\"");
    writer.event(Event::PI(BytesPI::new(version_pi.as_str())))?;
    writer.open("QBXML")?;
    writer.open_with_attrs("QBXMLMsgsRq", &[("onError", "stopOnError")])?;
    body(&mut writer)?;
    writer.close("QBXMLMsgsRq")?;
    writer.close("QBXML")?;
    Ok(writer.finish())
}

/// Well-formedness check only: succeeds iff the document parses end to end.
pub fn validate_qbxml(xml: &str) -> Result<(), QbxmlError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => return Ok(()),
            Ok(_) => {}
            Err(e) => return Err(QbxmlError::Parse(e.to_string())),
        }
    }
}

/// Scan every element for a non-zero `statusCode` and return the first
/// failure as `"Error {code}: {message}"`, or `None` if all segments succeeded.
pub fn extract_error_details(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        let event = reader.read_event().ok()?;
        let start = match &event {
            Event::Start(e) | Event::Empty(e) => e,
            Event::Eof => return None,
            _ => continue,
        };
        let Some(code) = attr_value(start, "statusCode") else {
            continue;
        };
        if code != "0" {
            let message = attr_value(start, "statusMessage").unwrap_or_default();
            return Some(format!("Error {code}: {message}"));
        }
    }
}

/// Read one attribute off a start tag, unescaped. Missing or undecodable
/// attributes read as `None`.
pub(crate) fn attr_value(start: &BytesStart<'_>, name: &str) -> Option<String> {
    let attr = start.try_get_attribute(name).ok()??;
    attr.unescape_value().ok().map(|v| v.into_owned())
}

/// Render a money amount with exactly two decimal digits.
pub(crate) fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

/// Render a quantity without a trailing `.0` for whole numbers.
pub(crate) fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
