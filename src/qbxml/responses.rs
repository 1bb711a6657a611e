//! QBXML response parsers.
//!
//! Each parser locates its `*Rs` segment, reads the per-segment
//! `statusCode`/`statusMessage` attributes, and on success extracts the
//! QuickBooks-assigned identifiers or returned rows. A non-zero status is
//! returned as data; only malformed XML or a missing segment is an error.

use quick_xml::Reader;
use quick_xml::events::Event;

use super::{QbxmlError, ResponseStatus, attr_value};

/// Parsed `SalesReceiptAddRs` segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesReceiptResponse {
    pub status: ResponseStatus,
    /// QuickBooks transaction identifier, present on success.
    pub txn_id: Option<String>,
    pub ref_number: Option<String>,
}

/// One `ItemInventoryRet` row from an inventory query.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryItemRow {
    pub list_id: String,
    pub full_name: Option<String>,
    pub quantity_on_hand: f64,
    pub average_cost: Option<f64>,
}

/// Parsed `ItemInventoryQueryRs` segment.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryQueryResponse {
    pub status: ResponseStatus,
    pub items: Vec<InventoryItemRow>,
}

/// Parsed `CustomerAddRs` segment.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerAddResponse {
    pub status: ResponseStatus,
    /// QuickBooks customer ListID, present on success.
    pub list_id: Option<String>,
}

/// Streaming cursor over a response document, tracking the current leaf tag.
struct ResponseScanner<'a> {
    reader: Reader<&'a [u8]>,
    current_tag: Option<String>,
}

enum Token {
    Open(String, Option<ResponseStatus>),
    Close(String),
    Text(String, String),
    Eof,
}

impl<'a> ResponseScanner<'a> {
    fn new(xml: &'a str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            current_tag: None,
        }
    }

    fn next(&mut self) -> Result<Token, QbxmlError> {
        loop {
            match self
                .reader
                .read_event()
                .map_err(|e| QbxmlError::Parse(e.to_string()))?
            {
                Event::Start(start) => {
                    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                    let status = attr_value(&start, "statusCode").map(|code| ResponseStatus {
                        code,
                        message: attr_value(&start, "statusMessage").unwrap_or_default(),
                    });
                    self.current_tag = Some(name.clone());
                    return Ok(Token::Open(name, status));
                }
                Event::Empty(start) => {
                    // A failed segment is often rendered self-closing.
                    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                    let status = attr_value(&start, "statusCode").map(|code| ResponseStatus {
                        code,
                        message: attr_value(&start, "statusMessage").unwrap_or_default(),
                    });
                    return Ok(Token::Open(name, status));
                }
                Event::End(end) => {
                    let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                    self.current_tag = None;
                    return Ok(Token::Close(name));
                }
                Event::Text(text) => {
                    if let Some(tag) = self.current_tag.clone() {
                        let value = text
                            .unescape()
                            .map_err(|e| QbxmlError::Parse(e.to_string()))?
                            .into_owned();
                        return Ok(Token::Text(tag, value));
                    }
                }
                Event::Eof => return Ok(Token::Eof),
                _ => {}
            }
        }
    }
}

fn missing_segment(segment: &str) -> QbxmlError {
    QbxmlError::Parse(format!("response contains no {segment} segment"))
}

/// Parse a `SalesReceiptAddRs` response, extracting the assigned `TxnID`.
pub fn parse_sales_receipt_response(xml: &str) -> Result<SalesReceiptResponse, QbxmlError> {
    let mut scanner = ResponseScanner::new(xml);
    let mut response: Option<SalesReceiptResponse> = None;

    loop {
        match scanner.next()? {
            Token::Open(name, status) if name == "SalesReceiptAddRs" => {
                response = Some(SalesReceiptResponse {
                    status: status.ok_or_else(|| {
                        QbxmlError::Parse("SalesReceiptAddRs is missing statusCode".into())
                    })?,
                    txn_id: None,
                    ref_number: None,
                });
            }
            Token::Text(tag, value) => {
                if let Some(parsed) = response.as_mut() {
                    match tag.as_str() {
                        "TxnID" => parsed.txn_id = Some(value),
                        "RefNumber" => parsed.ref_number = Some(value),
                        _ => {}
                    }
                }
            }
            Token::Eof => break,
            _ => {}
        }
    }

    response.ok_or_else(|| missing_segment("SalesReceiptAddRs"))
}

/// Parse an `ItemInventoryQueryRs` response into inventory rows.
pub fn parse_inventory_query_response(xml: &str) -> Result<InventoryQueryResponse, QbxmlError> {
    let mut scanner = ResponseScanner::new(xml);
    let mut response: Option<InventoryQueryResponse> = None;
    let mut list_id: Option<String> = None;
    let mut full_name: Option<String> = None;
    let mut quantity_on_hand: Option<f64> = None;
    let mut average_cost: Option<f64> = None;

    loop {
        match scanner.next()? {
            Token::Open(name, status) => {
                if name == "ItemInventoryQueryRs" {
                    response = Some(InventoryQueryResponse {
                        status: status.ok_or_else(|| {
                            QbxmlError::Parse("ItemInventoryQueryRs is missing statusCode".into())
                        })?,
                        items: Vec::new(),
                    });
                } else if name == "ItemInventoryRet" {
                    list_id = None;
                    full_name = None;
                    quantity_on_hand = None;
                    average_cost = None;
                }
            }
            Token::Text(tag, value) => match tag.as_str() {
                "ListID" => list_id = Some(value),
                "FullName" => full_name = Some(value),
                "QuantityOnHand" => quantity_on_hand = value.parse().ok(),
                "AverageCost" => average_cost = value.parse().ok(),
                _ => {}
            },
            Token::Close(name) if name == "ItemInventoryRet" => {
                let parsed = response
                    .as_mut()
                    .ok_or_else(|| missing_segment("ItemInventoryQueryRs"))?;
                if let Some(id) = list_id.take() {
                    parsed.items.push(InventoryItemRow {
                        list_id: id,
                        full_name: full_name.take(),
                        quantity_on_hand: quantity_on_hand.take().unwrap_or(0.0),
                        average_cost: average_cost.take(),
                    });
                }
            }
            Token::Eof => break,
            _ => {}
        }
    }

    response.ok_or_else(|| missing_segment("ItemInventoryQueryRs"))
}

/// Parse a `CustomerAddRs` response, extracting the assigned `ListID`.
pub fn parse_customer_add_response(xml: &str) -> Result<CustomerAddResponse, QbxmlError> {
    let mut scanner = ResponseScanner::new(xml);
    let mut response: Option<CustomerAddResponse> = None;
    let mut in_ret = false;

    loop {
        match scanner.next()? {
            Token::Open(name, status) => {
                if name == "CustomerAddRs" {
                    response = Some(CustomerAddResponse {
                        status: status.ok_or_else(|| {
                            QbxmlError::Parse("CustomerAddRs is missing statusCode".into())
                        })?,
                        list_id: None,
                    });
                } else if name == "CustomerRet" {
                    in_ret = true;
                }
            }
            Token::Close(name) if name == "CustomerRet" => in_ret = false,
            Token::Text(tag, value) if tag == "ListID" && in_ret => {
                if let Some(parsed) = response.as_mut() {
                    parsed.list_id = Some(value);
                }
            }
            Token::Eof => break,
            _ => {}
        }
    }

    response.ok_or_else(|| missing_segment("CustomerAddRs"))
}
