//! QBXML request builders.
//!
//! Each builder takes a domain DTO and emits a complete, version-stamped
//! QBXML document. Building never performs I/O; an unmapped line item fails
//! fast with [`QbxmlError::UnmappedItem`] before any XML is produced.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{QbxmlError, format_amount, format_qbxml, format_quantity};

/// Fallback customer name used when the hotel user has no QuickBooks mapping.
pub const WALK_IN_CUSTOMER: &str = "Walk-in Customer";

/// Payment methods understood by the hotel system, mapped onto QuickBooks'
/// payment-method vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Check,
    CreditCard,
    DebitCard,
    RoomCharge,
    Other,
}

impl PaymentMethod {
    pub const fn qb_full_name(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Check => "Check",
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::DebitCard => "Debit Card",
            PaymentMethod::RoomCharge => "Room Charge",
            PaymentMethod::Other => "Other",
        }
    }
}

/// One line of a sales receipt. `item_list_id` is `None` when the hotel item
/// has no QuickBooks mapping, which makes the build fail.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptLine {
    pub item_list_id: Option<String>,
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
    pub sales_tax_code: Option<String>,
}

impl ReceiptLine {
    /// Line amount is always quantity × rate, never carried independently,
    /// so the rendered amount cannot drift from its factors.
    pub fn amount(&self) -> f64 {
        self.quantity * self.rate
    }
}

/// DTO for a `SalesReceiptAdd` request.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesReceipt {
    /// QuickBooks customer ListID when the hotel user is mapped.
    pub customer_list_id: Option<String>,
    pub txn_date: NaiveDate,
    /// Caller-supplied unique reference, e.g. `ORDER-{id}`.
    pub ref_number: String,
    pub payment_method: PaymentMethod,
    pub memo: Option<String>,
    pub lines: Vec<ReceiptLine>,
}

/// DTO for an `ItemInventoryQueryRq` request.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryQuery {
    /// Cap on returned rows.
    pub max_returned: u32,
    /// Restrict the query to a single item by ListID.
    pub item_list_id: Option<String>,
}

/// DTO for an `InventoryAdjustmentAdd` request setting a new absolute
/// on-hand quantity for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryAdjustment {
    pub item_list_id: String,
    pub adjustment_account: String,
    pub txn_date: NaiveDate,
    pub new_quantity: f64,
    /// When given, a value adjustment is emitted with the new total value
    /// (quantity × unit cost) alongside the new quantity.
    pub unit_cost: Option<f64>,
}

/// DTO for a `CustomerAdd` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerAdd {
    /// Required and must be unique within the QuickBooks company file.
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub bill_address: Vec<String>,
    pub bill_city: Option<String>,
    pub bill_state: Option<String>,
    pub bill_postal_code: Option<String>,
    pub bill_country: Option<String>,
}

/// Emit a `SalesReceiptAdd` request for an already-totalled sale.
pub fn build_sales_receipt_request(receipt: &SalesReceipt) -> Result<String, QbxmlError> {
    // Fail before serializing anything if a line is unmapped.
    for line in &receipt.lines {
        if line.item_list_id.is_none() {
            return Err(QbxmlError::UnmappedItem(line.description.clone()));
        }
    }

    format_qbxml(|w| {
        w.open_with_attrs("SalesReceiptAddRq", &[("requestID", "1")])?;
        w.open("SalesReceiptAdd")?;

        w.open("CustomerRef")?;
        match &receipt.customer_list_id {
            Some(list_id) => w.leaf("ListID", list_id)?,
            None => w.leaf("FullName", WALK_IN_CUSTOMER)?,
        }
        w.close("CustomerRef")?;

        w.leaf("TxnDate", &receipt.txn_date.format("%Y-%m-%d").to_string())?;
        w.leaf("RefNumber", &receipt.ref_number)?;

        w.open("PaymentMethodRef")?;
        w.leaf("FullName", receipt.payment_method.qb_full_name())?;
        w.close("PaymentMethodRef")?;

        if let Some(memo) = &receipt.memo {
            w.leaf("Memo", memo)?;
        }

        for line in &receipt.lines {
            let list_id = line
                .item_list_id
                .as_deref()
                .ok_or_else(|| QbxmlError::UnmappedItem(line.description.clone()))?;

            w.open("SalesReceiptLineAdd")?;
            w.open("ItemRef")?;
            w.leaf("ListID", list_id)?;
            w.close("ItemRef")?;
            w.leaf("Desc", &line.description)?;
            w.leaf("Quantity", &format_quantity(line.quantity))?;
            w.leaf("Rate", &format_amount(line.rate))?;
            w.leaf("Amount", &format_amount(line.amount()))?;
            if let Some(tax_code) = &line.sales_tax_code {
                w.open("SalesTaxCodeRef")?;
                w.leaf("FullName", tax_code)?;
                w.close("SalesTaxCodeRef")?;
            }
            w.close("SalesReceiptLineAdd")?;
        }

        w.close("SalesReceiptAdd")?;
        w.close("SalesReceiptAddRq")
    })
}

/// Emit an `ItemInventoryQueryRq` asking for on-hand quantity and average
/// cost of active items.
pub fn build_inventory_query_request(query: &InventoryQuery) -> Result<String, QbxmlError> {
    format_qbxml(|w| {
        w.open_with_attrs("ItemInventoryQueryRq", &[("requestID", "1")])?;
        if let Some(list_id) = &query.item_list_id {
            w.leaf("ListID", list_id)?;
        }
        w.leaf("MaxReturned", &query.max_returned.to_string())?;
        w.leaf("ActiveStatus", "ActiveOnly")?;
        w.leaf("IncludeRetElement", "ListID")?;
        w.leaf("IncludeRetElement", "FullName")?;
        w.leaf("IncludeRetElement", "QuantityOnHand")?;
        w.leaf("IncludeRetElement", "AverageCost")?;
        w.close("ItemInventoryQueryRq")
    })
}

/// Emit an `InventoryAdjustmentAdd` that sets a new absolute on-hand
/// quantity (and, when a unit cost is given, a new total value) for one item.
pub fn build_inventory_adjustment_request(
    adjustment: &InventoryAdjustment,
) -> Result<String, QbxmlError> {
    format_qbxml(|w| {
        w.open_with_attrs("InventoryAdjustmentAddRq", &[("requestID", "1")])?;
        w.open("InventoryAdjustmentAdd")?;

        w.open("AccountRef")?;
        w.leaf("FullName", &adjustment.adjustment_account)?;
        w.close("AccountRef")?;
        w.leaf(
            "TxnDate",
            &adjustment.txn_date.format("%Y-%m-%d").to_string(),
        )?;

        w.open("InventoryAdjustmentLineAdd")?;
        w.open("ItemRef")?;
        w.leaf("ListID", &adjustment.item_list_id)?;
        w.close("ItemRef")?;
        match adjustment.unit_cost {
            Some(unit_cost) => {
                w.open("ValueAdjustment")?;
                w.leaf("NewQuantity", &format_quantity(adjustment.new_quantity))?;
                w.leaf(
                    "NewValue",
                    &format_amount(adjustment.new_quantity * unit_cost),
                )?;
                w.close("ValueAdjustment")?;
            }
            None => {
                w.open("QuantityAdjustment")?;
                w.leaf("NewQuantity", &format_quantity(adjustment.new_quantity))?;
                w.close("QuantityAdjustment")?;
            }
        }
        w.close("InventoryAdjustmentLineAdd")?;

        w.close("InventoryAdjustmentAdd")?;
        w.close("InventoryAdjustmentAddRq")
    })
}

/// Emit a `CustomerAdd` request.
pub fn build_customer_add_request(customer: &CustomerAdd) -> Result<String, QbxmlError> {
    format_qbxml(|w| {
        w.open_with_attrs("CustomerAddRq", &[("requestID", "1")])?;
        w.open("CustomerAdd")?;

        w.leaf("Name", &customer.name)?;
        if let Some(first_name) = &customer.first_name {
            w.leaf("FirstName", first_name)?;
        }
        if let Some(last_name) = &customer.last_name {
            w.leaf("LastName", last_name)?;
        }

        let has_address = !customer.bill_address.is_empty()
            || customer.bill_city.is_some()
            || customer.bill_state.is_some()
            || customer.bill_postal_code.is_some()
            || customer.bill_country.is_some();
        if has_address {
            w.open("BillAddress")?;
            for (index, addr_line) in customer.bill_address.iter().take(5).enumerate() {
                w.leaf(&format!("Addr{}", index + 1), addr_line)?;
            }
            if let Some(city) = &customer.bill_city {
                w.leaf("City", city)?;
            }
            if let Some(state) = &customer.bill_state {
                w.leaf("State", state)?;
            }
            if let Some(postal_code) = &customer.bill_postal_code {
                w.leaf("PostalCode", postal_code)?;
            }
            if let Some(country) = &customer.bill_country {
                w.leaf("Country", country)?;
            }
            w.close("BillAddress")?;
        }

        if let Some(phone) = &customer.phone {
            w.leaf("Phone", phone)?;
        }
        if let Some(email) = &customer.email {
            w.leaf("Email", email)?;
        }

        w.close("CustomerAdd")?;
        w.close("CustomerAddRq")
    })
}
