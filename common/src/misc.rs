use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use uuid::Uuid;

use crate::error::{AppError, Res};

/// Invoices a FREE user may own.
pub const FREE_PLAN_INVOICE_LIMIT: i64 = 1000;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Plan {
    Free,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "FREE",
            Plan::Pro => "PRO",
        }
    }

    pub fn from_str(s: &str) -> Res<Self> {
        match s {
            "FREE" => Ok(Plan::Free),
            "PRO" => Ok(Plan::Pro),
            ps => Err(AppError::Internal(format!("Invalid plan: {}", ps))),
        }
    }

    /// Total invoices the plan allows, `None` when unlimited.
    pub fn invoice_limit(&self) -> Option<i64> {
        match self {
            Plan::Free => Some(FREE_PLAN_INVOICE_LIMIT),
            Plan::Pro => None,
        }
    }

    /// Fails when a user on this plan who already owns `current` invoices creates another one.
    pub fn ensure_can_create_invoice(&self, current: i64) -> Res<()> {
        match self.invoice_limit() {
            Some(limit) if current >= limit => Err(AppError::Forbidden(format!(
                "Free plan limit reached ({} invoices). Upgrade to Pro to create more invoices.",
                limit
            ))),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status shown to users. Only `Unpaid` and `Paid` are ever stored;
/// `Overdue` is derived on every read.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceStatus {
    Unpaid,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "UNPAID",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Overdue => "OVERDUE",
        }
    }

    pub fn from_str(s: &str) -> Res<Self> {
        match s.to_uppercase().as_str() {
            "UNPAID" => Ok(InvoiceStatus::Unpaid),
            "PAID" => Ok(InvoiceStatus::Paid),
            "OVERDUE" => Ok(InvoiceStatus::Overdue),
            ps => Err(AppError::BadRequest(format!("Invalid invoice status: {}", ps))),
        }
    }

    /// Derives the displayed status from the stored one.
    pub fn derive(stored: &str, due_date: NaiveDateTime, now: NaiveDateTime) -> Self {
        match stored {
            "PAID" => InvoiceStatus::Paid,
            _ if due_date < now => InvoiceStatus::Overdue,
            _ => InvoiceStatus::Unpaid,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmailSendOption {
    SendNow,
    #[default]
    SaveOnly,
    Schedule,
}

impl EmailSendOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailSendOption::SendNow => "send_now",
            EmailSendOption::SaveOnly => "save_only",
            EmailSendOption::Schedule => "schedule",
        }
    }

    pub fn from_str(s: &str) -> Res<Self> {
        match s {
            "send_now" => Ok(EmailSendOption::SendNow),
            "save_only" => Ok(EmailSendOption::SaveOnly),
            "schedule" => Ok(EmailSendOption::Schedule),
            ps => Err(AppError::BadRequest(format!(
                "Invalid email send option: {}",
                ps
            ))),
        }
    }
}

impl fmt::Display for EmailSendOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Short human-facing invoice number, e.g. `INV-3F2A9C1B`.
pub fn invoice_reference(id: &Uuid) -> String {
    let simple = id.simple().to_string();
    format!("INV-{}", simple[..8].to_uppercase())
}
