//! Invoice emails: composition with tera, delivery over SMTP with lettre.

pub mod compose;
pub mod transport;

pub use compose::{InvoiceEmail, InvoiceEmailData, compose_invoice_email, invoice_link};
pub use transport::{InvoiceMailer, SmtpMailer};
