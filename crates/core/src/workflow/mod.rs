//! Transactional document workflows.
//!
//! Each workflow opens one transaction, allocates the document number,
//! persists the document and, once it is completed, records one movement per
//! line. Any failure aborts all of it.
//!
//! # Modules
//!
//! - `types` - Workflow inputs and outcomes
//! - `retry` - Bounded replay of transactions on conflicts
//! - `lifecycle` - Numbering, persistence, completion and cancellation
//! - `goods_receipt` - Goods Receipt (NIR)
//! - `sales` - Invoices and delivery notes
//! - `storno` - Returns at original cost
//! - `service` - The `DocumentWorkflows` façade

pub mod goods_receipt;
pub mod lifecycle;
pub mod retry;
pub mod sales;
pub mod service;
pub mod storno;
pub mod types;

#[cfg(test)]
mod service_tests;

pub use goods_receipt::receive_goods;
pub use lifecycle::{cancel_document, complete_document};
pub use retry::{RetryPolicy, UnitOfWork, run_in_transaction};
pub use sales::record_sale;
pub use service::DocumentWorkflows;
pub use storno::record_return;
pub use types::{
    GoodsReceiptInput, ReceiptLine, ReturnInput, ReturnLine, SaleLine, SalesInput,
    WorkflowOutcome,
};
