//! # Services
//!
//! Orchestration between core components and repositories.

pub mod submission;

pub use submission::{
    BillNumberSource, SubmissionReceipt, SubmissionService, SubmitError, SystemBillNumbers,
};
