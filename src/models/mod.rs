//! Core data models for the UK Payroll Engine.
//!
//! This module contains the payroll input and output types, the parsed tax
//! code, and the tax year and NI category value types.

mod audit;
mod ni_category;
mod payroll_details;
mod payroll_result;
mod tax_code;
mod tax_year;

pub use audit::{AuditStep, AuditTrace, AuditWarning};
pub use ni_category::NiCategory;
pub use payroll_details::{EmployeeIdentity, PayItem, PayrollDetails, StudentLoanPlan};
pub use payroll_result::{NhsPensionContribution, NiEarningsBands, PayrollResult, PayrollTotals};
pub use tax_code::{FlatRate, TaxBasis, TaxCode, TaxCodeKind, TaxRegion};
pub use tax_year::{TAX_MONTHS_PER_YEAR, TaxYear};
