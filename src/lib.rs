//! UK Payroll Engine
//!
//! This crate calculates monthly UK statutory payroll for a single employee:
//! PAYE income tax from an HMRC tax code, employee and employer National
//! Insurance, NHS Pension Scheme and workplace pension contributions, and
//! student loan repayments. Rate tables are resolved once per tax year per
//! payroll run, falling back to built-in 2025/26 figures when a provider
//! cannot supply them.
//!
//! # Example
//!
//! ```
//! use uk_payroll_engine::calculation::calculate_monthly_payroll;
//! use uk_payroll_engine::config::default_rate_tables;
//! use uk_payroll_engine::models::{PayrollDetails, TaxYear};
//! use rust_decimal::Decimal;
//!
//! let tables = default_rate_tables(TaxYear::new(2025));
//! let details = PayrollDetails::new("emp_001", Decimal::from(2_500), "1257L");
//! let payslip = calculate_monthly_payroll(&details, &tables).unwrap();
//! assert_eq!(payslip.gross_pay, Decimal::from(2_500));
//! ```

#![warn(missing_docs)]

pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
