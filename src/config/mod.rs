//! Rate table configuration for the UK Payroll Engine.
//!
//! This module provides the band and rate tables a calculation runs against:
//! the table types themselves, the built-in 2025/26 figures, the
//! [`RateTableProvider`] interface for live sources, a YAML-backed provider,
//! and the per-run [`RateTableCache`] that resolves a snapshot once per tax
//! year and falls back to the built-in figures table by table.
//!
//! # Example
//!
//! ```no_run
//! use uk_payroll_engine::config::{RateTableCache, YamlRateSource};
//! use uk_payroll_engine::models::TaxYear;
//!
//! # async fn run() {
//! let mut cache = RateTableCache::new();
//! let tables = cache
//!     .resolve(&YamlRateSource::new("./config/rates"), TaxYear::new(2025))
//!     .await;
//! println!("Fallback tables: {:?}", tables.fallback_tables());
//! # }
//! ```

mod cache;
mod defaults;
mod loader;
mod provider;
mod types;

pub use cache::RateTableCache;
pub use defaults::{
    DEFAULT_TAX_YEAR, default_ni_categories, default_ni_thresholds, default_nhs_pension_bands,
    default_rate_tables, default_student_loan_thresholds, default_tax_bands,
};
pub use loader::YamlRateSource;
pub use provider::{DefaultRateSource, RateTableProvider};
pub use types::{
    EmployeeNiRates, EmployerNiRates, NhsPensionBand, NiCategoryTable, NiThresholds,
    RateTableKind, RateTables, StudentLoanThreshold, TaxBand, TaxBandTable,
    validate_nhs_pension_bands, validate_ni_categories, validate_student_loan_thresholds,
};
