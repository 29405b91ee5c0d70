//! Error types for the UK Payroll Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur during a payroll calculation.
//! Error payloads never carry salary figures, employee names or NI numbers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{TaxRegion, TaxYear};

/// The main error type for the UK Payroll Engine.
///
/// # Example
///
/// ```
/// use uk_payroll_engine::error::EngineError;
///
/// let error = EngineError::UnrecognizedTaxCode {
///     code: "ZZZZ".to_string(),
/// };
/// assert_eq!(error.to_string(), "Unrecognized tax code: ZZZZ");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// The tax code does not match any known format.
    #[error("Unrecognized tax code: {code}")]
    UnrecognizedTaxCode {
        /// The normalized tax code that failed to parse.
        code: String,
    },

    /// The tax code carries a regional prefix that is not yet supported.
    #[error("Unsupported tax region: {region}")]
    UnsupportedTaxRegion {
        /// The region indicated by the tax code prefix.
        region: TaxRegion,
    },

    /// The NI category letter is unknown or missing from the rate table.
    #[error("Invalid NI category: {category}")]
    InvalidNiCategory {
        /// The category letter as supplied.
        category: String,
    },

    /// A calculation produced a result that breaks one of its invariants.
    #[error("Calculation integrity violation in {check}: {message}")]
    CalculationIntegrityViolation {
        /// The name of the failed check.
        check: String,
        /// A description of the violation.
        message: String,
    },

    /// A rate table could not be resolved from its provider.
    ///
    /// This is recovered internally by falling back to the built-in table.
    #[error("Rate table '{table}' unavailable for {tax_year}: {reason}")]
    RateTableUnavailable {
        /// Which table could not be resolved.
        table: String,
        /// The tax year that was requested.
        tax_year: TaxYear,
        /// Why the table was rejected.
        reason: String,
    },

    /// An input field was out of range or malformed.
    #[error("Invalid input field '{field}': {message}")]
    InvalidInput {
        /// The field that was invalid.
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// A rate table file was not found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// A rate table file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A phase of the payroll calculation failed.
    #[error("Payroll calculation failed in phase {} ({context}): {source}", .phase.code())]
    Calculation {
        /// The phase that failed.
        phase: CalculationPhase,
        /// Sanitized context about the calculation.
        context: ErrorContext,
        /// The underlying error.
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Returns the innermost error, unwrapping any phase wrapper.
    pub fn root_cause(&self) -> &EngineError {
        match self {
            EngineError::Calculation { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Returns the failed phase if this error came from the orchestrator.
    pub fn phase(&self) -> Option<CalculationPhase> {
        match self {
            EngineError::Calculation { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

/// The phases of a monthly payroll calculation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationPhase {
    /// Input validation and gross pay.
    Earnings,
    /// Tax code parsing and income tax.
    IncomeTax,
    /// Employee and employer National Insurance.
    NationalInsurance,
    /// Workplace and NHS pension contributions.
    Pension,
    /// Student and postgraduate loan repayment.
    StudentLoan,
    /// Final rounding and result assembly.
    Assembly,
}

impl CalculationPhase {
    /// Stable code for this phase, suitable for logs and error reports.
    pub fn code(&self) -> &'static str {
        match self {
            CalculationPhase::Earnings => "EARNINGS",
            CalculationPhase::IncomeTax => "INCOME_TAX",
            CalculationPhase::NationalInsurance => "NATIONAL_INSURANCE",
            CalculationPhase::Pension => "PENSION",
            CalculationPhase::StudentLoan => "STUDENT_LOAN",
            CalculationPhase::Assembly => "ASSEMBLY",
        }
    }
}

/// PII-free context attached to a phase failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Truncated employee reference; never the full identifier.
    pub employee_ref: String,
    /// The tax year being calculated.
    pub tax_year: TaxYear,
    /// The NI category letter as supplied.
    pub ni_category: String,
}

/// Number of leading identifier characters kept in an error context.
const EMPLOYEE_REF_VISIBLE_CHARS: usize = 3;

impl ErrorContext {
    /// Builds a context, truncating the employee identifier.
    pub fn new(employee_id: &str, tax_year: TaxYear, ni_category: &str) -> Self {
        Self {
            employee_ref: redact_employee_id(employee_id),
            tax_year,
            ni_category: ni_category.chars().take(2).collect(),
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "employee {}, tax year {}, category {}",
            self.employee_ref, self.tax_year, self.ni_category
        )
    }
}

/// Keeps the first few characters of an identifier and masks the rest.
pub fn redact_employee_id(employee_id: &str) -> String {
    let visible: String = employee_id
        .chars()
        .take(EMPLOYEE_REF_VISIBLE_CHARS)
        .collect();
    if employee_id.chars().count() > EMPLOYEE_REF_VISIBLE_CHARS {
        format!("{}***", visible)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognized_tax_code_displays_code() {
        let error = EngineError::UnrecognizedTaxCode {
            code: "ZZZZ".to_string(),
        };
        assert_eq!(error.to_string(), "Unrecognized tax code: ZZZZ");
    }

    #[test]
    fn test_unsupported_region_displays_region() {
        let error = EngineError::UnsupportedTaxRegion {
            region: TaxRegion::Scotland,
        };
        assert_eq!(error.to_string(), "Unsupported tax region: Scotland");
    }

    #[test]
    fn test_invalid_input_displays_field_and_message() {
        let error = EngineError::InvalidInput {
            field: "tax_period".to_string(),
            message: "must be between 1 and 12".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid input field 'tax_period': must be between 1 and 12"
        );
    }

    #[test]
    fn test_rate_table_unavailable_displays_table_and_year() {
        let error = EngineError::RateTableUnavailable {
            table: "ni_thresholds".to_string(),
            tax_year: TaxYear::new(2025),
            reason: "provider returned no data".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Rate table 'ni_thresholds' unavailable for 2025-26: provider returned no data"
        );
    }

    #[test]
    fn test_calculation_error_wraps_source_with_phase_code() {
        let error = EngineError::Calculation {
            phase: CalculationPhase::IncomeTax,
            context: ErrorContext::new("EMP-000123", TaxYear::new(2025), "A"),
            source: Box::new(EngineError::UnrecognizedTaxCode {
                code: "ZZZZ".to_string(),
            }),
        };

        assert_eq!(
            error.to_string(),
            "Payroll calculation failed in phase INCOME_TAX (employee EMP***, tax year 2025-26, category A): Unrecognized tax code: ZZZZ"
        );
        assert_eq!(error.phase(), Some(CalculationPhase::IncomeTax));
        assert!(matches!(
            error.root_cause(),
            EngineError::UnrecognizedTaxCode { .. }
        ));
    }

    #[test]
    fn test_redact_employee_id_never_returns_full_id() {
        assert_eq!(redact_employee_id("EMP-000123"), "EMP***");
        assert_eq!(redact_employee_id("AB"), "***");
        assert_eq!(redact_employee_id("ABC"), "***");
        assert_eq!(redact_employee_id(""), "***");
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_invalid_category() -> EngineResult<()> {
            Err(EngineError::InvalidNiCategory {
                category: "Q".to_string(),
            })
        }

        fn propagates_error() -> EngineResult<()> {
            returns_invalid_category()?;
            Ok(())
        }

        assert!(propagates_error().is_err());
    }
}
