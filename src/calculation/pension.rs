//! Workplace pension contribution.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::AuditStep;

/// The result of a workplace pension calculation, including the audit step.
#[derive(Debug, Clone)]
pub struct WorkplacePensionResult {
    /// Employee contribution for the month.
    pub contribution: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates the employee's workplace pension contribution as a percentage
/// of monthly salary.
///
/// # Returns
///
/// Returns a `WorkplacePensionResult`, or an `InvalidInput` error if the
/// percentage is outside 0-100.
///
/// # Examples
///
/// ```
/// use uk_payroll_engine::calculation::calculate_workplace_pension;
/// use rust_decimal::Decimal;
///
/// let result = calculate_workplace_pension(Decimal::from(2_500), Decimal::from(5), 1).unwrap();
/// assert_eq!(result.contribution, Decimal::from(125));
/// ```
pub fn calculate_workplace_pension(
    monthly_salary: Decimal,
    percentage: Decimal,
    step_number: u32,
) -> EngineResult<WorkplacePensionResult> {
    if percentage < Decimal::ZERO || percentage > Decimal::ONE_HUNDRED {
        return Err(EngineError::InvalidInput {
            field: "pension_percentage".to_string(),
            message: "must be between 0 and 100".to_string(),
        });
    }

    let contribution = monthly_salary * percentage / Decimal::ONE_HUNDRED;

    let audit_step = AuditStep {
        step_number,
        rule_id: "workplace_pension".to_string(),
        rule_name: "Workplace Pension".to_string(),
        guidance_ref: "Net pay arrangement".to_string(),
        input: serde_json::json!({
            "monthly_salary": monthly_salary.to_string(),
            "percentage": percentage.normalize().to_string()
        }),
        output: serde_json::json!({
            "contribution": contribution.normalize().to_string()
        }),
        reasoning: format!(
            "{} x {}% = {}",
            monthly_salary.normalize(),
            percentage.normalize(),
            contribution.normalize()
        ),
    };

    Ok(WorkplacePensionResult {
        contribution,
        audit_step,
    })
}
