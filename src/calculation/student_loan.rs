//! Student and postgraduate loan repayment.

use rust_decimal::Decimal;

use crate::config::RateTables;
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, StudentLoanPlan};

/// The result of a student loan calculation, including the audit step.
#[derive(Debug, Clone)]
pub struct StudentLoanResult {
    /// The plan applied, if any.
    pub plan: Option<StudentLoanPlan>,
    /// Repayment for the month.
    pub repayment: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates a month's student loan repayment.
///
/// The repayment is `max(0, (salary - threshold) × rate)`. Only base salary
/// counts; callers must not include bonuses or overtime in
/// `monthly_salary`.
///
/// # Returns
///
/// Returns a `StudentLoanResult` (zero repayment when `plan` is `None`), or
/// an `InvalidInput` error if the plan has no threshold in `tables`.
///
/// # Examples
///
/// ```
/// use uk_payroll_engine::calculation::calculate_student_loan;
/// use uk_payroll_engine::config::default_rate_tables;
/// use uk_payroll_engine::models::{StudentLoanPlan, TaxYear};
/// use rust_decimal::Decimal;
///
/// let tables = default_rate_tables(TaxYear::new(2025));
/// let result =
///     calculate_student_loan(Decimal::from(3_000), Some(StudentLoanPlan::Plan2), &tables, 1).unwrap();
/// // (3,000 - 2,372.50) x 9%
/// assert_eq!(result.repayment, Decimal::new(564750, 4));
/// ```
pub fn calculate_student_loan(
    monthly_salary: Decimal,
    plan: Option<StudentLoanPlan>,
    tables: &RateTables,
    step_number: u32,
) -> EngineResult<StudentLoanResult> {
    let Some(plan) = plan else {
        return Ok(StudentLoanResult {
            plan: None,
            repayment: Decimal::ZERO,
            audit_step: AuditStep {
                step_number,
                rule_id: "student_loan".to_string(),
                rule_name: "Student Loan Repayment".to_string(),
                guidance_ref: "CWG2 chapter 4".to_string(),
                input: serde_json::json!({ "plan": null }),
                output: serde_json::json!({ "repayment": "0" }),
                reasoning: "No student loan plan".to_string(),
            },
        });
    };

    let threshold = tables
        .student_loan(plan)
        .ok_or_else(|| EngineError::InvalidInput {
            field: "student_loan_plan".to_string(),
            message: format!(
                "plan {} has no threshold for {}",
                plan.number(),
                tables.tax_year()
            ),
        })?;

    let repayment =
        ((monthly_salary - threshold.monthly_threshold) * threshold.rate).max(Decimal::ZERO);

    let audit_step = AuditStep {
        step_number,
        rule_id: "student_loan".to_string(),
        rule_name: "Student Loan Repayment".to_string(),
        guidance_ref: "CWG2 chapter 4".to_string(),
        input: serde_json::json!({
            "plan": plan.number(),
            "monthly_salary": monthly_salary.to_string(),
            "monthly_threshold": threshold.monthly_threshold.to_string(),
            "rate": threshold.rate.normalize().to_string()
        }),
        output: serde_json::json!({
            "repayment": repayment.normalize().to_string()
        }),
        reasoning: if repayment.is_zero() {
            format!("Salary at or below the plan {} threshold", plan.number())
        } else {
            format!(
                "({} - {}) x {} = {}",
                monthly_salary.normalize(),
                threshold.monthly_threshold.normalize(),
                threshold.rate.normalize(),
                repayment.normalize()
            )
        },
    };

    Ok(StudentLoanResult {
        plan: Some(plan),
        repayment,
        audit_step,
    })
}
