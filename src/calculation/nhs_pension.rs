//! NHS Pension Scheme contribution calculation.
//!
//! This module determines a member's contribution tier from annual
//! pensionable pay and applies the tier's employee and employer rates.

use rust_decimal::Decimal;
use tracing::warn;

use crate::config::NhsPensionBand;
use crate::models::{AuditStep, NhsPensionContribution, TAX_MONTHS_PER_YEAR};

/// The result of an NHS pension calculation, including the audit step.
#[derive(Debug, Clone)]
pub struct NhsPensionResult {
    /// The contribution; tier 0 when not a member or not determined.
    pub contribution: NhsPensionContribution,
    /// Annual pensionable pay used to select the tier.
    pub annual_pensionable_pay: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates NHS pension contributions for one month.
///
/// The tier is chosen from `previous_year_pensionable_pay` when it is
/// present and positive, otherwise from `monthly_salary × 12`. Both
/// contributions are `monthly_salary × rate / 100`.
///
/// Non-members get a zero contribution. A member whose pay falls in no
/// tier, or for whom no tiers are available, also gets a zero contribution
/// with tier 0, which callers treat as "not determined".
///
/// # Examples
///
/// ```
/// use uk_payroll_engine::calculation::calculate_nhs_pension;
/// use uk_payroll_engine::config::default_nhs_pension_bands;
/// use rust_decimal::Decimal;
///
/// let bands = default_nhs_pension_bands();
/// let result = calculate_nhs_pension(Decimal::from(3_000), None, true, &bands, 1);
/// // £36,000 a year is tier 4 (9.8%)
/// assert_eq!(result.contribution.tier, 4);
/// assert_eq!(result.contribution.employee_contribution, Decimal::new(2940, 1));
/// ```
pub fn calculate_nhs_pension(
    monthly_salary: Decimal,
    previous_year_pensionable_pay: Option<Decimal>,
    is_member: bool,
    bands: &[NhsPensionBand],
    step_number: u32,
) -> NhsPensionResult {
    let annual_pensionable_pay = previous_year_pensionable_pay
        .filter(|pay| *pay > Decimal::ZERO)
        .unwrap_or_else(|| monthly_salary * Decimal::from(TAX_MONTHS_PER_YEAR));
    let pay_source = if previous_year_pensionable_pay.is_some_and(|pay| pay > Decimal::ZERO) {
        "previous_year_pensionable_pay"
    } else {
        "monthly_salary_x12"
    };

    let band = is_member
        .then(|| bands.iter().find(|band| band.contains(annual_pensionable_pay)))
        .flatten();

    let (contribution, reasoning) = match band {
        Some(band) => {
            let contribution = NhsPensionContribution {
                tier: band.tier,
                employee_rate: band.employee_rate,
                employer_rate: band.employer_rate,
                employee_contribution: monthly_salary * band.employee_rate / Decimal::ONE_HUNDRED,
                employer_contribution: monthly_salary * band.employer_rate / Decimal::ONE_HUNDRED,
            };
            let reasoning = format!(
                "Annual pensionable pay {} is tier {}: employee {}%, employer {}%",
                annual_pensionable_pay.normalize(),
                band.tier,
                band.employee_rate.normalize(),
                band.employer_rate.normalize()
            );
            (contribution, reasoning)
        }
        None if !is_member => (
            NhsPensionContribution::none(),
            "Not an NHS Pension Scheme member".to_string(),
        ),
        None => {
            warn!(
                tiers = bands.len(),
                "NHS pension tier not determined; no contribution taken"
            );
            (
                NhsPensionContribution::none(),
                format!(
                    "No tier found for annual pensionable pay {} among {} tiers",
                    annual_pensionable_pay.normalize(),
                    bands.len()
                ),
            )
        }
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "nhs_pension".to_string(),
        rule_name: "NHS Pension Contribution".to_string(),
        guidance_ref: "NHSBSA contribution tiers".to_string(),
        input: serde_json::json!({
            "monthly_salary": monthly_salary.to_string(),
            "is_member": is_member,
            "annual_pensionable_pay": annual_pensionable_pay.to_string(),
            "pay_source": pay_source
        }),
        output: serde_json::json!({
            "tier": contribution.tier,
            "employee_rate": contribution.employee_rate.normalize().to_string(),
            "employer_rate": contribution.employer_rate.normalize().to_string(),
            "employee_contribution": contribution.employee_contribution.normalize().to_string(),
            "employer_contribution": contribution.employer_contribution.normalize().to_string()
        }),
        reasoning,
    };

    NhsPensionResult {
        contribution,
        annual_pensionable_pay,
        audit_step,
    }
}
