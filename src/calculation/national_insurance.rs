//! National Insurance calculation.
//!
//! This module allocates monthly gross pay across the statutory NI earnings
//! bands and applies a category's employee and employer rates to them.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::{NiCategoryTable, NiThresholds, default_ni_categories, default_ni_thresholds};
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, NiCategory, NiEarningsBands};

/// Band earnings at or below this are treated as nil by the integrity check.
const INTEGRITY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Splits gross pay across the NI earnings bands.
///
/// The four non-overlapping bands always sum to `gross_pay`; earnings above
/// the Secondary Threshold are reported alongside them.
///
/// # Returns
///
/// Returns the bands, or an error if:
/// - `gross_pay` is negative (`InvalidInput`)
/// - The bands fail to sum to gross pay (`CalculationIntegrityViolation`)
///
/// # Examples
///
/// ```
/// use uk_payroll_engine::calculation::allocate_earnings_bands;
/// use uk_payroll_engine::config::default_ni_thresholds;
/// use rust_decimal::Decimal;
///
/// let bands = allocate_earnings_bands(Decimal::new(104808, 2), &default_ni_thresholds()).unwrap();
/// assert_eq!(bands.at_lel, Decimal::from(542));
/// assert_eq!(bands.lel_to_pt, Decimal::from(506));
/// assert_eq!(bands.pt_to_uel, Decimal::new(8, 2));
/// assert_eq!(bands.total(), Decimal::new(104808, 2));
/// ```
pub fn allocate_earnings_bands(
    gross_pay: Decimal,
    thresholds: &NiThresholds,
) -> EngineResult<NiEarningsBands> {
    if gross_pay.is_sign_negative() && !gross_pay.is_zero() {
        return Err(EngineError::InvalidInput {
            field: "gross_pay".to_string(),
            message: "NI earnings cannot be negative".to_string(),
        });
    }

    let clamp = |value: Decimal, max: Decimal| value.max(Decimal::ZERO).min(max);
    let bands = NiEarningsBands {
        at_lel: gross_pay.min(thresholds.lel),
        lel_to_pt: clamp(gross_pay - thresholds.lel, thresholds.pt - thresholds.lel),
        pt_to_uel: clamp(gross_pay - thresholds.pt, thresholds.uel - thresholds.pt),
        above_uel: (gross_pay - thresholds.uel).max(Decimal::ZERO),
        above_st: (gross_pay - thresholds.st).max(Decimal::ZERO),
    };

    if bands.total() != gross_pay {
        return Err(EngineError::CalculationIntegrityViolation {
            check: "ni_band_sum".to_string(),
            message: "NI earnings bands do not sum to gross pay".to_string(),
        });
    }

    Ok(bands)
}

/// The result of a National Insurance calculation, including the audit step.
#[derive(Debug, Clone)]
pub struct NationalInsuranceResult {
    /// The category applied.
    pub category: NiCategory,
    /// Earnings by band.
    pub bands: NiEarningsBands,
    /// Employee contribution.
    pub employee_ni: Decimal,
    /// Employer contribution.
    pub employer_ni: Decimal,
    /// True if the supplied rates produced nil NI on chargeable earnings and
    /// the built-in rates were used instead.
    pub recalculated_with_fallback: bool,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates employee and employer NI for one month.
///
/// Employee NI charges each band at the category's employee rate. Employer
/// NI charges earnings above the Secondary Threshold, except for categories
/// M, H, V and Z where only earnings above the UEL are charged.
///
/// If the supplied rates produce no employee NI although earnings above the
/// Primary Threshold are more than a penny, and the built-in table for the
/// category does charge NI, the calculation is repeated with the built-in
/// thresholds and rates.
///
/// # Returns
///
/// Returns a `NationalInsuranceResult`, or an error if:
/// - `rates` is not the table for `category` (`InvalidNiCategory`)
/// - Gross pay is negative (`InvalidInput`)
/// - Employee NI is still nil after recalculating with the built-in rates
///   (`CalculationIntegrityViolation`)
///
/// # Guidance Reference
///
/// HMRC CA38 (NI tables) and CWG2 chapter 2.
///
/// # Examples
///
/// ```
/// use uk_payroll_engine::calculation::calculate_national_insurance;
/// use uk_payroll_engine::config::default_rate_tables;
/// use uk_payroll_engine::models::{NiCategory, TaxYear};
/// use rust_decimal::Decimal;
///
/// let tables = default_rate_tables(TaxYear::new(2025));
/// let result = calculate_national_insurance(
///     Decimal::new(418904, 2),
///     NiCategory::A,
///     tables.ni_thresholds(),
///     tables.ni_category(NiCategory::A).unwrap(),
///     1,
/// )
/// .unwrap();
/// assert_eq!(result.employee_ni.round_dp(2), Decimal::new(25128, 2));
/// assert_eq!(result.employer_ni.round_dp(2), Decimal::new(56581, 2));
/// ```
pub fn calculate_national_insurance(
    gross_pay: Decimal,
    category: NiCategory,
    thresholds: &NiThresholds,
    rates: &NiCategoryTable,
    step_number: u32,
) -> EngineResult<NationalInsuranceResult> {
    if rates.category != category {
        return Err(EngineError::InvalidNiCategory {
            category: category.to_string(),
        });
    }

    let mut bands = allocate_earnings_bands(gross_pay, thresholds)?;
    let (mut employee_ni, mut employer_ni) = contributions(category, &bands, gross_pay, thresholds, rates);
    let mut recalculated_with_fallback = false;

    let chargeable = bands.pt_to_uel > INTEGRITY_TOLERANCE || bands.above_uel > INTEGRITY_TOLERANCE;
    if employee_ni.is_zero() && chargeable {
        let fallback_rates = default_ni_categories()
            .into_iter()
            .find(|table| table.category == category)
            .filter(NiCategoryTable::charges_employee_ni);

        if let Some(fallback_rates) = fallback_rates {
            warn!(
                category = %category,
                "Nil employee NI on chargeable earnings; recalculating with built-in rates"
            );
            let fallback_thresholds = default_ni_thresholds();
            bands = allocate_earnings_bands(gross_pay, &fallback_thresholds)?;
            (employee_ni, employer_ni) =
                contributions(category, &bands, gross_pay, &fallback_thresholds, &fallback_rates);
            recalculated_with_fallback = true;

            if employee_ni.is_zero() {
                return Err(EngineError::CalculationIntegrityViolation {
                    check: "employee_ni_nil".to_string(),
                    message: format!(
                        "category {} charged no employee NI on earnings above the primary threshold",
                        category
                    ),
                });
            }
        }
    }

    debug!(
        category = %category,
        recalculated = recalculated_with_fallback,
        "National Insurance calculated"
    );

    let mut reasoning = format!(
        "Category {}: employee {} on bands PT-UEL {} / above UEL {}, employer {} on {}",
        category,
        employee_ni.normalize(),
        bands.pt_to_uel.normalize(),
        bands.above_uel.normalize(),
        employer_ni.normalize(),
        if category.employer_relief_to_uel() {
            "earnings above UEL only"
        } else {
            "earnings above ST"
        }
    );
    if recalculated_with_fallback {
        reasoning.push_str(" (recalculated with built-in rates)");
    }

    let audit_step = AuditStep {
        step_number,
        rule_id: "national_insurance".to_string(),
        rule_name: "National Insurance".to_string(),
        guidance_ref: "CA38".to_string(),
        input: serde_json::json!({
            "gross_pay": gross_pay.to_string(),
            "category": category.to_string(),
            "thresholds": {
                "lel": thresholds.lel.to_string(),
                "pt": thresholds.pt.to_string(),
                "st": thresholds.st.to_string(),
                "uel": thresholds.uel.to_string()
            }
        }),
        output: serde_json::json!({
            "bands": {
                "at_lel": bands.at_lel.normalize().to_string(),
                "lel_to_pt": bands.lel_to_pt.normalize().to_string(),
                "pt_to_uel": bands.pt_to_uel.normalize().to_string(),
                "above_uel": bands.above_uel.normalize().to_string(),
                "above_st": bands.above_st.normalize().to_string()
            },
            "employee_ni": employee_ni.normalize().to_string(),
            "employer_ni": employer_ni.normalize().to_string(),
            "recalculated_with_fallback": recalculated_with_fallback
        }),
        reasoning,
    };

    Ok(NationalInsuranceResult {
        category,
        bands,
        employee_ni,
        employer_ni,
        recalculated_with_fallback,
        audit_step,
    })
}

/// Employee and employer NI for allocated bands.
fn contributions(
    category: NiCategory,
    bands: &NiEarningsBands,
    gross_pay: Decimal,
    thresholds: &NiThresholds,
    rates: &NiCategoryTable,
) -> (Decimal, Decimal) {
    let employee = bands.lel_to_pt * rates.employee.lel_to_pt
        + bands.pt_to_uel * rates.employee.pt_to_uel
        + bands.above_uel * rates.employee.above_uel;

    let employer = if category.employer_relief_to_uel() {
        bands.above_uel * rates.employer.above_st
    } else {
        gross_pay.min(thresholds.st) * rates.employer.below_st
            + bands.above_st * rates.employer.above_st
    };

    (employee, employer)
}
