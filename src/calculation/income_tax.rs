//! Income tax calculation.
//!
//! This module implements PAYE income tax on the cumulative and
//! Week1/Month1 bases. Taxable pay is floored to whole pounds where it is
//! computed; everything else is returned at full precision and rounded at
//! assembly.

use rust_decimal::Decimal;

use super::rounding::floor_to_pound;
use super::tax_code::free_pay_to_date;
use crate::config::TaxBandTable;
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, TAX_MONTHS_PER_YEAR, TaxBasis, TaxCode, TaxCodeKind};

/// Tax charged in one band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandCharge {
    /// The band's name.
    pub name: String,
    /// Taxable pay falling in the band.
    pub taxable: Decimal,
    /// The band's rate.
    pub rate: Decimal,
    /// Tax charged in the band.
    pub tax: Decimal,
}

/// The result of applying progressive bands to taxable pay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressiveTax {
    /// Total tax across all bands.
    pub total: Decimal,
    /// Per-band breakdown, lowest band first; bands with no pay are omitted.
    pub charges: Vec<BandCharge>,
}

/// Applies a band table to taxable pay for the first `period` tax months.
///
/// Band thresholds are annual. Each limit to date is pro-rated by
/// `period / 12` and rounded up to the whole pound, as in the HMRC tax
/// tables, so a period of 12 applies the full annual bands.
///
/// # Examples
///
/// ```
/// use uk_payroll_engine::calculation::apply_progressive_bands;
/// use uk_payroll_engine::config::default_tax_bands;
/// use uk_payroll_engine::models::TaxRegion;
/// use rust_decimal::Decimal;
///
/// let bands = default_tax_bands(TaxRegion::RestOfUk);
/// let tax = apply_progressive_bands(Decimal::from(50_000), &bands, 12);
/// // 37,700 at 20% + 12,300 at 40%
/// assert_eq!(tax.total, Decimal::from(12_460));
/// ```
pub fn apply_progressive_bands(
    taxable_pay: Decimal,
    table: &TaxBandTable,
    period: u8,
) -> ProgressiveTax {
    let periods = Decimal::from(period);
    let months = Decimal::from(TAX_MONTHS_PER_YEAR);
    let pro_rate = |threshold: Decimal| (threshold * periods / months).ceil();

    let mut total = Decimal::ZERO;
    let mut charges = Vec::new();

    for band in &table.bands {
        let from = pro_rate(band.threshold_from);
        if taxable_pay <= from {
            break;
        }
        let upper = match band.threshold_to {
            Some(to) => taxable_pay.min(pro_rate(to)),
            None => taxable_pay,
        };
        let in_band = upper - from;
        let tax = in_band * band.rate;
        total += tax;
        charges.push(BandCharge {
            name: band.name.clone(),
            taxable: in_band,
            rate: band.rate,
            tax,
        });
    }

    ProgressiveTax { total, charges }
}

/// Inputs to [`calculate_income_tax`].
#[derive(Debug, Clone, Copy)]
pub struct IncomeTaxInput<'a> {
    /// The parsed tax code.
    pub tax_code: &'a TaxCode,
    /// Bands for the code's region.
    pub bands: &'a TaxBandTable,
    /// The basis to calculate on.
    pub basis: TaxBasis,
    /// PAYE tax month (1-12).
    pub period: u8,
    /// Taxable gross pay for this period.
    pub gross_pay: Decimal,
    /// Taxable gross pay for earlier periods of the year.
    pub previous_gross_pay_ytd: Decimal,
    /// Tax already deducted in earlier periods of the year.
    pub tax_paid_ytd: Decimal,
}

/// The result of an income tax calculation, including the audit step.
#[derive(Debug, Clone)]
pub struct IncomeTaxResult {
    /// The basis the tax was calculated on.
    pub basis: TaxBasis,
    /// The period the figures are to date for (always 1 when non-cumulative).
    pub effective_period: u8,
    /// Gross pay to date.
    pub gross_pay_to_date: Decimal,
    /// Free pay to date; negative for K codes.
    pub free_pay: Decimal,
    /// Taxable pay to date, in whole pounds.
    pub taxable_pay: Decimal,
    /// Tax due to date.
    pub tax_due_to_date: Decimal,
    /// Tax for this period; negative is a refund.
    pub tax_this_period: Decimal,
    /// Per-band breakdown of the tax due.
    pub charges: Vec<BandCharge>,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates income tax for one period.
///
/// On the cumulative basis, free pay and band thresholds are taken to date
/// for `period` months, gross pay to date is the earlier periods plus this
/// one, and the tax for this period is the tax due to date less tax already
/// paid. On the non-cumulative basis the period is always treated as month
/// 1 and no year-to-date figures are carried.
///
/// `BR`, `D0` and `D1` tax all pay at one rate with no allowance. `NT`
/// deducts nothing and refunds any tax paid to date on the cumulative
/// basis.
///
/// # Returns
///
/// Returns an `IncomeTaxResult`, or an `InvalidInput` error if the period is
/// outside 1-12.
///
/// # Guidance Reference
///
/// HMRC Tax Tables B to D (cumulative PAYE) and CWG2 chapter 3 (Week1/Month1).
///
/// # Examples
///
/// ```
/// use uk_payroll_engine::calculation::{IncomeTaxInput, calculate_income_tax, parse_tax_code};
/// use uk_payroll_engine::config::default_tax_bands;
/// use uk_payroll_engine::models::{TaxBasis, TaxRegion};
/// use rust_decimal::Decimal;
///
/// let code = parse_tax_code("1257L").unwrap();
/// let bands = default_tax_bands(TaxRegion::RestOfUk);
/// let input = IncomeTaxInput {
///     tax_code: &code,
///     bands: &bands,
///     basis: TaxBasis::Cumulative,
///     period: 1,
///     gross_pay: Decimal::from(4_000),
///     previous_gross_pay_ytd: Decimal::ZERO,
///     tax_paid_ytd: Decimal::ZERO,
/// };
///
/// let result = calculate_income_tax(&input, 1).unwrap();
/// assert_eq!(result.taxable_pay, Decimal::from(2_951));
/// assert_eq!(result.tax_this_period, Decimal::new(59020, 2));
/// ```
pub fn calculate_income_tax(input: &IncomeTaxInput<'_>, step_number: u32) -> EngineResult<IncomeTaxResult> {
    if !(1..=TAX_MONTHS_PER_YEAR).contains(&input.period) {
        return Err(EngineError::InvalidInput {
            field: "tax_period".to_string(),
            message: format!("must be between 1 and {}, got {}", TAX_MONTHS_PER_YEAR, input.period),
        });
    }

    let cumulative = input.basis == TaxBasis::Cumulative;
    let (effective_period, gross_pay_to_date, tax_paid_to_date) = if cumulative {
        (
            input.period,
            input.previous_gross_pay_ytd + input.gross_pay,
            input.tax_paid_ytd,
        )
    } else {
        (1, input.gross_pay, Decimal::ZERO)
    };

    let code = input.tax_code;
    let (free_pay, taxable_pay, progressive) = match code.kind {
        TaxCodeKind::NoTax => (Decimal::ZERO, Decimal::ZERO, ProgressiveTax {
            total: Decimal::ZERO,
            charges: vec![],
        }),
        TaxCodeKind::FlatRate(flat) => {
            let taxable = floor_to_pound(gross_pay_to_date.max(Decimal::ZERO));
            let tax = taxable * flat.rate();
            let charge = BandCharge {
                name: flat.code().to_string(),
                taxable,
                rate: flat.rate(),
                tax,
            };
            (Decimal::ZERO, taxable, ProgressiveTax {
                total: tax,
                charges: vec![charge],
            })
        }
        TaxCodeKind::Standard | TaxCodeKind::KCode | TaxCodeKind::EmergencyZeroAllowance => {
            let free_pay = free_pay_to_date(code, effective_period);
            let taxable = floor_to_pound(gross_pay_to_date - free_pay).max(Decimal::ZERO);
            let progressive = apply_progressive_bands(taxable, input.bands, effective_period);
            (free_pay, taxable, progressive)
        }
    };

    let tax_due_to_date = progressive.total;
    let tax_this_period = tax_due_to_date - tax_paid_to_date;

    let basis_str = if cumulative { "cumulative" } else { "non_cumulative" };
    let reasoning = match code.kind {
        TaxCodeKind::NoTax if cumulative => format!(
            "NT code: no tax due, refunding {} paid to date",
            tax_paid_to_date.normalize()
        ),
        TaxCodeKind::NoTax => "NT code: no tax due".to_string(),
        TaxCodeKind::FlatRate(flat) => format!(
            "{} code: {} x {} = {}",
            flat.code(),
            taxable_pay,
            flat.rate().normalize(),
            tax_due_to_date.normalize()
        ),
        _ => format!(
            "Month {} {}: floor({} - {}) = {} taxable, {} due, {} paid, {} this period",
            effective_period,
            basis_str,
            gross_pay_to_date.normalize(),
            free_pay.round_dp(2).normalize(),
            taxable_pay,
            tax_due_to_date.normalize(),
            tax_paid_to_date.normalize(),
            tax_this_period.normalize()
        ),
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "income_tax".to_string(),
        rule_name: "Income Tax".to_string(),
        guidance_ref: (if cumulative { "Tax Tables B-D" } else { "CWG2 3.4" }).to_string(),
        input: serde_json::json!({
            "tax_code": code.raw,
            "region": code.region.as_str(),
            "basis": basis_str,
            "period": input.period,
            "gross_pay": input.gross_pay.to_string(),
            "previous_gross_pay_ytd": input.previous_gross_pay_ytd.to_string(),
            "tax_paid_ytd": input.tax_paid_ytd.to_string()
        }),
        output: serde_json::json!({
            "effective_period": effective_period,
            "free_pay": free_pay.normalize().to_string(),
            "taxable_pay": taxable_pay.to_string(),
            "tax_due_to_date": tax_due_to_date.normalize().to_string(),
            "tax_this_period": tax_this_period.normalize().to_string(),
            "bands": progressive.charges.iter().map(|charge| serde_json::json!({
                "name": charge.name,
                "taxable": charge.taxable.normalize().to_string(),
                "rate": charge.rate.normalize().to_string(),
                "tax": charge.tax.normalize().to_string()
            })).collect::<Vec<_>>()
        }),
        reasoning,
    };

    Ok(IncomeTaxResult {
        basis: input.basis,
        effective_period,
        gross_pay_to_date,
        free_pay,
        taxable_pay,
        tax_due_to_date,
        tax_this_period,
        charges: progressive.charges,
        audit_step,
    })
}
