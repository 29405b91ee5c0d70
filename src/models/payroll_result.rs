//! Payroll result models.
//!
//! A [`PayrollResult`] is the immutable snapshot produced by one call to
//! [`crate::calculation::calculate_monthly_payroll`]. Every monetary field
//! has been rounded exactly once, at assembly; taxable pay is a whole number
//! of pounds.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AuditTrace, EmployeeIdentity, NiCategory, StudentLoanPlan, TaxBasis, TaxYear};
use crate::config::RateTableKind;

/// Earnings split across the statutory NI bands for one period.
///
/// `at_lel + lel_to_pt + pt_to_uel + above_uel` always equals gross pay.
/// `above_st` overlaps the other bands and is reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NiEarningsBands {
    /// Earnings up to and including the Lower Earnings Limit.
    pub at_lel: Decimal,
    /// Earnings between the LEL and the Primary Threshold.
    pub lel_to_pt: Decimal,
    /// Earnings between the Primary Threshold and the Upper Earnings Limit.
    pub pt_to_uel: Decimal,
    /// Earnings above the Upper Earnings Limit.
    pub above_uel: Decimal,
    /// Earnings above the Secondary Threshold.
    pub above_st: Decimal,
}

impl NiEarningsBands {
    /// Sum of the four non-overlapping bands.
    pub fn total(&self) -> Decimal {
        self.at_lel + self.lel_to_pt + self.pt_to_uel + self.above_uel
    }

    /// Applies `f` to every band.
    pub fn map(&self, f: impl Fn(Decimal) -> Decimal) -> Self {
        Self {
            at_lel: f(self.at_lel),
            lel_to_pt: f(self.lel_to_pt),
            pt_to_uel: f(self.pt_to_uel),
            above_uel: f(self.above_uel),
            above_st: f(self.above_st),
        }
    }
}

/// NHS Pension Scheme contribution for one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NhsPensionContribution {
    /// Contribution tier; 0 means not a member or not determined.
    pub tier: u8,
    /// Employee rate as a percentage.
    pub employee_rate: Decimal,
    /// Employer rate as a percentage.
    pub employer_rate: Decimal,
    /// Employee contribution for the period.
    pub employee_contribution: Decimal,
    /// Employer contribution for the period.
    pub employer_contribution: Decimal,
}

impl NhsPensionContribution {
    /// No contribution, tier 0.
    pub fn none() -> Self {
        Self::default()
    }

    /// True when a tier was determined.
    pub fn is_determined(&self) -> bool {
        self.tier > 0
    }
}

/// Aggregate figures for the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PayrollTotals {
    /// Sum of additional earnings.
    pub additional_earnings: Decimal,
    /// Sum of additional deductions.
    pub additional_deductions: Decimal,
    /// Sum of additional allowances.
    pub additional_allowances: Decimal,
    /// Every deduction taken from gross pay.
    pub total_deductions: Decimal,
    /// Gross pay plus employer NI and employer NHS pension.
    pub employer_cost: Decimal,
}

/// The complete result of a monthly payroll calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollResult {
    /// Identity fields from the input, unchanged.
    pub identity: EmployeeIdentity,
    /// The tax year calculated.
    pub tax_year: TaxYear,
    /// The PAYE tax month calculated.
    pub tax_period: u8,
    /// The basis income tax was calculated on.
    pub tax_basis: TaxBasis,
    /// The normalized tax code.
    pub tax_code: String,
    /// The NI category applied.
    pub ni_category: NiCategory,
    /// Gross pay for the period.
    pub gross_pay: Decimal,
    /// Free pay to date (negative for K codes).
    pub free_pay: Decimal,
    /// Taxable pay to date, in whole pounds.
    pub taxable_pay: Decimal,
    /// Tax due to date.
    pub tax_due_ytd: Decimal,
    /// Income tax for the period; negative is a refund.
    pub income_tax: Decimal,
    /// Employee NI contribution.
    pub employee_ni: Decimal,
    /// Employer NI contribution.
    pub employer_ni: Decimal,
    /// Statutory NI earnings bands.
    pub ni_bands: NiEarningsBands,
    /// Student loan plan applied, if any.
    pub student_loan_plan: Option<StudentLoanPlan>,
    /// Student loan repayment.
    pub student_loan: Decimal,
    /// Workplace pension contribution.
    pub pension_contribution: Decimal,
    /// NHS pension contribution.
    pub nhs_pension: NhsPensionContribution,
    /// Aggregate figures.
    pub totals: PayrollTotals,
    /// Net pay for the period.
    pub net_pay: Decimal,
    /// Rate tables that came from the built-in fallback.
    pub fallback_tables: Vec<RateTableKind>,
    /// Record of every calculation step.
    pub audit_trace: AuditTrace,
}
