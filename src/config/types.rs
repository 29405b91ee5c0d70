//! Rate table types.
//!
//! This module contains the strongly-typed band and rate tables for one tax
//! year. They are deserialized from YAML rate files or built from the
//! hardcoded defaults, validated, and then treated as read-only.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{NiCategory, StudentLoanPlan, TaxRegion, TaxYear};

fn invalid_table(table: &str, message: impl Into<String>) -> EngineError {
    EngineError::InvalidInput {
        field: table.to_string(),
        message: message.into(),
    }
}

/// A single income tax band on annual taxable income.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBand {
    /// Band name (e.g. "basic", "higher").
    pub name: String,
    /// Lower bound of the band.
    pub threshold_from: Decimal,
    /// Upper bound of the band; `None` for the top band.
    pub threshold_to: Option<Decimal>,
    /// Rate as a fraction (0.20 for 20%).
    pub rate: Decimal,
}

/// Ordered, contiguous income tax bands for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBandTable {
    /// The region these bands apply to.
    pub region: TaxRegion,
    /// Bands from lowest to highest.
    pub bands: Vec<TaxBand>,
}

impl TaxBandTable {
    /// Checks the bands start at zero, are contiguous and increasing, and
    /// that only the last band is open-ended.
    pub fn validate(&self) -> EngineResult<()> {
        let table = "tax_bands";
        let first = self
            .bands
            .first()
            .ok_or_else(|| invalid_table(table, "no bands"))?;
        if !first.threshold_from.is_zero() {
            return Err(invalid_table(table, "first band must start at zero"));
        }

        let last_index = self.bands.len() - 1;
        for (index, band) in self.bands.iter().enumerate() {
            if band.rate.is_sign_negative() || band.rate > Decimal::ONE {
                return Err(invalid_table(table, format!("band '{}' has an invalid rate", band.name)));
            }
            match band.threshold_to {
                Some(to) if index == last_index => {
                    return Err(invalid_table(
                        table,
                        format!("last band '{}' must be open-ended, found upper bound {}", band.name, to),
                    ));
                }
                Some(to) => {
                    if to <= band.threshold_from {
                        return Err(invalid_table(table, format!("band '{}' is empty", band.name)));
                    }
                    if self.bands[index + 1].threshold_from != to {
                        return Err(invalid_table(
                            table,
                            format!("band '{}' is not contiguous with the next band", band.name),
                        ));
                    }
                }
                None if index != last_index => {
                    return Err(invalid_table(
                        table,
                        format!("band '{}' is open-ended but is not the last band", band.name),
                    ));
                }
                None => {}
            }
        }

        Ok(())
    }
}

/// Monthly NI thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NiThresholds {
    /// Lower Earnings Limit.
    pub lel: Decimal,
    /// Primary Threshold.
    pub pt: Decimal,
    /// Secondary Threshold.
    pub st: Decimal,
    /// Upper Earnings Limit.
    pub uel: Decimal,
}

impl NiThresholds {
    /// Checks `0 <= LEL < PT < UEL` and `0 <= ST < UEL`.
    pub fn validate(&self) -> EngineResult<()> {
        let table = "ni_thresholds";
        if self.lel.is_sign_negative() || self.st.is_sign_negative() {
            return Err(invalid_table(table, "thresholds must not be negative"));
        }
        if !(self.lel < self.pt && self.pt < self.uel) {
            return Err(invalid_table(table, "expected LEL < PT < UEL"));
        }
        if self.st >= self.uel {
            return Err(invalid_table(table, "expected ST < UEL"));
        }
        Ok(())
    }
}

/// Employee NI rates by band, as fractions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeNiRates {
    /// Rate between LEL and PT (zero for every current category).
    pub lel_to_pt: Decimal,
    /// Main rate between PT and UEL.
    pub pt_to_uel: Decimal,
    /// Additional rate above UEL.
    pub above_uel: Decimal,
}

/// Employer NI rates by band, as fractions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployerNiRates {
    /// Rate below the Secondary Threshold.
    pub below_st: Decimal,
    /// Rate above the Secondary Threshold.
    pub above_st: Decimal,
}

/// Rates for one NI category letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NiCategoryTable {
    /// The category letter.
    pub category: NiCategory,
    /// Employee rates.
    pub employee: EmployeeNiRates,
    /// Employer rates.
    pub employer: EmployerNiRates,
}

impl NiCategoryTable {
    /// True if any employee band carries a non-zero rate.
    pub fn charges_employee_ni(&self) -> bool {
        !self.employee.pt_to_uel.is_zero() || !self.employee.above_uel.is_zero()
    }
}

/// Checks a category list covers every [`NiCategory`] exactly once with no
/// negative rates. A partial list is rejected so the whole table falls back.
pub fn validate_ni_categories(tables: &[NiCategoryTable]) -> EngineResult<()> {
    let table = "ni_categories";
    if tables.is_empty() {
        return Err(invalid_table(table, "no categories"));
    }

    let mut seen = Vec::with_capacity(tables.len());
    for entry in tables {
        if seen.contains(&entry.category) {
            return Err(invalid_table(table, format!("category {} listed twice", entry.category)));
        }
        seen.push(entry.category);

        let rates = [
            entry.employee.lel_to_pt,
            entry.employee.pt_to_uel,
            entry.employee.above_uel,
            entry.employer.below_st,
            entry.employer.above_st,
        ];
        if rates.iter().any(|rate| rate.is_sign_negative()) {
            return Err(invalid_table(table, format!("category {} has a negative rate", entry.category)));
        }
    }
    if let Some(missing) = NiCategory::ALL.iter().find(|category| !seen.contains(category)) {
        return Err(invalid_table(table, format!("category {} missing", missing)));
    }
    Ok(())
}

/// One NHS Pension Scheme contribution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NhsPensionBand {
    /// Tier number, starting at 1.
    pub tier: u8,
    /// Lower bound of annual pensionable pay (inclusive).
    pub from: Decimal,
    /// Upper bound of annual pensionable pay (exclusive); `None` for the top tier.
    pub to: Option<Decimal>,
    /// Employee rate as a percentage.
    pub employee_rate: Decimal,
    /// Employer rate as a percentage.
    pub employer_rate: Decimal,
}

impl NhsPensionBand {
    /// True if `annual_pay` falls in `[from, to)`.
    pub fn contains(&self, annual_pay: Decimal) -> bool {
        annual_pay >= self.from && self.to.is_none_or(|to| annual_pay < to)
    }
}

/// Checks tiers are ordered, non-overlapping and only the last is open-ended.
pub fn validate_nhs_pension_bands(bands: &[NhsPensionBand]) -> EngineResult<()> {
    let table = "nhs_pension_bands";
    if bands.is_empty() {
        return Err(invalid_table(table, "no bands"));
    }

    for (index, band) in bands.iter().enumerate() {
        if band.tier == 0 {
            return Err(invalid_table(table, "tier 0 is reserved for 'not determined'"));
        }
        let is_last = index == bands.len() - 1;
        match (band.to, is_last) {
            (None, false) => {
                return Err(invalid_table(table, format!("tier {} is open-ended but not last", band.tier)));
            }
            (Some(to), _) if to <= band.from => {
                return Err(invalid_table(table, format!("tier {} is empty", band.tier)));
            }
            (Some(to), false) if bands[index + 1].from < to => {
                return Err(invalid_table(table, format!("tier {} overlaps the next tier", band.tier)));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Monthly repayment threshold and rate for one student loan plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentLoanThreshold {
    /// The plan.
    pub plan: StudentLoanPlan,
    /// Monthly earnings threshold.
    pub monthly_threshold: Decimal,
    /// Repayment rate as a fraction.
    pub rate: Decimal,
}

/// Checks the plan list covers every [`StudentLoanPlan`] exactly once with
/// no negative values. A partial list is rejected so the whole table falls
/// back.
pub fn validate_student_loan_thresholds(thresholds: &[StudentLoanThreshold]) -> EngineResult<()> {
    let table = "student_loan_thresholds";
    if thresholds.is_empty() {
        return Err(invalid_table(table, "no plans"));
    }
    for (index, entry) in thresholds.iter().enumerate() {
        if thresholds[..index].iter().any(|other| other.plan == entry.plan) {
            return Err(invalid_table(table, format!("plan {} listed twice", entry.plan.number())));
        }
        if entry.monthly_threshold.is_sign_negative() || entry.rate.is_sign_negative() {
            return Err(invalid_table(table, format!("plan {} has a negative value", entry.plan.number())));
        }
    }
    if let Some(missing) = StudentLoanPlan::ALL
        .iter()
        .find(|plan| !thresholds.iter().any(|entry| entry.plan == **plan))
    {
        return Err(invalid_table(table, format!("plan {} missing", missing.number())));
    }
    Ok(())
}

/// Identifies one of the rate tables making up a [`RateTables`] snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateTableKind {
    /// Income tax bands for a region.
    TaxBands(TaxRegion),
    /// NI thresholds.
    NiThresholds,
    /// NI category rate tables.
    NiCategories,
    /// NHS pension tiers.
    NhsPensionBands,
    /// Student loan thresholds.
    StudentLoanThresholds,
}

impl fmt::Display for RateTableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateTableKind::TaxBands(region) => write!(f, "tax_bands_{}", region.as_str()),
            RateTableKind::NiThresholds => f.write_str("ni_thresholds"),
            RateTableKind::NiCategories => f.write_str("ni_categories"),
            RateTableKind::NhsPensionBands => f.write_str("nhs_pension_bands"),
            RateTableKind::StudentLoanThresholds => f.write_str("student_loan_thresholds"),
        }
    }
}

/// Every rate table for one tax year, resolved and validated.
///
/// A snapshot is built once per tax year per payroll run and shared
/// read-only between employees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateTables {
    tax_year: TaxYear,
    tax_bands: BTreeMap<TaxRegion, TaxBandTable>,
    ni_thresholds: NiThresholds,
    ni_categories: BTreeMap<NiCategory, NiCategoryTable>,
    nhs_pension_bands: Vec<NhsPensionBand>,
    student_loans: BTreeMap<StudentLoanPlan, StudentLoanThreshold>,
    fallbacks: Vec<RateTableKind>,
}

impl RateTables {
    /// Assembles a snapshot from its component tables.
    ///
    /// Tables are expected to have been validated already; the NHS band list
    /// may be empty, in which case NHS contributions come out as tier 0.
    pub fn new(
        tax_year: TaxYear,
        tax_bands: Vec<TaxBandTable>,
        ni_thresholds: NiThresholds,
        ni_categories: Vec<NiCategoryTable>,
        nhs_pension_bands: Vec<NhsPensionBand>,
        student_loans: Vec<StudentLoanThreshold>,
    ) -> Self {
        let mut nhs_pension_bands = nhs_pension_bands;
        nhs_pension_bands.sort_by(|a, b| a.from.cmp(&b.from));

        Self {
            tax_year,
            tax_bands: tax_bands
                .into_iter()
                .map(|table| (table.region, table))
                .collect(),
            ni_thresholds,
            ni_categories: ni_categories
                .into_iter()
                .map(|table| (table.category, table))
                .collect(),
            nhs_pension_bands,
            student_loans: student_loans
                .into_iter()
                .map(|threshold| (threshold.plan, threshold))
                .collect(),
            fallbacks: Vec::new(),
        }
    }

    /// Records which tables came from the built-in fallback.
    pub fn with_fallbacks(mut self, fallbacks: Vec<RateTableKind>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    /// The tax year these tables apply to.
    pub fn tax_year(&self) -> TaxYear {
        self.tax_year
    }

    /// Tax bands for a region.
    pub fn tax_bands_for(&self, region: TaxRegion) -> EngineResult<&TaxBandTable> {
        self.tax_bands
            .get(&region)
            .ok_or(EngineError::UnsupportedTaxRegion { region })
    }

    /// Monthly NI thresholds.
    pub fn ni_thresholds(&self) -> &NiThresholds {
        &self.ni_thresholds
    }

    /// Rates for an NI category; missing categories are an error.
    pub fn ni_category(&self, category: NiCategory) -> EngineResult<&NiCategoryTable> {
        self.ni_categories
            .get(&category)
            .ok_or_else(|| EngineError::InvalidNiCategory {
                category: category.to_string(),
            })
    }

    /// NHS pension tiers, ordered by lower bound.
    pub fn nhs_pension_bands(&self) -> &[NhsPensionBand] {
        &self.nhs_pension_bands
    }

    /// Threshold for a student loan plan.
    pub fn student_loan(&self, plan: StudentLoanPlan) -> Option<&StudentLoanThreshold> {
        self.student_loans.get(&plan)
    }

    /// Tables that came from the built-in fallback.
    pub fn fallback_tables(&self) -> &[RateTableKind] {
        &self.fallbacks
    }
}
