//! Built-in 2025/26 rate tables.
//!
//! These are the fallback used whenever a provider cannot supply a table.
//! They carry no I/O. Figures are the HMRC and NHS Business Services
//! Authority rates published for 2025/26; years without their own built-in
//! figures fall back to these.

use rust_decimal::Decimal;

use super::types::{
    EmployeeNiRates, EmployerNiRates, NhsPensionBand, NiCategoryTable, NiThresholds, RateTables,
    StudentLoanThreshold, TaxBand, TaxBandTable,
};
use crate::models::{NiCategory, StudentLoanPlan, TaxRegion, TaxYear};

/// The tax year the built-in tables were published for.
pub const DEFAULT_TAX_YEAR: TaxYear = TaxYear::new(2025);

fn band(name: &str, from: i64, to: Option<i64>, rate_percent: i64) -> TaxBand {
    TaxBand {
        name: name.to_string(),
        threshold_from: Decimal::from(from),
        threshold_to: to.map(Decimal::from),
        rate: Decimal::new(rate_percent, 2),
    }
}

/// Income tax bands for a region, on annual taxable income.
pub fn default_tax_bands(region: TaxRegion) -> TaxBandTable {
    let bands = match region {
        // Welsh rates currently match the rest of the UK.
        TaxRegion::RestOfUk | TaxRegion::Wales => vec![
            band("basic", 0, Some(37_700), 20),
            band("higher", 37_700, Some(125_140), 40),
            band("additional", 125_140, None, 45),
        ],
        TaxRegion::Scotland => vec![
            band("starter", 0, Some(2_827), 19),
            band("basic", 2_827, Some(14_921), 20),
            band("intermediate", 14_921, Some(31_092), 21),
            band("higher", 31_092, Some(62_430), 42),
            band("advanced", 62_430, Some(112_570), 45),
            band("top", 112_570, None, 48),
        ],
    };

    TaxBandTable { region, bands }
}

/// Monthly NI thresholds.
pub fn default_ni_thresholds() -> NiThresholds {
    NiThresholds {
        lel: Decimal::from(542),
        pt: Decimal::from(1_048),
        st: Decimal::from(417),
        uel: Decimal::from(4_189),
    }
}

/// Per-category NI rates.
pub fn default_ni_categories() -> Vec<NiCategoryTable> {
    let main = Decimal::new(8, 2);
    let reduced = Decimal::new(185, 4);
    let deferred = Decimal::new(2, 2);
    let additional = Decimal::new(2, 2);
    let employer = Decimal::new(15, 2);

    NiCategory::ALL
        .into_iter()
        .map(|category| {
            let (pt_to_uel, above_uel) = match category {
                NiCategory::A | NiCategory::H | NiCategory::M | NiCategory::V => (main, additional),
                NiCategory::B => (reduced, additional),
                NiCategory::J | NiCategory::Z => (deferred, additional),
                NiCategory::C | NiCategory::X => (Decimal::ZERO, Decimal::ZERO),
            };
            let above_st = match category {
                NiCategory::X => Decimal::ZERO,
                _ => employer,
            };

            NiCategoryTable {
                category,
                employee: EmployeeNiRates {
                    lel_to_pt: Decimal::ZERO,
                    pt_to_uel,
                    above_uel,
                },
                employer: EmployerNiRates {
                    below_st: Decimal::ZERO,
                    above_st,
                },
            }
        })
        .collect()
}

/// NHS Pension Scheme tiers.
pub fn default_nhs_pension_bands() -> Vec<NhsPensionBand> {
    let employer_rate = Decimal::new(237, 1);
    let tiers = [
        (0, Some(13_260), 52),
        (13_260, Some(27_289), 65),
        (27_289, Some(33_248), 83),
        (33_248, Some(49_914), 98),
        (49_914, Some(63_995), 107),
        (63_995, None, 125),
    ];

    tiers
        .into_iter()
        .enumerate()
        .map(|(index, (from, to, employee_rate))| NhsPensionBand {
            tier: index as u8 + 1,
            from: Decimal::from(from),
            to: to.map(Decimal::from),
            employee_rate: Decimal::new(employee_rate, 1),
            employer_rate,
        })
        .collect()
}

/// Monthly student and postgraduate loan thresholds.
pub fn default_student_loan_thresholds() -> Vec<StudentLoanThreshold> {
    let nine_percent = Decimal::new(9, 2);
    vec![
        StudentLoanThreshold {
            plan: StudentLoanPlan::Plan1,
            monthly_threshold: Decimal::new(2_172_08, 2),
            rate: nine_percent,
        },
        StudentLoanThreshold {
            plan: StudentLoanPlan::Plan2,
            monthly_threshold: Decimal::new(2_372_50, 2),
            rate: nine_percent,
        },
        StudentLoanThreshold {
            plan: StudentLoanPlan::Plan4,
            monthly_threshold: Decimal::new(2_728_75, 2),
            rate: nine_percent,
        },
        StudentLoanThreshold {
            plan: StudentLoanPlan::Plan5,
            monthly_threshold: Decimal::new(2_083_33, 2),
            rate: nine_percent,
        },
        StudentLoanThreshold {
            plan: StudentLoanPlan::Postgraduate,
            monthly_threshold: Decimal::new(1_750_00, 2),
            rate: Decimal::new(6, 2),
        },
    ]
}

/// A complete snapshot built entirely from the built-in tables.
///
/// ```
/// use uk_payroll_engine::config::default_rate_tables;
/// use uk_payroll_engine::models::TaxYear;
///
/// let tables = default_rate_tables(TaxYear::new(2025));
/// assert_eq!(tables.ni_thresholds().uel.to_string(), "4189");
/// ```
pub fn default_rate_tables(tax_year: TaxYear) -> RateTables {
    RateTables::new(
        tax_year,
        TaxRegion::ALL.into_iter().map(default_tax_bands).collect(),
        default_ni_thresholds(),
        default_ni_categories(),
        default_nhs_pension_bands(),
        default_student_loan_thresholds(),
    )
}
