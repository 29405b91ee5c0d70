//! Integration tests for the UK Payroll Engine.
//!
//! This test suite covers the public calculation surface end to end:
//! - Cumulative and Week1/Month1 income tax
//! - NI thresholds and category carve-outs
//! - K codes, NT and flat-rate codes
//! - Student loan and NHS pension deductions
//! - Error wrapping and sanitization
//! - Rate table resolution from YAML and from the built-in fallback

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use uk_payroll_engine::calculation::{PayrollRun, calculate_monthly_payroll, parse_tax_code};
use uk_payroll_engine::config::{DefaultRateSource, RateTables, YamlRateSource, default_rate_tables};
use uk_payroll_engine::error::{CalculationPhase, EngineError};
use uk_payroll_engine::models::{
    NiCategory, PayItem, PayrollDetails, StudentLoanPlan, TaxBasis, TaxYear,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn tables() -> RateTables {
    default_rate_tables(TaxYear::new(2025))
}

fn employee(salary: &str, tax_code: &str) -> PayrollDetails {
    PayrollDetails::new("emp_001", decimal(salary), tax_code)
}

fn with_category(mut details: PayrollDetails, category: &str) -> PayrollDetails {
    details.ni_category = category.to_string();
    details
}

fn assert_at_most_two_dp(name: &str, amount: Decimal) {
    assert!(
        amount.normalize().scale() <= 2,
        "{} has more than 2 decimal places: {}",
        name,
        amount
    );
}

// =============================================================================
// Income tax
// =============================================================================

#[test]
fn test_month_one_cumulative_standard_code() {
    let result = calculate_monthly_payroll(&employee("4000", "1257L"), &tables()).unwrap();

    assert_eq!(result.tax_period, 1);
    assert_eq!(result.tax_basis, TaxBasis::Cumulative);
    assert_eq!(result.free_pay, decimal("1048.25"));
    assert_eq!(result.taxable_pay, decimal("2951"));
    assert_eq!(result.income_tax, decimal("590.20"));
}

#[test]
fn test_month_twelve_cumulative_standard_code() {
    let mut details = employee("4000", "1257L");
    details.tax_period = Some(12);
    details.gross_pay_ytd = decimal("44000");
    details.tax_paid_ytd = decimal("6492.20");

    let result = calculate_monthly_payroll(&details, &tables()).unwrap();

    assert_eq!(result.taxable_pay, decimal("35420"));
    assert_eq!(result.tax_due_ytd, decimal("7084.00"));
    assert_eq!(result.income_tax, decimal("591.80"));
}

#[test]
fn test_higher_rate_cumulative() {
    let mut details = employee("8000", "1257L");
    details.tax_period = Some(6);
    details.gross_pay_ytd = decimal("40000");
    details.tax_paid_ytd = decimal("11000");

    let result = calculate_monthly_payroll(&details, &tables()).unwrap();

    // 48,000 - 6,289.52 free pay = 41,710 taxable; bands pro-rated to 18,850
    // at 20% and the rest at 40%
    assert_eq!(result.taxable_pay, decimal("41710"));
    assert_eq!(result.tax_due_ytd, decimal("12914.00"));
    assert_eq!(result.income_tax, decimal("1914.00"));
}

#[test]
fn test_month_one_higher_rate_uses_whole_pound_band_limit() {
    let result = calculate_monthly_payroll(&employee("5048.25", "1257L"), &tables()).unwrap();

    // Basic band to date is 3,142, not 3,141.67
    assert_eq!(result.taxable_pay, decimal("3999"));
    assert_eq!(result.income_tax, decimal("971.20"));
}

#[test]
fn test_k_code_with_zero_pay_is_still_taxed() {
    let result = calculate_monthly_payroll(&employee("0", "K497"), &tables()).unwrap();

    assert_eq!(result.free_pay, decimal("-414.92"));
    assert!(result.taxable_pay > Decimal::ZERO);
    assert_eq!(result.taxable_pay, decimal("414"));
    assert_eq!(result.income_tax, decimal("82.80"));
    assert_eq!(result.net_pay, decimal("-82.80"));
}

#[test]
fn test_emergency_code_ignores_year_to_date() {
    let mut details = employee("4000", "1257L M1");
    details.tax_period = Some(9);
    details.gross_pay_ytd = decimal("32000");
    details.tax_paid_ytd = decimal("100");

    let result = calculate_monthly_payroll(&details, &tables()).unwrap();

    assert_eq!(result.tax_code, "1257LM1");
    assert_eq!(result.tax_basis, TaxBasis::NonCumulative);
    assert_eq!(result.income_tax, decimal("590.20"));
}

#[test]
fn test_flat_rate_codes() {
    let cases = [("BR", "500.00"), ("D0", "1000.00"), ("D1", "1125.00")];
    for (code, expected) in cases {
        let result = calculate_monthly_payroll(&employee("2500", code), &tables()).unwrap();
        assert_eq!(result.income_tax, decimal(expected), "code {}", code);
        assert_eq!(result.free_pay, Decimal::ZERO, "code {}", code);
    }
}

#[test]
fn test_zero_t_code_has_no_allowance() {
    let result = calculate_monthly_payroll(&employee("2500", "0T"), &tables()).unwrap();
    assert_eq!(result.taxable_pay, decimal("2500"));
    assert_eq!(result.income_tax, decimal("500.00"));
}

#[test]
fn test_nt_code_refunds_tax_paid() {
    let mut details = employee("6000", "NT");
    details.tax_period = Some(4);
    details.gross_pay_ytd = decimal("18000");
    details.tax_paid_ytd = decimal("1234.56");

    let result = calculate_monthly_payroll(&details, &tables()).unwrap();
    assert_eq!(result.income_tax, decimal("-1234.56"));
}

#[test]
fn test_scottish_and_welsh_codes_are_gated() {
    for code in ["S1257L", "C1257L"] {
        let err = calculate_monthly_payroll(&employee("3000", code), &tables()).unwrap_err();
        assert_eq!(err.phase(), Some(CalculationPhase::IncomeTax));
        assert!(
            matches!(err.root_cause(), EngineError::UnsupportedTaxRegion { .. }),
            "code {}: {:?}",
            code,
            err
        );
    }
}

// =============================================================================
// National Insurance
// =============================================================================

#[test]
fn test_one_penny_above_primary_threshold() {
    let result = calculate_monthly_payroll(&employee("1048.08", "1257L"), &tables()).unwrap();
    assert_eq!(result.employee_ni, decimal("0.01"));
    assert_eq!(result.ni_bands.pt_to_uel, decimal("0.08"));
}

#[test]
fn test_just_above_upper_earnings_limit() {
    let result = calculate_monthly_payroll(&employee("4189.04", "1257L"), &tables()).unwrap();
    assert_eq!(result.employee_ni, decimal("251.28"));
    assert_eq!(result.employer_ni, decimal("565.81"));
    assert_eq!(result.ni_bands.above_uel, decimal("0.04"));
}

#[test]
fn test_category_c_pays_no_employee_ni() {
    let category_a = calculate_monthly_payroll(&employee("3500", "1257L"), &tables()).unwrap();
    let category_c =
        calculate_monthly_payroll(&with_category(employee("3500", "1257L"), "C"), &tables())
            .unwrap();

    assert_eq!(category_c.ni_category, NiCategory::C);
    assert_eq!(category_c.employee_ni, Decimal::ZERO);
    assert_eq!(category_c.employer_ni, category_a.employer_ni);
    assert!(category_c.net_pay > category_a.net_pay);
}

#[test]
fn test_under_21_employer_relief_to_uel() {
    for category in ["M", "H", "V", "Z"] {
        let below = calculate_monthly_payroll(
            &with_category(employee("4189", "1257L"), category),
            &tables(),
        )
        .unwrap();
        assert_eq!(below.employer_ni, Decimal::ZERO, "category {}", category);

        let above = calculate_monthly_payroll(
            &with_category(employee("5189", "1257L"), category),
            &tables(),
        )
        .unwrap();
        assert_eq!(above.employer_ni, decimal("150.00"), "category {}", category);
    }
}

#[test]
fn test_unknown_category_is_not_defaulted() {
    for category in ["Q", "", "AA"] {
        let err = calculate_monthly_payroll(
            &with_category(employee("3000", "1257L"), category),
            &tables(),
        )
        .unwrap_err();
        assert_eq!(err.phase(), Some(CalculationPhase::NationalInsurance));
        assert!(matches!(
            err.root_cause(),
            EngineError::InvalidNiCategory { .. }
        ));
    }
}

// =============================================================================
// Deductions and assembly
// =============================================================================

#[test]
fn test_student_loan_below_threshold_is_zero() {
    let mut details = employee("2000", "1257L");
    details.student_loan_plan = Some(StudentLoanPlan::Plan2);

    let result = calculate_monthly_payroll(&details, &tables()).unwrap();
    assert_eq!(result.student_loan, Decimal::ZERO);
    assert_eq!(result.student_loan_plan, Some(StudentLoanPlan::Plan2));
}

#[test]
fn test_student_loan_ignores_additional_earnings() {
    let mut details = employee("2000", "1257L");
    details.student_loan_plan = Some(StudentLoanPlan::Plan1);
    details.additional_earnings = vec![PayItem::new("Bonus", decimal("5000"))];

    let result = calculate_monthly_payroll(&details, &tables()).unwrap();
    assert_eq!(result.gross_pay, decimal("7000"));
    assert_eq!(result.student_loan, Decimal::ZERO);
}

#[test]
fn test_nhs_member_payslip() {
    let mut details = employee("2800", "1257L");
    details.is_nhs_pension_member = true;
    details.previous_year_pensionable_pay = Some(decimal("50000"));

    let result = calculate_monthly_payroll(&details, &tables()).unwrap();

    assert_eq!(result.nhs_pension.tier, 5);
    assert_eq!(result.nhs_pension.employee_contribution, decimal("299.60"));
    assert_eq!(result.nhs_pension.employer_contribution, decimal("663.60"));
    // 2,800 - (350.20 + 140.16 + 299.60)
    assert_eq!(result.net_pay, decimal("2010.04"));
}

#[test]
fn test_net_pay_reconciles_with_rounded_lines() {
    let mut details = employee("2000.05", "1257L");
    details.pension_percentage = decimal("2.5");
    details.student_loan_plan = Some(StudentLoanPlan::Postgraduate);

    let result = calculate_monthly_payroll(&details, &tables()).unwrap();

    assert_eq!(result.income_tax, decimal("190.20"));
    assert_eq!(result.employee_ni, decimal("76.16"));
    assert_eq!(result.student_loan, decimal("15.00"));
    assert_eq!(result.pension_contribution, decimal("50.00"));
    // 331.36825 before rounding, but the payslip shows the rounded lines
    assert_eq!(result.totals.total_deductions, decimal("331.36"));
    assert_eq!(result.net_pay, decimal("1668.69"));
}

#[test]
fn test_identity_is_passed_through() {
    let mut details = employee("2500", "1257L");
    details.identity.name = "A. Nurse".to_string();
    details.identity.ni_number = Some("QQ123456C".to_string());

    let result = calculate_monthly_payroll(&details, &tables()).unwrap();
    assert_eq!(result.identity, details.identity);
}

#[test]
fn test_result_serializes_money_as_strings() {
    let result = calculate_monthly_payroll(&employee("4000", "1257L"), &tables()).unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(
        decimal(json["income_tax"].as_str().unwrap()),
        decimal("590.20")
    );
    assert_eq!(json["tax_year"], "2025-26");
    assert_eq!(json["ni_category"], "A");
}

// =============================================================================
// Error cases
// =============================================================================

#[test]
fn test_unrecognized_code_aborts_before_national_insurance() {
    let err = calculate_monthly_payroll(&employee("3000", "ZZZZ"), &tables()).unwrap_err();

    assert_eq!(err.phase(), Some(CalculationPhase::IncomeTax));
    match err.root_cause() {
        EngineError::UnrecognizedTaxCode { code } => assert_eq!(code, "ZZZZ"),
        other => panic!("Expected UnrecognizedTaxCode, got {:?}", other),
    }
}

#[test]
fn test_errors_carry_no_personal_data() {
    let mut details = PayrollDetails::new("NURSE-4471-JONES", decimal("3456.78"), "ZZZZ");
    details.identity.name = "Jo Jones".to_string();
    details.identity.ni_number = Some("QQ123456C".to_string());

    let err = calculate_monthly_payroll(&details, &tables()).unwrap_err();
    let message = format!("{} {:?}", err, err);

    for secret in ["NURSE-4471-JONES", "Jo Jones", "QQ123456C", "3456.78"] {
        assert!(!message.contains(secret), "error leaks {}: {}", secret, message);
    }
    assert!(message.contains("NUR***"));
}

#[test]
fn test_invalid_inputs_fail_in_earnings_phase() {
    let mut negative = employee("3000", "1257L");
    negative.monthly_salary = decimal("-1");

    let mut bad_period = employee("3000", "1257L");
    bad_period.tax_period = Some(13);

    let mut wrong_year = employee("3000", "1257L");
    wrong_year.tax_year = Some(TaxYear::new(2026));

    for details in [negative, bad_period, wrong_year] {
        let err = calculate_monthly_payroll(&details, &tables()).unwrap_err();
        assert_eq!(err.phase(), Some(CalculationPhase::Earnings));
        assert!(matches!(err.root_cause(), EngineError::InvalidInput { .. }));
    }
}

// =============================================================================
// Rate table resolution
// =============================================================================

#[tokio::test]
async fn test_yaml_tables_match_built_in_defaults() {
    let mut run = PayrollRun::new(YamlRateSource::new("./config/rates"));
    let from_yaml = run.tables_for(TaxYear::new(2025)).await;

    assert!(from_yaml.fallback_tables().is_empty());
    assert_eq!(*from_yaml, tables());
}

#[tokio::test]
async fn test_yaml_run_calculates_without_fallback() {
    let mut run = PayrollRun::new(YamlRateSource::new("./config/rates"));
    let result = run.calculate(&employee("4000", "1257L")).await.unwrap();

    assert_eq!(result.income_tax, decimal("590.20"));
    assert!(result.fallback_tables.is_empty());
    assert!(result.audit_trace.warnings.is_empty());
}

#[tokio::test]
async fn test_missing_year_falls_back_to_defaults() {
    let mut run = PayrollRun::new(YamlRateSource::new("./config/rates"))
        .with_default_tax_year(TaxYear::new(2030));
    let result = run.calculate(&employee("4000", "1257L")).await.unwrap();

    assert_eq!(result.tax_year, TaxYear::new(2030));
    assert_eq!(result.fallback_tables.len(), 7);
    assert_eq!(result.income_tax, decimal("590.20"));
}

#[tokio::test]
async fn test_run_reuses_one_snapshot() {
    let mut run = PayrollRun::new(DefaultRateSource);
    let first = run.tables_for(TaxYear::new(2025)).await;
    let second = run.tables_for(TaxYear::new(2025)).await;

    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_batch_returns_one_result_per_employee() {
    let mut run = PayrollRun::new(YamlRateSource::new("./config/rates"));
    let employees: Vec<PayrollDetails> = (0..20)
        .map(|i| {
            let code = if i % 5 == 4 { "BADCODE" } else { "1257L" };
            PayrollDetails::new(format!("emp_{:03}", i), Decimal::from(1500 + i * 250), code)
        })
        .collect();

    let results = run.calculate_batch(&employees).await;

    assert_eq!(results.len(), 20);
    for (i, result) in results.iter().enumerate() {
        match result {
            Ok(payslip) => assert_eq!(payslip.identity.employee_id, format!("emp_{:03}", i)),
            Err(err) => {
                assert_eq!(i % 5, 4);
                assert_eq!(err.phase(), Some(CalculationPhase::IncomeTax));
            }
        }
    }
}

// =============================================================================
// Properties
// =============================================================================

fn money() -> impl Strategy<Value = Decimal> {
    (0i64..1_500_000).prop_map(|pence| Decimal::new(pence, 2))
}

proptest! {
    #[test]
    fn prop_recalculation_is_identical(salary in money(), plan in 0usize..6) {
        let mut details = PayrollDetails::new("emp_001", salary, "1257L");
        details.student_loan_plan = StudentLoanPlan::ALL.get(plan).copied();
        details.is_nhs_pension_member = plan % 2 == 0;
        details.pension_percentage = Decimal::from(plan as u32);

        let first = calculate_monthly_payroll(&details, &tables()).unwrap();
        let second = calculate_monthly_payroll(&details, &tables()).unwrap();
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_outputs_are_rounded(salary in money(), code in prop::sample::select(vec!["1257L", "K497", "BR", "D1", "0T", "1100L W1"])) {
        let mut details = PayrollDetails::new("emp_001", salary, code);
        details.pension_percentage = Decimal::new(35, 1);
        details.student_loan_plan = Some(StudentLoanPlan::Postgraduate);
        details.is_nhs_pension_member = true;

        let result = calculate_monthly_payroll(&details, &tables()).unwrap();

        prop_assert_eq!(result.taxable_pay.fract(), Decimal::ZERO);
        for (name, amount) in [
            ("gross_pay", result.gross_pay),
            ("free_pay", result.free_pay),
            ("income_tax", result.income_tax),
            ("employee_ni", result.employee_ni),
            ("employer_ni", result.employer_ni),
            ("student_loan", result.student_loan),
            ("pension_contribution", result.pension_contribution),
            ("nhs_employee", result.nhs_pension.employee_contribution),
            ("nhs_employer", result.nhs_pension.employer_contribution),
            ("total_deductions", result.totals.total_deductions),
            ("employer_cost", result.totals.employer_cost),
            ("net_pay", result.net_pay),
        ] {
            assert_at_most_two_dp(name, amount);
        }
    }

    #[test]
    fn prop_payslip_reconciles(
        salary in money(),
        deduction in money(),
        allowance in money(),
        pension in 0u32..100,
        plan in 0usize..6,
    ) {
        let mut details = PayrollDetails::new("emp_001", salary, "1257L");
        details.pension_percentage = Decimal::new(pension as i64, 1);
        details.student_loan_plan = StudentLoanPlan::ALL.get(plan).copied();
        details.is_nhs_pension_member = plan % 2 == 1;
        details.additional_deductions = vec![PayItem::new("Union", deduction)];
        details.additional_allowances = vec![PayItem::new("Mileage", allowance)];

        let result = calculate_monthly_payroll(&details, &tables()).unwrap();

        let deductions = result.income_tax
            + result.employee_ni
            + result.student_loan
            + result.pension_contribution
            + result.nhs_pension.employee_contribution
            + result.totals.additional_deductions;
        prop_assert_eq!(result.totals.total_deductions, deductions);
        prop_assert_eq!(
            result.net_pay,
            result.gross_pay - deductions + result.totals.additional_allowances
        );
        prop_assert_eq!(
            result.totals.employer_cost,
            result.gross_pay + result.employer_ni + result.nhs_pension.employer_contribution
        );
    }

    #[test]
    fn prop_category_c_never_pays_employee_ni(salary in money()) {
        let category_a = calculate_monthly_payroll(&PayrollDetails::new("emp_001", salary, "1257L"), &tables()).unwrap();
        let details = with_category(PayrollDetails::new("emp_001", salary, "1257L"), "C");
        let category_c = calculate_monthly_payroll(&details, &tables()).unwrap();

        prop_assert_eq!(category_c.employee_ni, Decimal::ZERO);
        prop_assert_eq!(category_c.employer_ni, category_a.employer_ni);
    }

    #[test]
    fn prop_relief_categories_pay_no_employer_ni_to_uel(
        pence in 0i64..=418_900,
        category in prop::sample::select(vec!["M", "H", "V", "Z"]),
    ) {
        let details = with_category(
            PayrollDetails::new("emp_001", Decimal::new(pence, 2), "1257L"),
            category,
        );
        let result = calculate_monthly_payroll(&details, &tables()).unwrap();
        prop_assert_eq!(result.employer_ni, Decimal::ZERO);
    }

    #[test]
    fn prop_nt_refunds_exactly_tax_paid(salary in money(), paid in 0i64..2_000_000, period in 2u8..=12) {
        let mut details = PayrollDetails::new("emp_001", salary, "NT");
        details.tax_period = Some(period);
        details.gross_pay_ytd = Decimal::from(period as u32 * 1000);
        details.tax_paid_ytd = Decimal::new(paid, 2);

        let result = calculate_monthly_payroll(&details, &tables()).unwrap();
        prop_assert_eq!(result.income_tax, -Decimal::new(paid, 2));
    }

    #[test]
    fn prop_ni_bands_sum_to_gross(salary in money()) {
        let result = calculate_monthly_payroll(&PayrollDetails::new("emp_001", salary, "1257L"), &tables()).unwrap();
        prop_assert_eq!(result.ni_bands.total(), result.gross_pay);
    }

    #[test]
    fn prop_k_code_free_pay_mirrors_standard(allowance in 1u32..2000) {
        let standard = parse_tax_code(&format!("{}L", allowance)).unwrap();
        let k_code = parse_tax_code(&format!("K{}", allowance)).unwrap();
        prop_assert_eq!(standard.monthly_free_pay, -k_code.monthly_free_pay);
    }
}
