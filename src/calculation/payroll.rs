//! Monthly payroll orchestration.
//!
//! This module sequences the calculation phases for one employee
//! (earnings, income tax, National Insurance, pensions, student loan,
//! assembly) and owns the final rounding. [`PayrollRun`] wraps it with
//! per-run rate table resolution.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::income_tax::{IncomeTaxInput, IncomeTaxResult, calculate_income_tax};
use super::national_insurance::calculate_national_insurance;
use super::nhs_pension::calculate_nhs_pension;
use super::pension::calculate_workplace_pension;
use super::rounding::{round_money, round_ni};
use super::student_loan::calculate_student_loan;
use super::tax_code::parse_tax_code;
use crate::config::{DEFAULT_TAX_YEAR, RateTableCache, RateTableProvider, RateTables};
use crate::error::{CalculationPhase, EngineError, EngineResult, ErrorContext};
use crate::models::{
    AuditStep, AuditTrace, NhsPensionContribution, NiCategory, PayItem, PayrollDetails,
    PayrollResult, PayrollTotals, TAX_MONTHS_PER_YEAR, TaxBasis, TaxCode, TaxYear,
};

/// Largest monthly salary accepted.
pub const MAX_MONTHLY_SALARY: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);

/// Attaches the phase and sanitized context to a failure.
fn in_phase<T>(
    result: EngineResult<T>,
    phase: CalculationPhase,
    context: &ErrorContext,
) -> EngineResult<T> {
    result.map_err(|source| EngineError::Calculation {
        phase,
        context: context.clone(),
        source: Box::new(source),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> EngineError {
    EngineError::InvalidInput {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Checks an amount is non-negative and a whole number of pence.
fn check_amount(field: &str, amount: Decimal) -> EngineResult<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(invalid(field, "must not be negative"));
    }
    if amount.normalize().scale() > 2 {
        return Err(invalid(field, "must be a whole number of pence"));
    }
    Ok(())
}

fn check_items(field: &str, items: &[PayItem]) -> EngineResult<()> {
    items.iter().try_for_each(|item| check_amount(field, item.amount))
}

/// The result of the earnings phase, including the audit step.
#[derive(Debug, Clone)]
pub struct EarningsResult {
    /// The tax year being calculated.
    pub tax_year: TaxYear,
    /// The resolved PAYE tax month.
    pub tax_period: u8,
    /// Salary plus additional earnings.
    pub gross_pay: Decimal,
    /// Sum of additional earnings.
    pub additional_earnings: Decimal,
    /// Sum of additional deductions.
    pub additional_deductions: Decimal,
    /// Sum of additional allowances.
    pub additional_allowances: Decimal,
    /// The audit step recording this phase.
    pub audit_step: AuditStep,
}

/// Validates the input and works out gross pay and the tax period.
///
/// The tax period is the explicit `tax_period` if given, else the tax month
/// of `pay_date`, else month 1 when no year-to-date figures are supplied.
///
/// # Returns
///
/// Returns an `EarningsResult`, or an `InvalidInput` error if:
/// - The salary is negative or above [`MAX_MONTHLY_SALARY`]
/// - Any amount is negative or has fractional pence
/// - `tax_year` differs from the year of `tables`
/// - The tax period is outside 1-12, disagrees with `pay_date`, or cannot
///   be determined although year-to-date figures are supplied
pub fn calculate_earnings(
    details: &PayrollDetails,
    tables: &RateTables,
    step_number: u32,
) -> EngineResult<EarningsResult> {
    let tax_year = tables.tax_year();
    if details.tax_year.is_some_and(|year| year != tax_year) {
        return Err(invalid(
            "tax_year",
            format!("rate tables are for {}", tax_year),
        ));
    }

    check_amount("monthly_salary", details.monthly_salary)?;
    if details.monthly_salary > MAX_MONTHLY_SALARY {
        return Err(invalid("monthly_salary", "exceeds the maximum monthly salary"));
    }
    check_items("additional_earnings", &details.additional_earnings)?;
    check_items("additional_deductions", &details.additional_deductions)?;
    check_items("additional_allowances", &details.additional_allowances)?;
    check_amount("gross_pay_ytd", details.gross_pay_ytd)?;
    check_amount("tax_paid_ytd", details.tax_paid_ytd)?;
    if let Some(pay) = details.previous_year_pensionable_pay {
        check_amount("previous_year_pensionable_pay", pay)?;
    }

    let tax_period = resolve_tax_period(details, tax_year)?;

    let additional_earnings = details.additional_earnings_total();
    let gross_pay = details.gross_pay();

    let audit_step = AuditStep {
        step_number,
        rule_id: "gross_pay".to_string(),
        rule_name: "Gross Pay".to_string(),
        guidance_ref: "CWG2 chapter 1".to_string(),
        input: serde_json::json!({
            "monthly_salary": details.monthly_salary.to_string(),
            "additional_earnings": details.additional_earnings.iter().map(|item| serde_json::json!({
                "description": item.description,
                "amount": item.amount.to_string()
            })).collect::<Vec<_>>(),
            "tax_year": tax_year.to_string()
        }),
        output: serde_json::json!({
            "gross_pay": gross_pay.to_string(),
            "tax_period": tax_period
        }),
        reasoning: format!(
            "Salary {} + additional earnings {} = {}, tax month {}",
            details.monthly_salary.normalize(),
            additional_earnings.normalize(),
            gross_pay.normalize(),
            tax_period
        ),
    };

    Ok(EarningsResult {
        tax_year,
        tax_period,
        gross_pay,
        additional_earnings,
        additional_deductions: details.additional_deductions_total(),
        additional_allowances: details.additional_allowances_total(),
        audit_step,
    })
}

fn resolve_tax_period(details: &PayrollDetails, tax_year: TaxYear) -> EngineResult<u8> {
    let from_date = details
        .pay_date
        .map(|date| tax_year.tax_month(date))
        .transpose()?;

    match (details.tax_period, from_date) {
        (Some(period), _) if !(1..=TAX_MONTHS_PER_YEAR).contains(&period) => Err(invalid(
            "tax_period",
            format!("must be between 1 and {}", TAX_MONTHS_PER_YEAR),
        )),
        (Some(period), Some(month)) if period != month => Err(invalid(
            "tax_period",
            format!("period {} does not match the pay date (month {})", period, month),
        )),
        (Some(period), _) => Ok(period),
        (None, Some(month)) => Ok(month),
        (None, None) if !details.has_year_to_date() => Ok(1),
        (None, None) => Err(invalid(
            "tax_period",
            "required when year-to-date figures are supplied",
        )),
    }
}

/// Calculates one employee's monthly payroll against resolved rate tables.
///
/// Phases run in order and the first failure aborts the calculation; the
/// error is wrapped in [`EngineError::Calculation`] with the failing phase
/// and a context that carries no pay figures or personal details. All money
/// is carried at full precision until assembly, where each output field is
/// rounded once: NI with [`round_ni`], everything else with [`round_money`].
/// Taxable pay is floored to whole pounds when it is computed.
///
/// Net pay is gross pay less income tax, employee NI, student loan,
/// workplace pension, NHS pension and additional deductions, plus
/// additional allowances. Totals and net pay are sums of the rounded lines,
/// so a payslip always adds up.
///
/// # Examples
///
/// ```
/// use uk_payroll_engine::calculation::calculate_monthly_payroll;
/// use uk_payroll_engine::config::default_rate_tables;
/// use uk_payroll_engine::models::{PayrollDetails, TaxYear};
/// use rust_decimal::Decimal;
///
/// let tables = default_rate_tables(TaxYear::new(2025));
/// let details = PayrollDetails::new("emp_001", Decimal::from(4_000), "1257L");
///
/// let result = calculate_monthly_payroll(&details, &tables).unwrap();
/// assert_eq!(result.taxable_pay, Decimal::from(2_951));
/// assert_eq!(result.income_tax, Decimal::new(59020, 2));
/// ```
pub fn calculate_monthly_payroll(
    details: &PayrollDetails,
    tables: &RateTables,
) -> EngineResult<PayrollResult> {
    let context = ErrorContext::new(
        &details.identity.employee_id,
        details.tax_year.unwrap_or_else(|| tables.tax_year()),
        &details.ni_category,
    );
    let mut trace = AuditTrace::default();

    // Earnings
    debug!(employee = %context.employee_ref, phase = CalculationPhase::Earnings.code(), "Calculating");
    let earnings = in_phase(
        calculate_earnings(details, tables, trace.next_step_number()),
        CalculationPhase::Earnings,
        &context,
    )?;
    trace.push(earnings.audit_step.clone());

    // Income tax
    debug!(employee = %context.employee_ref, phase = CalculationPhase::IncomeTax.code(), "Calculating");
    let (tax_code, income_tax) = in_phase(
        income_tax_phase(details, tables, &earnings, trace.next_step_number()),
        CalculationPhase::IncomeTax,
        &context,
    )?;
    trace.push(income_tax.audit_step.clone());

    // National Insurance
    debug!(employee = %context.employee_ref, phase = CalculationPhase::NationalInsurance.code(), "Calculating");
    let national_insurance = in_phase(
        NiCategory::from_str(&details.ni_category).and_then(|category| {
            calculate_national_insurance(
                earnings.gross_pay,
                category,
                tables.ni_thresholds(),
                tables.ni_category(category)?,
                trace.next_step_number(),
            )
        }),
        CalculationPhase::NationalInsurance,
        &context,
    )?;
    trace.push(national_insurance.audit_step.clone());
    if national_insurance.recalculated_with_fallback {
        trace.warn(
            "NI_RECALCULATED",
            "Supplied NI rates produced nil employee NI; built-in rates were used",
        );
    }

    // Pensions
    debug!(employee = %context.employee_ref, phase = CalculationPhase::Pension.code(), "Calculating");
    let workplace_pension = in_phase(
        calculate_workplace_pension(
            details.monthly_salary,
            details.pension_percentage,
            trace.next_step_number(),
        ),
        CalculationPhase::Pension,
        &context,
    )?;
    trace.push(workplace_pension.audit_step.clone());

    let nhs_pension = calculate_nhs_pension(
        details.monthly_salary,
        details.previous_year_pensionable_pay,
        details.is_nhs_pension_member,
        tables.nhs_pension_bands(),
        trace.next_step_number(),
    );
    trace.push(nhs_pension.audit_step.clone());
    if details.is_nhs_pension_member && !nhs_pension.contribution.is_determined() {
        trace.warn(
            "NHS_TIER_NOT_DETERMINED",
            "No NHS pension tier matched; no contribution was taken",
        );
    }

    // Student loan
    debug!(employee = %context.employee_ref, phase = CalculationPhase::StudentLoan.code(), "Calculating");
    let student_loan = in_phase(
        calculate_student_loan(
            details.monthly_salary,
            details.student_loan_plan,
            tables,
            trace.next_step_number(),
        ),
        CalculationPhase::StudentLoan,
        &context,
    )?;
    trace.push(student_loan.audit_step.clone());

    // Assembly
    debug!(employee = %context.employee_ref, phase = CalculationPhase::Assembly.code(), "Calculating");
    let income_tax_due = round_money(income_tax.tax_this_period);
    let employee_ni = round_ni(national_insurance.employee_ni);
    let employer_ni = round_ni(national_insurance.employer_ni);
    let student_loan_due = round_money(student_loan.repayment);
    let pension_contribution = round_money(workplace_pension.contribution);
    let nhs = round_nhs_contribution(nhs_pension.contribution);
    let additional_earnings = round_money(earnings.additional_earnings);
    let additional_deductions = round_money(earnings.additional_deductions);
    let additional_allowances = round_money(earnings.additional_allowances);

    let ni_bands = national_insurance.bands.map(round_money);
    let gross_pay = round_money(earnings.gross_pay);
    let total_deductions = income_tax_due
        + employee_ni
        + student_loan_due
        + pension_contribution
        + nhs.employee_contribution
        + additional_deductions;
    let net_pay = gross_pay - total_deductions + additional_allowances;
    let employer_cost = gross_pay + employer_ni + nhs.employer_contribution;

    in_phase(
        if ni_bands.total() == gross_pay {
            Ok(())
        } else {
            Err(EngineError::CalculationIntegrityViolation {
                check: "ni_band_sum".to_string(),
                message: "rounded NI earnings bands do not sum to gross pay".to_string(),
            })
        },
        CalculationPhase::Assembly,
        &context,
    )?;

    for kind in tables.fallback_tables() {
        trace.warn(
            "FALLBACK_RATE_TABLE",
            format!("Built-in {} table used for {}", kind, earnings.tax_year),
        );
    }

    let result = PayrollResult {
        identity: details.identity.clone(),
        tax_year: earnings.tax_year,
        tax_period: earnings.tax_period,
        tax_basis: income_tax.basis,
        tax_code: tax_code.raw.clone(),
        ni_category: national_insurance.category,
        gross_pay,
        free_pay: round_money(income_tax.free_pay),
        taxable_pay: income_tax.taxable_pay,
        tax_due_ytd: round_money(income_tax.tax_due_to_date),
        income_tax: income_tax_due,
        employee_ni,
        employer_ni,
        ni_bands,
        student_loan_plan: student_loan.plan,
        student_loan: student_loan_due,
        pension_contribution,
        nhs_pension: nhs,
        totals: PayrollTotals {
            additional_earnings,
            additional_deductions,
            additional_allowances,
            total_deductions,
            employer_cost,
        },
        net_pay,
        fallback_tables: tables.fallback_tables().to_vec(),
        audit_trace: trace,
    };

    info!(
        employee = %context.employee_ref,
        tax_year = %result.tax_year,
        tax_period = result.tax_period,
        steps = result.audit_trace.steps.len(),
        warnings = result.audit_trace.warnings.len(),
        "Payroll calculated"
    );

    Ok(result)
}

/// Parses the tax code, picks the regional bands and calculates tax.
fn income_tax_phase(
    details: &PayrollDetails,
    tables: &RateTables,
    earnings: &EarningsResult,
    step_number: u32,
) -> EngineResult<(TaxCode, IncomeTaxResult)> {
    let tax_code = parse_tax_code(&details.tax_code)?;
    let bands = tables.tax_bands_for(tax_code.region)?;
    let basis = if details.week1_month1 {
        TaxBasis::NonCumulative
    } else {
        tax_code.basis
    };
    let input = IncomeTaxInput {
        tax_code: &tax_code,
        bands,
        basis,
        period: earnings.tax_period,
        gross_pay: earnings.gross_pay,
        previous_gross_pay_ytd: details.gross_pay_ytd,
        tax_paid_ytd: details.tax_paid_ytd,
    };
    let result = calculate_income_tax(&input, step_number)?;
    Ok((tax_code, result))
}

/// Rounds the money fields of an NHS contribution, leaving rates intact.
fn round_nhs_contribution(contribution: NhsPensionContribution) -> NhsPensionContribution {
    NhsPensionContribution {
        employee_contribution: round_money(contribution.employee_contribution),
        employer_contribution: round_money(contribution.employer_contribution),
        ..contribution
    }
}

/// A payroll run: one provider, one rate table snapshot per tax year.
///
/// Every employee calculated through the same run sees the same tables,
/// resolved on first use and cached until the run is dropped.
///
/// # Example
///
/// ```no_run
/// use uk_payroll_engine::calculation::PayrollRun;
/// use uk_payroll_engine::config::YamlRateSource;
/// use uk_payroll_engine::models::PayrollDetails;
/// use rust_decimal::Decimal;
///
/// # async fn run() {
/// let mut run = PayrollRun::new(YamlRateSource::new("./config/rates"));
/// let employees = vec![
///     PayrollDetails::new("emp_001", Decimal::from(2_500), "1257L"),
///     PayrollDetails::new("emp_002", Decimal::from(4_000), "K497"),
/// ];
/// for result in run.calculate_batch(&employees).await {
///     match result {
///         Ok(payslip) => println!("{}: {}", payslip.identity.employee_id, payslip.net_pay),
///         Err(err) => eprintln!("skipped: {}", err),
///     }
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct PayrollRun<P> {
    run_id: Uuid,
    provider: P,
    cache: RateTableCache,
    default_tax_year: TaxYear,
}

impl<P: RateTableProvider> PayrollRun<P> {
    /// Starts a run against `provider`.
    pub fn new(provider: P) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            provider,
            cache: RateTableCache::new(),
            default_tax_year: DEFAULT_TAX_YEAR,
        }
    }

    /// Sets the tax year used for employees with neither a tax year nor a
    /// pay date.
    pub fn with_default_tax_year(mut self, tax_year: TaxYear) -> Self {
        self.default_tax_year = tax_year;
        self
    }

    /// Identifier for this run, used in log events.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The tax year an employee will be calculated in.
    pub fn tax_year_for(&self, details: &PayrollDetails) -> TaxYear {
        details
            .tax_year
            .or_else(|| details.pay_date.map(TaxYear::containing))
            .unwrap_or(self.default_tax_year)
    }

    /// The rate table snapshot for a tax year, resolving it on first use.
    pub async fn tables_for(&mut self, tax_year: TaxYear) -> Arc<RateTables> {
        self.cache.resolve(&self.provider, tax_year).await
    }

    /// Calculates one employee.
    pub async fn calculate(&mut self, details: &PayrollDetails) -> EngineResult<PayrollResult> {
        let tables = self.tables_for(self.tax_year_for(details)).await;
        calculate_monthly_payroll(details, &tables)
    }

    /// Calculates every employee, returning one result per employee in
    /// input order. A failure for one employee does not stop the others.
    pub async fn calculate_batch(
        &mut self,
        employees: &[PayrollDetails],
    ) -> Vec<EngineResult<PayrollResult>> {
        let mut results = Vec::with_capacity(employees.len());
        for details in employees {
            let result = self.calculate(details).await;
            if let Err(err) = &result {
                warn!(
                    run_id = %self.run_id,
                    phase = err.phase().map(|phase| phase.code()).unwrap_or("UNKNOWN"),
                    error = %err,
                    "Employee calculation failed"
                );
            }
            results.push(result);
        }

        let failed = results.iter().filter(|result| result.is_err()).count();
        info!(
            run_id = %self.run_id,
            employees = employees.len(),
            failed,
            "Payroll batch complete"
        );
        results
    }
}
