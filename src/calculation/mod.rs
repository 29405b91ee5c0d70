//! Calculation logic for the UK Payroll Engine.
//!
//! This module contains the tax code parser, the income tax, National
//! Insurance, NHS pension, workplace pension and student loan calculators,
//! and the orchestrator that runs them in order for one employee-month.
//! Each calculator is a plain function over validated inputs and returns
//! its figures at full precision together with an audit step.

mod income_tax;
mod national_insurance;
mod nhs_pension;
mod payroll;
mod pension;
mod rounding;
mod student_loan;
mod tax_code;

pub use income_tax::{
    BandCharge, IncomeTaxInput, IncomeTaxResult, ProgressiveTax, apply_progressive_bands,
    calculate_income_tax,
};
pub use national_insurance::{
    NationalInsuranceResult, allocate_earnings_bands, calculate_national_insurance,
};
pub use nhs_pension::{NhsPensionResult, calculate_nhs_pension};
pub use payroll::{
    EarningsResult, MAX_MONTHLY_SALARY, PayrollRun, calculate_earnings, calculate_monthly_payroll,
};
pub use pension::{WorkplacePensionResult, calculate_workplace_pension};
pub use rounding::{floor_to_pound, round_money, round_ni};
pub use student_loan::{StudentLoanResult, calculate_student_loan};
pub use tax_code::{
    MAX_TAX_CODE_LENGTH, free_pay_to_date, normalize_tax_code, parse_tax_code, validate_tax_code,
};
