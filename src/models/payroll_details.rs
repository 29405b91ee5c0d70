//! Payroll input model.
//!
//! [`PayrollDetails`] is everything the engine needs to calculate one
//! employee's monthly pay. Identity fields are carried through to the result
//! untouched and are never interpreted.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TaxYear;
use crate::error::EngineError;

/// Identity fields passed through from input to result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmployeeIdentity {
    /// The employer's identifier for the employee.
    pub employee_id: String,
    /// The employee's display name.
    #[serde(default)]
    pub name: String,
    /// The employee's NI number, if known.
    #[serde(default)]
    pub ni_number: Option<String>,
}

/// A named additional earning, deduction or allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayItem {
    /// What the amount is for (e.g. "Overtime", "Cycle to work").
    pub description: String,
    /// The amount for this period.
    pub amount: Decimal,
}

impl PayItem {
    /// Creates a pay item.
    pub fn new(description: impl Into<String>, amount: Decimal) -> Self {
        Self {
            description: description.into(),
            amount,
        }
    }
}

/// Student and postgraduate loan repayment plans.
///
/// Serialized as the plan number (1, 2, 4, 5 or 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StudentLoanPlan {
    /// Plan 1.
    Plan1,
    /// Plan 2.
    Plan2,
    /// Plan 4 (Scotland).
    Plan4,
    /// Plan 5.
    Plan5,
    /// Postgraduate loan (plan 6).
    Postgraduate,
}

impl StudentLoanPlan {
    /// Every supported plan.
    pub const ALL: [StudentLoanPlan; 5] = [
        StudentLoanPlan::Plan1,
        StudentLoanPlan::Plan2,
        StudentLoanPlan::Plan4,
        StudentLoanPlan::Plan5,
        StudentLoanPlan::Postgraduate,
    ];

    /// The plan number.
    pub fn number(&self) -> u8 {
        match self {
            StudentLoanPlan::Plan1 => 1,
            StudentLoanPlan::Plan2 => 2,
            StudentLoanPlan::Plan4 => 4,
            StudentLoanPlan::Plan5 => 5,
            StudentLoanPlan::Postgraduate => 6,
        }
    }
}

impl TryFrom<u8> for StudentLoanPlan {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        StudentLoanPlan::ALL
            .into_iter()
            .find(|plan| plan.number() == value)
            .ok_or_else(|| EngineError::InvalidInput {
                field: "student_loan_plan".to_string(),
                message: format!("unknown plan {}, expected 1, 2, 4, 5 or 6", value),
            })
    }
}

impl From<StudentLoanPlan> for u8 {
    fn from(value: StudentLoanPlan) -> Self {
        value.number()
    }
}

fn default_ni_category() -> String {
    "A".to_string()
}

/// Everything needed to calculate one employee's monthly payroll.
///
/// # Example
///
/// ```
/// use uk_payroll_engine::models::PayrollDetails;
/// use rust_decimal::Decimal;
///
/// let details = PayrollDetails::new("emp_001", Decimal::new(4000, 0), "1257L");
/// assert_eq!(details.ni_category, "A");
/// assert_eq!(details.gross_pay(), Decimal::new(4000, 0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollDetails {
    /// Identity fields, passed through unchanged.
    pub identity: EmployeeIdentity,
    /// Basic monthly salary.
    pub monthly_salary: Decimal,
    /// The HMRC tax code as issued.
    pub tax_code: String,
    /// The NI category letter.
    #[serde(default = "default_ni_category")]
    pub ni_category: String,
    /// Workplace pension contribution as a percentage of salary.
    #[serde(default)]
    pub pension_percentage: Decimal,
    /// Student loan plan, if any.
    #[serde(default)]
    pub student_loan_plan: Option<StudentLoanPlan>,
    /// Whether the employee is in the NHS Pension Scheme.
    #[serde(default)]
    pub is_nhs_pension_member: bool,
    /// Annual pensionable pay for the previous year, used for NHS tiering.
    #[serde(default)]
    pub previous_year_pensionable_pay: Option<Decimal>,
    /// Taxable earnings on top of salary (overtime, bonus, ...).
    #[serde(default)]
    pub additional_earnings: Vec<PayItem>,
    /// Post-tax deductions.
    #[serde(default)]
    pub additional_deductions: Vec<PayItem>,
    /// Non-taxable allowances added to net pay.
    #[serde(default)]
    pub additional_allowances: Vec<PayItem>,
    /// The tax year; defaults to the year of the rate tables in use.
    #[serde(default)]
    pub tax_year: Option<TaxYear>,
    /// PAYE tax month (1-12).
    #[serde(default)]
    pub tax_period: Option<u8>,
    /// The pay date, used to derive the tax month when none is given.
    #[serde(default)]
    pub pay_date: Option<NaiveDate>,
    /// Taxable gross pay for earlier periods of the tax year.
    #[serde(default)]
    pub gross_pay_ytd: Decimal,
    /// Income tax already deducted in earlier periods of the tax year.
    #[serde(default)]
    pub tax_paid_ytd: Decimal,
    /// Forces the Week1/Month1 basis regardless of the tax code.
    #[serde(default)]
    pub week1_month1: bool,
}

impl PayrollDetails {
    /// Creates details with the given salary and tax code and defaults
    /// everywhere else (category A, no pension, no loan, month 1).
    pub fn new(employee_id: impl Into<String>, monthly_salary: Decimal, tax_code: impl Into<String>) -> Self {
        Self {
            identity: EmployeeIdentity {
                employee_id: employee_id.into(),
                ..EmployeeIdentity::default()
            },
            monthly_salary,
            tax_code: tax_code.into(),
            ni_category: default_ni_category(),
            pension_percentage: Decimal::ZERO,
            student_loan_plan: None,
            is_nhs_pension_member: false,
            previous_year_pensionable_pay: None,
            additional_earnings: vec![],
            additional_deductions: vec![],
            additional_allowances: vec![],
            tax_year: None,
            tax_period: None,
            pay_date: None,
            gross_pay_ytd: Decimal::ZERO,
            tax_paid_ytd: Decimal::ZERO,
            week1_month1: false,
        }
    }

    /// Sum of additional earnings.
    pub fn additional_earnings_total(&self) -> Decimal {
        self.additional_earnings.iter().map(|item| item.amount).sum()
    }

    /// Sum of additional deductions.
    pub fn additional_deductions_total(&self) -> Decimal {
        self.additional_deductions.iter().map(|item| item.amount).sum()
    }

    /// Sum of additional allowances.
    pub fn additional_allowances_total(&self) -> Decimal {
        self.additional_allowances.iter().map(|item| item.amount).sum()
    }

    /// Gross pay for the period: salary plus additional earnings.
    pub fn gross_pay(&self) -> Decimal {
        self.monthly_salary + self.additional_earnings_total()
    }

    /// True if any year-to-date figure has been supplied.
    pub fn has_year_to_date(&self) -> bool {
        !self.gross_pay_ytd.is_zero() || !self.tax_paid_ytd.is_zero()
    }
}
