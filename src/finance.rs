use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::models::{Appointment, AppointmentStatus, Procedure, Transaction, TransactionKind};
use crate::scheduler::line_names;

pub const APPOINTMENT_CATEGORY: &str = "Atendimento Odontológico";
pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];
const SERIES_MONTHS: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    /// e.g. `Jun/24`
    pub month: String,
    pub income: f64,
    pub expense: f64,
}

#[derive(Debug, Serialize)]
pub struct FinanceReport {
    pub transactions: Vec<Transaction>,
    pub totals: Totals,
    pub monthly: Vec<MonthBucket>,
}

pub fn month_label(year: i32, month0: u32) -> String {
    let name = MONTH_ABBREVIATIONS[month0 as usize % 12];
    format!("{name}/{:02}", year.rem_euclid(100))
}

/// One synthetic revenue row per completed appointment with a positive total.
pub fn appointment_revenue(appointments: &[Appointment], procedures: &[Procedure]) -> Vec<Transaction> {
    appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Completed && a.valor_final > 0.0)
        .map(|a| {
            let names = line_names(&a.procedures, procedures, "Desconhecido").join(", ");
            Transaction {
                id: format!("at-{}", a.id),
                description: format!("Atendimento: {names} - {}", a.patient.name),
                amount: a.valor_final,
                kind: TransactionKind::Income,
                date: a.end_time,
                category: APPOINTMENT_CATEGORY.to_string(),
                appointment_id: Some(a.id.clone()),
                clinic_id: a.clinic_id.clone(),
            }
        })
        .collect()
}

/// Derived revenue plus manual rows, newest first.
pub fn ledger(appointments: &[Appointment], manual: &[Transaction], procedures: &[Procedure]) -> Vec<Transaction> {
    let mut rows = appointment_revenue(appointments, procedures);
    rows.extend(manual.iter().cloned());
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    rows
}

pub fn totals(rows: &[Transaction]) -> Totals {
    let mut t = rows.iter().fold(Totals::default(), |mut acc, row| {
        match row.kind {
            TransactionKind::Income => acc.income += row.amount,
            TransactionKind::Expense => acc.expense += row.amount,
        }
        acc
    });
    t.balance = t.income - t.expense;
    t
}

/// Income and expense per (year, month), chronological, keeping the last
/// six months that have any rows.
pub fn monthly_series(rows: &[Transaction]) -> Vec<MonthBucket> {
    let mut buckets: BTreeMap<(i32, u32), (f64, f64)> = BTreeMap::new();
    for row in rows {
        let entry = buckets.entry((row.date.year(), row.date.month0())).or_default();
        match row.kind {
            TransactionKind::Income => entry.0 += row.amount,
            TransactionKind::Expense => entry.1 += row.amount,
        }
    }

    let skip = buckets.len().saturating_sub(SERIES_MONTHS);
    buckets
        .into_iter()
        .skip(skip)
        .map(|((year, month0), (income, expense))| MonthBucket {
            month: month_label(year, month0),
            income,
            expense,
        })
        .collect()
}

pub fn report(appointments: &[Appointment], manual: &[Transaction], procedures: &[Procedure]) -> FinanceReport {
    let transactions = ledger(appointments, manual, procedures);
    FinanceReport {
        totals: totals(&transactions),
        monthly: monthly_series(&transactions),
        transactions,
    }
}
