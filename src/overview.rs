use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::finance::month_label;
use crate::models::{Appointment, AppointmentStatus, Patient, UserRole};
use crate::navigation::{nav_items, NavItem, Section};
use crate::scheduler::week_start;

const WEEKDAY_LABELS: [&str; 7] = ["Seg", "Ter", "Qua", "Qui", "Sex", "Sáb", "Dom"];
const TRAILING_MONTHS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountBucket {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct Overview {
    pub appointments_today: usize,
    pub total_patients: usize,
    pub completed_today: usize,
    pub revenue_today: f64,
    pub week: Vec<CountBucket>,
    pub months: Vec<CountBucket>,
    pub quick_access: Vec<NavItem>,
}

pub fn build(appointments: &[Appointment], patients: &[Patient], role: UserRole, today: NaiveDate) -> Overview {
    let todays: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| a.start_time.date() == today)
        .collect();
    let completed: Vec<&&Appointment> = todays
        .iter()
        .filter(|a| a.status == AppointmentStatus::Completed)
        .collect();

    Overview {
        appointments_today: todays.len(),
        total_patients: patients.len(),
        completed_today: completed.len(),
        revenue_today: completed.iter().map(|a| a.valor_final).sum(),
        week: weekly_counts(appointments, today),
        months: monthly_counts(appointments, today),
        quick_access: nav_items(role)
            .into_iter()
            .filter(|item| item.view != Section::Dashboard)
            .collect(),
    }
}

/// Appointments per day of the Monday-based week containing `today`.
pub fn weekly_counts(appointments: &[Appointment], today: NaiveDate) -> Vec<CountBucket> {
    let monday = week_start(today);
    WEEKDAY_LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let day = monday + Duration::days(i as i64);
            CountBucket {
                label: label.to_string(),
                count: appointments.iter().filter(|a| a.start_time.date() == day).count(),
            }
        })
        .collect()
}

/// Appointments per month for the six calendar months ending with the
/// current one. Empty months are kept.
pub fn monthly_counts(appointments: &[Appointment], today: NaiveDate) -> Vec<CountBucket> {
    let current = today.year() * 12 + today.month0() as i32;
    (0..TRAILING_MONTHS as i32)
        .rev()
        .map(|back| {
            let index = current - back;
            let (year, month0) = (index.div_euclid(12), index.rem_euclid(12) as u32);
            CountBucket {
                label: month_label(year, month0),
                count: appointments
                    .iter()
                    .filter(|a| a.start_time.year() == year && a.start_time.month0() == month0)
                    .count(),
            }
        })
        .collect()
}
