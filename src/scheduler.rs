use std::collections::HashSet;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};

use crate::models::{
    Appointment, AppointmentProcedure, AppointmentStatus, Doctor, DoctorProcedure, Procedure,
};

/// Default visit length when the form only supplies a start time.
pub const DEFAULT_DURATION_MINUTES: i64 = 30;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScheduleError {
    #[error("Adicione pelo menos um procedimento ao atendimento.")]
    NoProcedures,
    #[error("O procedimento {0} não é realizado por este doutor.")]
    NotOffered(String),
    #[error("O procedimento {0} foi adicionado mais de uma vez.")]
    Duplicate(String),
    #[error("O procedimento {0} precisa de um valor final válido e positivo.")]
    InvalidPrice(String),
    #[error("O horário de término deve ser posterior ao de início.")]
    InvalidTimeRange,
    #[error("Data fora do intervalo suportado.")]
    DateOutOfRange,
}

/* ============================================================
   Names and search
   ============================================================ */

pub fn procedure_name<'a>(procedures: &'a [Procedure], id: &str) -> Option<&'a str> {
    procedures.iter().find(|p| p.id == id).map(|p| p.name.as_str())
}

/// Names of an appointment's lines, `fallback` for unknown procedures.
pub fn line_names(lines: &[AppointmentProcedure], procedures: &[Procedure], fallback: &str) -> Vec<String> {
    lines
        .iter()
        .map(|l| procedure_name(procedures, &l.procedure_id).unwrap_or(fallback).to_string())
        .collect()
}

/// Case-insensitive match on patient, doctor or procedure names.
pub fn search(appointments: &[Appointment], procedures: &[Procedure], term: Option<&str>) -> Vec<Appointment> {
    let needle = term.map(str::trim).unwrap_or_default().to_lowercase();
    if needle.is_empty() {
        return appointments.to_vec();
    }
    appointments
        .iter()
        .filter(|a| {
            let names = line_names(&a.procedures, procedures, "").join(" ").to_lowercase();
            a.patient.name.to_lowercase().contains(&needle)
                || a.doctor.name.to_lowercase().contains(&needle)
                || names.contains(&needle)
        })
        .cloned()
        .collect()
}

/* ============================================================
   Kanban and table
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct KanbanColumn {
    pub status: AppointmentStatus,
    pub title: &'static str,
    pub count: usize,
    pub cards: Vec<Appointment>,
}

/// One column per status in fixed order, cards by start time ascending.
pub fn kanban(appointments: &[Appointment]) -> Vec<KanbanColumn> {
    AppointmentStatus::ALL
        .iter()
        .map(|&status| {
            let mut cards: Vec<Appointment> = appointments
                .iter()
                .filter(|a| a.status == status)
                .cloned()
                .collect();
            cards.sort_by_key(|a| a.start_time);
            KanbanColumn {
                status,
                title: status.title(),
                count: cards.len(),
                cards,
            }
        })
        .collect()
}

/// Flat list, most recent start first.
pub fn table(appointments: &[Appointment]) -> Vec<Appointment> {
    let mut rows = appointments.to_vec();
    rows.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    rows
}

/* ============================================================
   Week calendar
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct CalendarWeek {
    pub week_start: NaiveDate,
    pub time_slots: Vec<String>,
    pub days: Vec<CalendarDay>,
}

#[derive(Debug, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub events: Vec<CalendarEvent>,
}

#[derive(Debug, Serialize)]
pub struct CalendarEvent {
    pub appointment_id: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub procedures: String,
    pub status: AppointmentStatus,
    /// Offset from midnight in hours on the 24-slot axis.
    pub top_hours: f64,
    pub duration_hours: f64,
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - TimeDelta::days(i64::from(date.weekday().num_days_from_monday()))
}

fn hour_of_day(t: NaiveDateTime) -> f64 {
    f64::from(t.hour()) + f64::from(t.minute()) / 60.0
}

/// Monday of the week `offset` weeks away from the one containing
/// `anchor`, provided the whole week is a representable date range.
fn shifted_week_start(anchor: NaiveDate, offset: i64) -> Option<NaiveDate> {
    let shift = offset.checked_mul(7).and_then(TimeDelta::try_days)?;
    let shifted = anchor.checked_add_signed(shift)?;
    let start =
        shifted.checked_sub_days(Days::new(u64::from(shifted.weekday().num_days_from_monday())))?;
    start.checked_add_days(Days::new(6))?;
    Some(start)
}

/// Seven-day grid for the week containing `anchor`, shifted by `offset`
/// whole weeks.
pub fn calendar_week(
    appointments: &[Appointment],
    procedures: &[Procedure],
    anchor: NaiveDate,
    offset: i64,
) -> Result<CalendarWeek, ScheduleError> {
    let start = shifted_week_start(anchor, offset).ok_or(ScheduleError::DateOutOfRange)?;
    let days = (0..7)
        .map(|i| {
            let date = start + TimeDelta::days(i);
            let mut day_appointments: Vec<&Appointment> = appointments
                .iter()
                .filter(|a| a.start_time.date() == date)
                .collect();
            day_appointments.sort_by_key(|a| a.start_time);
            let events = day_appointments
                .into_iter()
                .map(|a| {
                    let top = hour_of_day(a.start_time);
                    CalendarEvent {
                        appointment_id: a.id.clone(),
                        patient_name: a.patient.name.clone(),
                        doctor_name: a.doctor.name.clone(),
                        procedures: line_names(&a.procedures, procedures, "N/A").join(", "),
                        status: a.status,
                        top_hours: top,
                        duration_hours: hour_of_day(a.end_time) - top,
                    }
                })
                .collect();
            CalendarDay { date, events }
        })
        .collect();

    Ok(CalendarWeek {
        week_start: start,
        time_slots: (0..24).map(|h| format!("{h:02}:00")).collect(),
        days,
    })
}

/* ============================================================
   Form pricing
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct CandidateProcedure {
    pub procedure: Procedure,
    pub orcar: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valor: Option<f64>,
    /// Price the line starts with when added.
    pub default_valor_final: f64,
}

/// Fixed price, or 0 for quote-on-demand procedures.
pub fn default_line_price(offer: &DoctorProcedure) -> f64 {
    if offer.orcar {
        0.0
    } else {
        offer.valor.unwrap_or(0.0)
    }
}

/// Procedures the doctor is configured for that exist in the clinic and
/// are not already on the form.
pub fn candidate_procedures(doctor: &Doctor, procedures: &[Procedure], selected: &[String]) -> Vec<CandidateProcedure> {
    let taken: HashSet<&str> = selected.iter().map(String::as_str).collect();
    doctor
        .procedures
        .iter()
        .filter(|offer| !taken.contains(offer.procedure_id.as_str()))
        .filter_map(|offer| {
            let procedure = procedures.iter().find(|p| p.id == offer.procedure_id)?;
            Some(CandidateProcedure {
                procedure: procedure.clone(),
                orcar: offer.orcar,
                valor: offer.valor,
                default_valor_final: default_line_price(offer),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineRequest {
    #[serde(rename = "procedimentoId")]
    pub procedure_id: String,
    #[serde(rename = "valorFinal", default)]
    pub valor_final: Option<f64>,
}

/// Price every requested line. Fixed-price lines always take the doctor's
/// price; quoted lines take the submitted value (0 when omitted).
pub fn price_lines(doctor: &Doctor, lines: &[LineRequest]) -> Result<Vec<AppointmentProcedure>, ScheduleError> {
    if lines.is_empty() {
        return Err(ScheduleError::NoProcedures);
    }

    let mut seen = HashSet::new();
    let mut priced = Vec::with_capacity(lines.len());
    for req in lines {
        if !seen.insert(req.procedure_id.as_str()) {
            return Err(ScheduleError::Duplicate(req.procedure_id.clone()));
        }
        let offer = doctor
            .procedure(&req.procedure_id)
            .ok_or_else(|| ScheduleError::NotOffered(req.procedure_id.clone()))?;

        let valor_final = if offer.orcar {
            req.valor_final.unwrap_or(0.0)
        } else {
            default_line_price(offer)
        };
        if !valor_final.is_finite() || valor_final < 0.0 {
            return Err(ScheduleError::InvalidPrice(req.procedure_id.clone()));
        }

        priced.push(AppointmentProcedure {
            procedure_id: req.procedure_id.clone(),
            valor_final,
        });
    }
    Ok(priced)
}

pub fn total(lines: &[AppointmentProcedure]) -> f64 {
    lines.iter().map(|l| l.valor_final).sum()
}

pub fn resolve_end_time(start: NaiveDateTime, end: Option<NaiveDateTime>) -> Result<NaiveDateTime, ScheduleError> {
    let end = match end {
        Some(end) => end,
        None => start
            .checked_add_signed(TimeDelta::minutes(DEFAULT_DURATION_MINUTES))
            .ok_or(ScheduleError::DateOutOfRange)?,
    };
    if end <= start {
        return Err(ScheduleError::InvalidTimeRange);
    }
    Ok(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 20).unwrap()
    }

    fn store() -> Store {
        Store::seeded(today())
    }

    fn req(id: &str, valor: Option<f64>) -> LineRequest {
        LineRequest {
            procedure_id: id.into(),
            valor_final: valor,
        }
    }

    #[test]
    fn kanban_has_seven_ordered_columns() {
        let s = store();
        let cols = kanban(&s.appointments);
        let statuses: Vec<_> = cols.iter().map(|c| c.status).collect();
        assert_eq!(statuses, AppointmentStatus::ALL.to_vec());
        assert_eq!(cols[0].title, "Agendado");

        let done = &cols[3];
        assert_eq!(done.count, 2);
        assert!(done.cards[0].start_time <= done.cards[1].start_time);
        assert_eq!(cols.iter().map(|c| c.count).sum::<usize>(), s.appointments.len());
    }

    #[test]
    fn table_sorts_newest_first() {
        let rows = table(&store().appointments);
        assert!(rows.windows(2).all(|w| w[0].start_time >= w[1].start_time));
        assert_eq!(rows[0].id, "at5");
    }

    #[test]
    fn search_matches_procedure_names() {
        let s = store();
        let hits = search(&s.appointments, &s.procedures, Some("clareamento"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "at5");
        let by_doctor = search(&s.appointments, &s.procedures, Some("ANA SILVA"));
        assert_eq!(by_doctor.len(), 2);
        assert_eq!(search(&s.appointments, &s.procedures, Some("  ")).len(), 5);
    }

    #[test]
    fn week_starts_on_monday() {
        // 2024-06-20 is a Thursday, 2024-06-23 a Sunday.
        let monday = NaiveDate::from_ymd_opt(2024, 6, 17).unwrap();
        assert_eq!(week_start(today()), monday);
        assert_eq!(week_start(NaiveDate::from_ymd_opt(2024, 6, 23).unwrap()), monday);
        assert_eq!(week_start(monday), monday);
    }

    #[test]
    fn calendar_positions_events_by_hour() {
        let s = store();
        let week = calendar_week(&s.appointments, &s.procedures, today(), 0).unwrap();
        assert_eq!(week.time_slots.len(), 24);
        assert_eq!(week.time_slots[9], "09:00");
        assert_eq!(week.days.len(), 7);

        let thursday = &week.days[3];
        assert_eq!(thursday.date, today());
        let at2 = thursday.events.iter().find(|e| e.appointment_id == "at2").unwrap();
        assert_eq!(at2.top_hours, 10.5);
        assert_eq!(at2.duration_hours, 0.5);
        assert_eq!(at2.procedures, "Limpeza e Profilaxia");
    }

    #[test]
    fn calendar_navigation_moves_whole_weeks() {
        let s = store();
        let next = calendar_week(&s.appointments, &s.procedures, today(), 1).unwrap();
        assert_eq!(next.week_start, NaiveDate::from_ymd_opt(2024, 6, 24).unwrap());
        assert!(next.days.iter().all(|d| d.events.is_empty()));
        let prev = calendar_week(&s.appointments, &s.procedures, today(), -1).unwrap();
        assert_eq!(prev.week_start, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
    }

    #[test]
    fn calendar_rejects_offsets_beyond_the_date_range() {
        let s = store();
        for offset in [100_000_000_000, i64::MAX, i64::MIN, 20_000_000] {
            assert_eq!(
                calendar_week(&s.appointments, &s.procedures, today(), offset).map(|w| w.week_start),
                Err(ScheduleError::DateOutOfRange)
            );
        }
        let past_the_end = calendar_week(&s.appointments, &s.procedures, NaiveDate::MAX, 1);
        assert_eq!(past_the_end.map(|w| w.week_start), Err(ScheduleError::DateOutOfRange));
        let before_the_start = calendar_week(&s.appointments, &s.procedures, NaiveDate::MIN, -1);
        assert_eq!(before_the_start.map(|w| w.week_start), Err(ScheduleError::DateOutOfRange));
    }

    #[test]
    fn candidates_skip_selected_procedures() {
        let s = store();
        let ana = &s.doctors[0];
        let all = candidate_procedures(ana, &s.procedures, &[]);
        assert_eq!(all.len(), 2);
        let quoted = all.iter().find(|c| c.procedure.id == "proc4").unwrap();
        assert!(quoted.orcar);
        assert_eq!(quoted.default_valor_final, 0.0);

        let rest = candidate_procedures(ana, &s.procedures, &["proc3".to_string()]);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].procedure.id, "proc4");
    }

    #[test]
    fn fixed_lines_use_doctor_price_and_quoted_lines_are_editable() {
        let s = store();
        let ana = &s.doctors[0];
        let lines = price_lines(ana, &[req("proc3", Some(1.0)), req("proc4", Some(320.0))]).unwrap();
        assert_eq!(lines[0].valor_final, 150.0);
        assert_eq!(lines[1].valor_final, 320.0);
        assert_eq!(total(&lines), 470.0);

        let defaulted = price_lines(ana, &[req("proc4", None)]).unwrap();
        assert_eq!(defaulted[0].valor_final, 0.0);
    }

    #[test]
    fn pricing_rejects_bad_lines() {
        let s = store();
        let ana = &s.doctors[0];
        assert_eq!(price_lines(ana, &[]), Err(ScheduleError::NoProcedures));
        assert_eq!(
            price_lines(ana, &[req("proc1", None)]),
            Err(ScheduleError::NotOffered("proc1".into()))
        );
        assert_eq!(
            price_lines(ana, &[req("proc3", None), req("proc3", None)]),
            Err(ScheduleError::Duplicate("proc3".into()))
        );
        assert_eq!(
            price_lines(ana, &[req("proc4", Some(-5.0))]),
            Err(ScheduleError::InvalidPrice("proc4".into()))
        );
        assert!(price_lines(ana, &[req("proc4", Some(f64::NAN))]).is_err());
    }

    #[test]
    fn end_time_defaults_to_thirty_minutes() {
        let start = today().and_hms_opt(9, 0, 0).unwrap();
        assert_eq!(resolve_end_time(start, None).unwrap(), today().and_hms_opt(9, 30, 0).unwrap());
        assert_eq!(resolve_end_time(start, Some(start)), Err(ScheduleError::InvalidTimeRange));
    }

    #[test]
    fn end_time_default_cannot_overflow() {
        assert_eq!(resolve_end_time(NaiveDateTime::MAX, None), Err(ScheduleError::DateOutOfRange));
    }

    #[test]
    fn rule_violations_name_the_procedure() {
        assert_eq!(
            ScheduleError::InvalidPrice("proc4".into()).to_string(),
            "O procedimento proc4 precisa de um valor final válido e positivo."
        );
        assert_eq!(
            ScheduleError::NotOffered("proc1".into()).to_string(),
            "O procedimento proc1 não é realizado por este doutor."
        );
    }
}
