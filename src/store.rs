use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    Agent, AgentStatus, Appointment, AppointmentProcedure, AppointmentStatus, Clinic, Doctor,
    DoctorProcedure, Identified, Patient, Procedure, Specialty, Tenanted, Transaction,
    TransactionKind, UserRole,
};

#[derive(Debug, Clone, Default)]
pub struct Store {
    pub clinics: Vec<Clinic>,
    pub specialties: Vec<Specialty>,
    pub procedures: Vec<Procedure>,
    pub doctors: Vec<Doctor>,
    pub patients: Vec<Patient>,
    pub appointments: Vec<Appointment>,
    pub agents: Vec<Agent>,
    /// Manually entered ledger rows. Appointment revenue is derived.
    pub transactions: Vec<Transaction>,
}

/// Everything visible while one clinic is selected.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TenantSlice {
    pub specialties: Vec<Specialty>,
    pub procedures: Vec<Procedure>,
    pub doctors: Vec<Doctor>,
    pub patients: Vec<Patient>,
    pub appointments: Vec<Appointment>,
    pub agents: Vec<Agent>,
    pub transactions: Vec<Transaction>,
}

/// Rows of `items` owned by `clinic_id`; nothing when no clinic is selected.
pub fn scoped<T: Tenanted + Clone>(items: &[T], clinic_id: Option<&str>) -> Vec<T> {
    match clinic_id {
        Some(id) => items.iter().filter(|r| r.clinic_id() == id).cloned().collect(),
        None => Vec::new(),
    }
}

pub fn find_in<'a, T: Tenanted + Identified>(items: &'a [T], clinic_id: &str, id: &str) -> Option<&'a T> {
    items.iter().find(|r| r.id() == id && r.clinic_id() == clinic_id)
}

/// Replace the record with the same id. Returns false when it is unknown.
pub fn replace<T: Identified>(items: &mut [T], record: T) -> bool {
    match items.iter_mut().find(|r| r.id() == record.id()) {
        Some(slot) => {
            *slot = record;
            true
        }
        None => false,
    }
}

/// Newest records are listed first.
pub fn insert_front<T>(items: &mut Vec<T>, record: T) {
    items.insert(0, record);
}

/// Temporary id for a record created on this side.
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

impl Store {
    pub fn tenant_slice(&self, clinic_id: Option<&str>) -> TenantSlice {
        TenantSlice {
            specialties: scoped(&self.specialties, clinic_id),
            procedures: scoped(&self.procedures, clinic_id),
            doctors: scoped(&self.doctors, clinic_id),
            patients: scoped(&self.patients, clinic_id),
            appointments: scoped(&self.appointments, clinic_id),
            agents: scoped(&self.agents, clinic_id),
            transactions: scoped(&self.transactions, clinic_id),
        }
    }

    pub fn clinic(&self, id: &str) -> Option<&Clinic> {
        self.clinics.iter().find(|c| c.id == id)
    }

    /// Mock data. Appointments and expenses are placed relative to `today`.
    pub fn seeded(today: NaiveDate) -> Self {
        let clinics = vec![
            clinic("cli1", "Odonto+ Matriz", "12.345.678/0001-99", "Av. Principal, 500, Centro", "(11) 5555-1234"),
            clinic("cli2", "Odonto+ Filial Sul", "12.345.678/0002-80", "Rua das Palmeiras, 10, Bairro Sul", "(11) 5555-5678"),
        ];

        let general = "Tratamentos de rotina, limpezas e pequenas restaurações.";
        let specialties = vec![
            specialty("esp1", "Ortodontia", "Correção da posição dos dentes e dos ossos maxilares.", "cli1"),
            specialty("esp2", "Clínica Geral", general, "cli1"),
            specialty("esp3", "Clínica Geral", general, "cli2"),
        ];

        let cleaning = "Remoção de tártaro e placa bacteriana.";
        let procedures = vec![
            procedure("proc1", "Limpeza e Profilaxia", cleaning, "esp2", "cli1"),
            procedure("proc2", "Clareamento Dental", "Procedimento estético para clarear os dentes.", "esp2", "cli1"),
            procedure("proc3", "Manutenção de Aparelho", "Ajuste e manutenção de aparelho ortodôntico.", "esp1", "cli1"),
            procedure("proc4", "Avaliação Ortodôntica", "Avaliação para uso de aparelho.", "esp1", "cli1"),
            procedure("proc5", "Limpeza e Profilaxia", cleaning, "esp3", "cli2"),
        ];

        let doctors = vec![
            Doctor {
                id: "doc1".into(),
                name: "Dr. Ana Silva".into(),
                specialty: specialties[0].clone(),
                procedures: vec![fixed("proc3", 150.0), quoted("proc4")],
                avatar_url: "https://i.pravatar.cc/100?u=ana".into(),
                clinic_id: "cli1".into(),
            },
            Doctor {
                id: "doc2".into(),
                name: "Dr. Carlos Souza".into(),
                specialty: specialties[1].clone(),
                procedures: vec![fixed("proc1", 200.0), fixed("proc2", 500.0)],
                avatar_url: "https://i.pravatar.cc/100?u=carlos".into(),
                clinic_id: "cli1".into(),
            },
            Doctor {
                id: "doc3".into(),
                name: "Dr. Joana Lima".into(),
                specialty: specialties[2].clone(),
                procedures: vec![fixed("proc5", 220.0)],
                avatar_url: "https://i.pravatar.cc/100?u=joana".into(),
                clinic_id: "cli2".into(),
            },
        ];

        let patients = vec![
            Patient {
                id: "pat1".into(),
                name: "João Pereira".into(),
                phone: "(11) 98765-4321".into(),
                cpf: Some("123.456.789-00".into()),
                address: Some("Rua das Flores, 123, São Paulo, SP".into()),
                last_visit: "20/06/2024".into(),
                clinic_id: "cli1".into(),
            },
            Patient {
                id: "pat2".into(),
                name: "Maria Oliveira".into(),
                phone: "(21) 91234-5678".into(),
                cpf: None,
                address: None,
                last_visit: "15/06/2024".into(),
                clinic_id: "cli1".into(),
            },
            Patient {
                id: "pat3".into(),
                name: "Pedro Costa".into(),
                phone: "(31) 99999-8888".into(),
                cpf: None,
                address: None,
                last_visit: "01/06/2024".into(),
                clinic_id: "cli2".into(),
            },
        ];

        let yesterday = today - Duration::days(1);
        let two_days_ago = today - Duration::days(2);
        let appointments = vec![
            appointment("at1", &patients[0], &doctors[0], vec![line("proc3", 150.0)], at(today, 9, 0), at(today, 10, 0), AppointmentStatus::Confirmed),
            appointment("at2", &patients[1], &doctors[1], vec![line("proc1", 200.0)], at(today, 10, 30), at(today, 11, 0), AppointmentStatus::Scheduled),
            appointment("at3", &patients[2], &doctors[2], vec![line("proc5", 220.0)], at(yesterday, 14, 0), at(yesterday, 15, 0), AppointmentStatus::Completed),
            appointment("at4", &patients[1], &doctors[0], vec![line("proc3", 150.0)], at(two_days_ago, 11, 0), at(two_days_ago, 12, 0), AppointmentStatus::NoShow),
            appointment("at5", &patients[0], &doctors[1], vec![line("proc1", 200.0), line("proc2", 500.0)], at(today, 14, 0), at(today, 14, 30), AppointmentStatus::Completed),
        ];

        let agents = vec![
            agent("age1", "Admin Matriz", "admin@odonto.com", UserRole::Admin, "cli1"),
            agent("age2", "Secretária Matriz", "user@odonto.com", UserRole::User, "cli1"),
            agent("age3", "Admin Filial Sul", "admin.sul@odonto.com", UserRole::Admin, "cli2"),
        ];

        let first = today.with_day0(0).unwrap_or(today);
        let fifth = today.with_day0(4).unwrap_or(today);
        let transactions = vec![
            expense("t1", "Aluguel do Consultório", 2500.0, first, "Custos Fixos"),
            expense("t2", "Compra de Material", 850.0, fifth, "Material de Consumo"),
            expense("t3", "Salários", 8000.0, fifth, "Recursos Humanos"),
        ];

        Self {
            clinics,
            specialties,
            procedures,
            doctors,
            patients,
            appointments,
            agents,
            transactions,
        }
    }
}

fn at(day: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    day.and_time(NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN))
}

fn clinic(id: &str, name: &str, cnpj: &str, address: &str, phone: &str) -> Clinic {
    Clinic {
        id: id.into(),
        name: name.into(),
        cnpj: cnpj.into(),
        address: address.into(),
        phone: phone.into(),
    }
}

fn specialty(id: &str, name: &str, description: &str, clinic_id: &str) -> Specialty {
    Specialty {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        clinic_id: clinic_id.into(),
    }
}

fn procedure(id: &str, name: &str, description: &str, specialty_id: &str, clinic_id: &str) -> Procedure {
    Procedure {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        specialty_id: specialty_id.into(),
        clinic_id: clinic_id.into(),
    }
}

fn fixed(procedure_id: &str, valor: f64) -> DoctorProcedure {
    DoctorProcedure {
        procedure_id: procedure_id.into(),
        orcar: false,
        valor: Some(valor),
    }
}

fn quoted(procedure_id: &str) -> DoctorProcedure {
    DoctorProcedure {
        procedure_id: procedure_id.into(),
        orcar: true,
        valor: None,
    }
}

fn line(procedure_id: &str, valor_final: f64) -> AppointmentProcedure {
    AppointmentProcedure {
        procedure_id: procedure_id.into(),
        valor_final,
    }
}

fn appointment(
    id: &str,
    patient: &Patient,
    doctor: &Doctor,
    procedures: Vec<AppointmentProcedure>,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    status: AppointmentStatus,
) -> Appointment {
    let valor_final = procedures.iter().map(|p| p.valor_final).sum();
    Appointment {
        id: id.into(),
        patient: patient.clone(),
        doctor: doctor.clone(),
        procedures,
        start_time,
        end_time,
        status,
        valor_final,
        clinic_id: patient.clinic_id.clone(),
    }
}

fn agent(id: &str, full_name: &str, email: &str, role: UserRole, clinic_id: &str) -> Agent {
    Agent {
        id: id.into(),
        full_name: full_name.into(),
        email: email.into(),
        role,
        status: AgentStatus::Active,
        clinic_id: clinic_id.into(),
    }
}

fn expense(id: &str, description: &str, amount: f64, day: NaiveDate, category: &str) -> Transaction {
    Transaction {
        id: id.into(),
        description: description.into(),
        amount,
        kind: TransactionKind::Expense,
        date: at(day, 0, 0),
        category: category.into(),
        appointment_id: None,
        clinic_id: "cli1".into(),
    }
}
