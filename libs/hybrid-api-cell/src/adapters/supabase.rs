use anyhow::{Error, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use shared_models::auth::{User, UserRole};
use shared_models::clinic::{Appointment, AppointmentStatus, Doctor, Patient, TimeSlot};

#[derive(Debug, Clone, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeSlotRow {
    pub id: String,
    pub doctor_id: String,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub is_available: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorRow {
    pub id: String,
    pub user_id: String,
    pub specialization: String,
    pub experience: u32,
    pub qualifications: Option<String>,
    pub consultation_fee: f64,
    pub bio: Option<String>,
    pub users: Option<UserRow>,
    #[serde(default)]
    pub time_slots: Vec<TimeSlotRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientRow {
    pub id: String,
    pub user_id: String,
    pub date_of_birth: NaiveDate,
    pub medical_history: Option<String>,
    pub users: Option<UserRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentRow {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub appointment_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub status: AppointmentStatus,
    pub reason: String,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub patients: Option<PatientRow>,
    pub doctors: Option<DoctorRow>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone.unwrap_or_default(),
            role: row.role,
            created_at: row.created_at,
        }
    }
}

impl From<TimeSlotRow> for TimeSlot {
    fn from(row: TimeSlotRow) -> Self {
        TimeSlot {
            id: row.id,
            doctor_id: row.doctor_id,
            day_of_week: row.day_of_week,
            start_time: row.start_time,
            end_time: row.end_time,
            is_available: row.is_available,
        }
    }
}

impl TryFrom<DoctorRow> for Doctor {
    type Error = Error;

    fn try_from(row: DoctorRow) -> Result<Self, Self::Error> {
        let user = row
            .users
            .ok_or_else(|| anyhow!("Doctor {} has no user record (user_id {})", row.id, row.user_id))?;

        Ok(Doctor {
            id: row.id,
            user: user.into(),
            specialization: row.specialization,
            experience: row.experience,
            qualifications: row.qualifications.unwrap_or_default(),
            consultation_fee: row.consultation_fee,
            bio: row.bio,
            availability: row.time_slots.into_iter().map(TimeSlot::from).collect(),
        })
    }
}

impl TryFrom<PatientRow> for Patient {
    type Error = Error;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let user = row
            .users
            .ok_or_else(|| anyhow!("Patient {} has no user record (user_id {})", row.id, row.user_id))?;

        Ok(Patient {
            id: row.id,
            user: user.into(),
            date_of_birth: row.date_of_birth,
            medical_history: row.medical_history,
        })
    }
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = Error;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: row.id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            appointment_date: row.appointment_date,
            start_time: row.start_time,
            end_time: row.end_time,
            status: row.status,
            reason: row.reason,
            notes: row.notes,
            created_at: row.created_at,
            patient: row.patients.map(Patient::try_from).transpose()?,
            doctor: row.doctors.map(Doctor::try_from).transpose()?,
        })
    }
}
