use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use shared_models::auth::{User, UserRole};
use shared_models::clinic::{Appointment, AppointmentStatus, AvailableSlot, Doctor, Patient, TimeSlot};

use crate::models::DjangoSession;

// Django primary keys are integers; Supabase ids are uuids. Both end up as
// strings in the canonical model.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Int(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

fn optional_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

// DRF renders DecimalField as a string ("100.00").
fn decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDecimal {
        Number(f64),
        Text(String),
    }

    match RawDecimal::deserialize(deserializer)? {
        RawDecimal::Number(n) => Ok(n),
        RawDecimal::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// List endpoints answer with a bare array, or with a DRF page when
/// pagination is switched on server-side.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DjangoList<T> {
    Plain(Vec<T>),
    Page { results: Vec<T> },
}

impl<T> DjangoList<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            DjangoList::Plain(items) => items,
            DjangoList::Page { results } => results,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DjangoUser {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: UserRole,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DjangoAuthResponse {
    pub user: DjangoUser,
    pub access_token: String,
}

/// simplejwt answers a refresh with `access`; the auth views use `access_token`.
#[derive(Debug, Clone, Deserialize)]
pub struct DjangoTokenRefresh {
    #[serde(alias = "access")]
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DjangoTimeSlot {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "optional_id_string")]
    pub doctor_id: Option<String>,
    #[serde(default, deserialize_with = "optional_id_string")]
    pub doctor: Option<String>,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub is_available: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DjangoDoctor {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub user: DjangoUser,
    pub specialization: String,
    pub experience: u32,
    #[serde(default)]
    pub qualifications: String,
    #[serde(deserialize_with = "decimal")]
    pub consultation_fee: f64,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub time_slots: Vec<DjangoTimeSlot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DjangoPatient {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub user: DjangoUser,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub medical_history: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DjangoAppointment {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "optional_id_string")]
    pub patient_id: Option<String>,
    #[serde(default, deserialize_with = "optional_id_string")]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub patient: Option<DjangoPatient>,
    #[serde(default)]
    pub doctor: Option<DjangoDoctor>,
    pub appointment_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub status: AppointmentStatus,
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DjangoCancelResponse {
    pub message: String,
    pub appointment: DjangoAppointment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DjangoAvailability {
    pub date: NaiveDate,
    pub doctor: String,
    pub available_slots: Vec<AvailableSlot>,
}

impl From<DjangoUser> for User {
    fn from(user: DjangoUser) -> Self {
        User {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone.unwrap_or_default(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

impl From<DjangoAuthResponse> for DjangoSession {
    fn from(response: DjangoAuthResponse) -> Self {
        DjangoSession {
            user: response.user.into(),
            access_token: response.access_token,
        }
    }
}

impl DjangoTimeSlot {
    /// The slot serializer omits the owner, so the caller supplies it when
    /// the payload does not.
    pub fn into_time_slot(self, owner: &str) -> TimeSlot {
        TimeSlot {
            doctor_id: self.doctor_id.or(self.doctor).unwrap_or_else(|| owner.to_string()),
            id: self.id,
            day_of_week: self.day_of_week,
            start_time: self.start_time,
            end_time: self.end_time,
            is_available: self.is_available,
        }
    }
}

impl From<DjangoDoctor> for Doctor {
    fn from(doctor: DjangoDoctor) -> Self {
        let availability = doctor
            .time_slots
            .into_iter()
            .map(|slot| slot.into_time_slot(&doctor.id))
            .collect();

        Doctor {
            id: doctor.id,
            user: doctor.user.into(),
            specialization: doctor.specialization,
            experience: doctor.experience,
            qualifications: doctor.qualifications,
            consultation_fee: doctor.consultation_fee,
            bio: doctor.bio,
            availability,
        }
    }
}

impl From<DjangoPatient> for Patient {
    fn from(patient: DjangoPatient) -> Self {
        Patient {
            id: patient.id,
            user: patient.user.into(),
            date_of_birth: patient.date_of_birth,
            medical_history: patient.medical_history,
        }
    }
}

impl From<DjangoAppointment> for Appointment {
    fn from(row: DjangoAppointment) -> Self {
        let patient: Option<Patient> = row.patient.map(Patient::from);
        let doctor: Option<Doctor> = row.doctor.map(Doctor::from);

        Appointment {
            id: row.id,
            patient_id: row
                .patient_id
                .or_else(|| patient.as_ref().map(|p| p.id.clone()))
                .unwrap_or_default(),
            doctor_id: row
                .doctor_id
                .or_else(|| doctor.as_ref().map(|d| d.id.clone()))
                .unwrap_or_default(),
            appointment_date: row.appointment_date,
            start_time: row.start_time,
            end_time: row.end_time,
            status: row.status,
            reason: row.reason,
            notes: row.notes,
            created_at: row.created_at,
            patient,
            doctor,
        }
    }
}
