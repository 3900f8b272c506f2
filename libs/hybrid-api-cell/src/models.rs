use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shared_database::supabase::{AuthSession, AuthUser};
use shared_models::auth::{User, UserRole};
use shared_models::clinic::AppointmentStatus;

use crate::availability::parse_wall_clock;

/// Which backend answered a dispatched call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Supabase,
    Django,
}

/// A canonical payload tagged with the backend that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Served<T> {
    pub via: Backend,
    pub payload: T,
}

impl<T> Served<T> {
    pub fn supabase(payload: T) -> Self {
        Self { via: Backend::Supabase, payload }
    }

    pub fn django(payload: T) -> Self {
        Self { via: Backend::Django, payload }
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

/// Session issued by the Django API: the user record and its bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct DjangoSession {
    pub user: User,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SupabaseSignIn {
    pub profile: User,
    pub session: AuthSession,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SupabaseSignUp {
    pub user: Option<AuthUser>,
    pub session: Option<AuthSession>,
}

/// Current Supabase session together with the profile row it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub user: AuthUser,
    pub profile: User,
    pub session: Option<AuthSession>,
}

/// Result of login/register. Each variant carries its own backend's payload.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome<S> {
    Supabase(S),
    Django(DjangoSession),
}

impl<S> AuthOutcome<S> {
    pub fn via(&self) -> Backend {
        match self {
            AuthOutcome::Supabase(_) => Backend::Supabase,
            AuthOutcome::Django(_) => Backend::Django,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoctorFilters {
    pub specialization: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentFilters {
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    pub role: UserRole,
    pub specialization: Option<String>,
    pub experience: Option<u32>,
    pub qualifications: Option<String>,
    pub consultation_fee: Option<f64>,
    pub date_of_birth: Option<NaiveDate>,
    pub medical_history: Option<String>,
}

impl Registration {
    pub fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err("A valid email is required".to_string());
        }
        if self.password.is_empty() {
            return Err("Password is required".to_string());
        }
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err("First and last name are required".to_string());
        }
        match self.role {
            UserRole::Doctor => {
                if self.specialization.as_deref().map_or(true, |s| s.trim().is_empty()) {
                    return Err("Doctors must provide a specialization".to_string());
                }
                if self.consultation_fee.is_some_and(|fee| fee < 0.0) {
                    return Err("Consultation fee cannot be negative".to_string());
                }
            }
            UserRole::Patient => {
                if self.date_of_birth.is_none() {
                    return Err("Patients must provide a date of birth".to_string());
                }
            }
            UserRole::Admin => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.phone.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: String,
    pub doctor_id: String,
    pub appointment_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub reason: String,
}

impl NewAppointment {
    pub fn validate(&self) -> Result<(), String> {
        if self.reason.trim().is_empty() {
            return Err("A reason for the appointment is required".to_string());
        }
        if self.doctor_id.trim().is_empty() {
            return Err("A doctor must be selected".to_string());
        }
        validate_time_range(&self.start_time, &self.end_time)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AppointmentUpdate {
    pub fn cancellation() -> Self {
        Self {
            status: Some(AppointmentStatus::Cancelled),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.reason.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err("Reason cannot be empty".to_string());
        }
        match (&self.start_time, &self.end_time) {
            (Some(start), Some(end)) => validate_time_range(start, end),
            (Some(t), None) | (None, Some(t)) => parse_wall_clock(t)
                .map(|_| ())
                .ok_or_else(|| format!("Invalid time: {}", t)),
            (None, None) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTimeSlot {
    pub doctor_id: String,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

impl NewTimeSlot {
    pub fn validate(&self) -> Result<(), String> {
        if self.day_of_week > 6 {
            return Err("Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string());
        }
        validate_time_range(&self.start_time, &self.end_time)
    }
}

/// Partial change to an existing slot; only the fields that are set travel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSlotUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
}

impl TimeSlotUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.day_of_week.is_some_and(|day| day > 6) {
            return Err("Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string());
        }
        match (&self.start_time, &self.end_time) {
            (Some(start), Some(end)) => validate_time_range(start, end),
            (Some(t), None) | (None, Some(t)) => parse_wall_clock(t)
                .map(|_| ())
                .ok_or_else(|| format!("Invalid time: {}", t)),
            (None, None) => Ok(()),
        }
    }
}

fn default_true() -> bool {
    true
}

fn validate_time_range(start: &str, end: &str) -> Result<(), String> {
    let start_time = parse_wall_clock(start).ok_or_else(|| format!("Invalid start time: {}", start))?;
    let end_time = parse_wall_clock(end).ok_or_else(|| format!("Invalid end time: {}", end))?;
    if start_time >= end_time {
        return Err("Start time must be before end time".to_string());
    }
    Ok(())
}
