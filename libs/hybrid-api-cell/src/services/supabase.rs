use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_database::supabase::SupabaseClient;
use shared_models::auth::{User, UserRole};
use shared_models::clinic::{Appointment, AvailableSlot, Doctor, TimeSlot};

use crate::adapters::supabase::{AppointmentRow, DoctorRow, TimeSlotRow, UserRow};
use crate::availability::{day_of_week, expand_slots};
use crate::models::{
    AppointmentFilters, AppointmentUpdate, CurrentUser, DoctorFilters, NewAppointment,
    NewTimeSlot, ProfileUpdate, Registration, SupabaseSignIn, SupabaseSignUp, TimeSlotUpdate,
};

const DOCTOR_SELECT: &str = "*,users!inner(*)";
const APPOINTMENT_SELECT: &str = "*,patients!inner(*,users!inner(*)),doctors!inner(*,users!inner(*))";

/// Backend A: the hosted Postgres + auth project, reached through PostgREST
/// and GoTrue.
pub struct SupabaseService {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Creates the auth user, then its `users` row and the role-specific
    /// row. The three writes are independent; a failure part-way leaves the
    /// earlier ones in place.
    pub async fn sign_up(&self, registration: &Registration) -> Result<SupabaseSignUp> {
        debug!("Registering {} as {}", registration.email, registration.role);

        let auth = self.supabase.sign_up(&registration.email, &registration.password).await?;

        if let Some(user) = &auth.user {
            let _: Vec<Value> = self.supabase.rest(
                Method::POST,
                "/rest/v1/users",
                Some(json!({
                    "id": user.id,
                    "email": registration.email,
                    "first_name": registration.first_name,
                    "last_name": registration.last_name,
                    "phone": registration.phone,
                    "role": registration.role,
                })),
            ).await?;

            match registration.role {
                UserRole::Doctor => {
                    let _: Vec<Value> = self.supabase.rest(
                        Method::POST,
                        "/rest/v1/doctors",
                        Some(json!({
                            "user_id": user.id,
                            "specialization": registration.specialization,
                            "experience": registration.experience.unwrap_or(0),
                            "qualifications": registration.qualifications.clone().unwrap_or_default(),
                            "consultation_fee": registration.consultation_fee.unwrap_or(100.0),
                        })),
                    ).await?;
                }
                UserRole::Patient => {
                    let _: Vec<Value> = self.supabase.rest(
                        Method::POST,
                        "/rest/v1/patients",
                        Some(json!({
                            "user_id": user.id,
                            "date_of_birth": registration.date_of_birth,
                            "medical_history": registration.medical_history,
                        })),
                    ).await?;
                }
                UserRole::Admin => {}
            }
        }

        Ok(SupabaseSignUp {
            user: auth.user,
            session: auth.session,
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SupabaseSignIn> {
        debug!("Signing in {}", email);

        let session = self.supabase.sign_in_with_password(email, password).await?;
        let profile = self.get_profile(&session.user.id).await?;

        Ok(SupabaseSignIn { profile, session })
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.supabase.sign_out().await
    }

    pub async fn get_current_user(&self) -> Result<Option<CurrentUser>> {
        let Some(user) = self.supabase.get_user().await? else {
            return Ok(None);
        };

        let profile = self.get_profile(&user.id).await?;
        let session = self.supabase.current_session().await;

        Ok(Some(CurrentUser { user, profile, session }))
    }

    /// Like `get_current_user`, but a signed-in user with no `users` row
    /// yields `Ok(None)` rather than an error.
    pub async fn find_current_user(&self) -> Result<Option<CurrentUser>> {
        let Some(user) = self.supabase.get_user().await? else {
            return Ok(None);
        };

        let Some(profile) = self.find_profile(&user.id).await? else {
            debug!("No profile row for auth user {}", user.id);
            return Ok(None);
        };
        let session = self.supabase.current_session().await;

        Ok(Some(CurrentUser { user, profile, session }))
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<User> {
        self.find_profile(user_id)
            .await?
            .ok_or_else(|| anyhow!("Profile not found for user {}", user_id))
    }

    pub async fn find_profile(&self, user_id: &str) -> Result<Option<User>> {
        let path = format!("/rest/v1/users?select=*&id=eq.{}", urlencoding::encode(user_id));
        let rows: Vec<UserRow> = self.supabase.rest(Method::GET, &path, None).await?;

        Ok(rows.into_iter().next().map(User::from))
    }

    pub async fn update_profile(&self, user_id: &str, changes: &ProfileUpdate) -> Result<User> {
        let path = format!("/rest/v1/users?id=eq.{}", urlencoding::encode(user_id));
        let rows: Vec<UserRow> = self.supabase.rest(
            Method::PATCH,
            &path,
            Some(serde_json::to_value(changes)?),
        ).await?;

        rows.into_iter()
            .next()
            .map(User::from)
            .ok_or_else(|| anyhow!("Failed to update profile for user {}", user_id))
    }

    pub async fn get_doctors(&self, filters: &DoctorFilters) -> Result<Vec<Doctor>> {
        debug!("Searching doctors with filters: {:?}", filters);

        let mut query_parts = vec![format!("select={}", DOCTOR_SELECT)];

        if let Some(specialization) = filters.specialization.as_deref().filter(|s| !s.is_empty()) {
            query_parts.push(format!("specialization=eq.{}", urlencoding::encode(specialization)));
        }
        if let Some(search) = filters.search.as_deref().filter(|s| !s.is_empty()) {
            let term = urlencoding::encode(search);
            query_parts.push(format!(
                "or=(users.first_name.ilike.*{term}*,users.last_name.ilike.*{term}*,specialization.ilike.*{term}*)"
            ));
        }

        let path = format!("/rest/v1/doctors?{}", query_parts.join("&"));
        let rows: Vec<DoctorRow> = self.supabase.rest(Method::GET, &path, None).await?;

        rows.into_iter().map(Doctor::try_from).collect()
    }

    pub async fn get_doctor_by_id(&self, doctor_id: &str) -> Result<Doctor> {
        let path = format!(
            "/rest/v1/doctors?select={},time_slots(*)&id=eq.{}",
            DOCTOR_SELECT,
            urlencoding::encode(doctor_id)
        );
        let rows: Vec<DoctorRow> = self.supabase.rest(Method::GET, &path, None).await?;

        let row = rows.into_iter().next().ok_or_else(|| anyhow!("Doctor not found"))?;
        Doctor::try_from(row)
    }

    pub async fn get_appointments(
        &self,
        user_id: &str,
        role: UserRole,
        filters: &AppointmentFilters,
    ) -> Result<Vec<Appointment>> {
        debug!("Fetching appointments for {} ({})", user_id, role);

        let mut query_parts = vec![format!("select={}", APPOINTMENT_SELECT)];
        let user_id = urlencoding::encode(user_id);

        match role {
            UserRole::Patient => query_parts.push(format!("patients.user_id=eq.{}", user_id)),
            UserRole::Doctor => query_parts.push(format!("doctors.user_id=eq.{}", user_id)),
            UserRole::Admin => {}
        }

        if let Some(status) = filters.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(date) = filters.date {
            query_parts.push(format!("appointment_date=eq.{}", date));
        }
        query_parts.push("order=appointment_date.asc".to_string());

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        let rows: Vec<AppointmentRow> = self.supabase.rest(Method::GET, &path, None).await?;

        rows.into_iter().map(Appointment::try_from).collect()
    }

    pub async fn create_appointment(&self, request: &NewAppointment) -> Result<Appointment> {
        debug!("Creating appointment with doctor {} on {}", request.doctor_id, request.appointment_date);

        let rows: Vec<AppointmentRow> = self.supabase.rest(
            Method::POST,
            "/rest/v1/appointments",
            Some(json!({
                "patient_id": request.patient_id,
                "doctor_id": request.doctor_id,
                "appointment_date": request.appointment_date,
                "start_time": request.start_time,
                "end_time": request.end_time,
                "reason": request.reason,
                "status": "pending",
            })),
        ).await?;

        let row = rows.into_iter().next().ok_or_else(|| anyhow!("Failed to create appointment"))?;
        Appointment::try_from(row)
    }

    pub async fn update_appointment(&self, appointment_id: &str, changes: &AppointmentUpdate) -> Result<Appointment> {
        debug!("Updating appointment {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", urlencoding::encode(appointment_id));
        let rows: Vec<AppointmentRow> = self.supabase.rest(
            Method::PATCH,
            &path,
            Some(serde_json::to_value(changes)?),
        ).await?;

        let row = rows.into_iter().next().ok_or_else(|| anyhow!("Appointment not found"))?;
        Appointment::try_from(row)
    }

    pub async fn get_time_slots(&self, doctor_id: &str) -> Result<Vec<TimeSlot>> {
        let path = format!(
            "/rest/v1/time_slots?select=*&doctor_id=eq.{}&order=day_of_week.asc,start_time.asc",
            urlencoding::encode(doctor_id)
        );
        let rows: Vec<TimeSlotRow> = self.supabase.rest(Method::GET, &path, None).await?;

        Ok(rows.into_iter().map(TimeSlot::from).collect())
    }

    pub async fn create_time_slot(&self, request: &NewTimeSlot) -> Result<TimeSlot> {
        let rows: Vec<TimeSlotRow> = self.supabase.rest(
            Method::POST,
            "/rest/v1/time_slots",
            Some(serde_json::to_value(request)?),
        ).await?;

        rows.into_iter()
            .next()
            .map(TimeSlot::from)
            .ok_or_else(|| anyhow!("Failed to create time slot"))
    }

    pub async fn update_time_slot(&self, doctor_id: &str, slot_id: &str, changes: &TimeSlotUpdate) -> Result<TimeSlot> {
        let path = format!(
            "/rest/v1/time_slots?id=eq.{}&doctor_id=eq.{}",
            urlencoding::encode(slot_id),
            urlencoding::encode(doctor_id)
        );
        let rows: Vec<TimeSlotRow> = self.supabase.rest(
            Method::PATCH,
            &path,
            Some(serde_json::to_value(changes)?),
        ).await?;

        rows.into_iter()
            .next()
            .map(TimeSlot::from)
            .ok_or_else(|| anyhow!("Time slot {} not found", slot_id))
    }

    pub async fn get_doctor_availability(&self, doctor_id: &str, date: NaiveDate) -> Result<Vec<AvailableSlot>> {
        let path = format!(
            "/rest/v1/time_slots?select=*&doctor_id=eq.{}&day_of_week=eq.{}&is_available=eq.true&order=start_time.asc",
            urlencoding::encode(doctor_id),
            day_of_week(date)
        );
        let rows: Vec<TimeSlotRow> = self.supabase.rest(Method::GET, &path, None).await?;
        let slots: Vec<TimeSlot> = rows.into_iter().map(TimeSlot::from).collect();

        Ok(expand_slots(date, &slots))
    }
}
