use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_database::django::DjangoClient;
use shared_models::auth::User;
use shared_models::clinic::{Appointment, AvailableSlot, Doctor, TimeSlot};

use crate::adapters::django::{
    DjangoAppointment, DjangoAuthResponse, DjangoAvailability, DjangoCancelResponse, DjangoDoctor,
    DjangoList, DjangoTimeSlot, DjangoTokenRefresh, DjangoUser,
};
use crate::models::{
    AppointmentFilters, AppointmentUpdate, DjangoSession, DoctorFilters, NewAppointment,
    NewTimeSlot, ProfileUpdate, Registration, TimeSlotUpdate,
};

/// Backend B: the Django REST API. Besides mirroring Backend A it owns the
/// e-mail notification endpoints.
pub struct DjangoApiService {
    django: Arc<DjangoClient>,
}

fn query_string(params: &[(&str, Option<String>)]) -> String {
    let pairs: Vec<String> = params
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}={}", key, urlencoding::encode(v)))
        })
        .collect();

    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

impl DjangoApiService {
    pub fn new(django: Arc<DjangoClient>) -> Self {
        Self { django }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<DjangoSession> {
        let response: DjangoAuthResponse = self.django.request(
            Method::POST,
            "/auth/login/",
            Some(json!({ "email": email, "password": password })),
        ).await?;

        Ok(response.into())
    }

    pub async fn register(&self, registration: &Registration) -> Result<DjangoSession> {
        let response: DjangoAuthResponse = self.django.request(
            Method::POST,
            "/auth/register/",
            Some(serde_json::to_value(registration)?),
        ).await?;

        Ok(response.into())
    }

    /// Trades a refresh token for a new access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<String> {
        let response: DjangoTokenRefresh = self.django.request(
            Method::POST,
            "/auth/refresh/",
            Some(json!({ "refresh": refresh_token })),
        ).await?;

        Ok(response.access_token)
    }

    /// Profile of whoever the stored bearer token belongs to.
    pub async fn get_profile(&self) -> Result<User> {
        let user: DjangoUser = self.django.request(Method::GET, "/users/profile/", None).await?;
        Ok(user.into())
    }

    pub async fn update_profile(&self, changes: &ProfileUpdate) -> Result<User> {
        let user: DjangoUser = self.django.request(
            Method::PATCH,
            "/users/profile/",
            Some(serde_json::to_value(changes)?),
        ).await?;

        Ok(user.into())
    }

    pub async fn get_doctors(&self, filters: &DoctorFilters) -> Result<Vec<Doctor>> {
        let endpoint = format!(
            "/doctors/{}",
            query_string(&[
                ("specialization", filters.specialization.clone()),
                ("search", filters.search.clone()),
            ])
        );
        let doctors: DjangoList<DjangoDoctor> = self.django.request(Method::GET, &endpoint, None).await?;

        Ok(doctors.into_vec().into_iter().map(Doctor::from).collect())
    }

    pub async fn get_doctor_by_id(&self, doctor_id: &str) -> Result<Doctor> {
        let endpoint = format!("/doctors/{}/", urlencoding::encode(doctor_id));
        let doctor: DjangoDoctor = self.django.request(Method::GET, &endpoint, None).await?;

        Ok(doctor.into())
    }

    pub async fn get_doctor_availability(&self, doctor_id: &str, date: NaiveDate) -> Result<Vec<AvailableSlot>> {
        let endpoint = format!(
            "/doctors/{}/availability/?date={}",
            urlencoding::encode(doctor_id),
            date.format("%Y-%m-%d")
        );
        let availability: DjangoAvailability = self.django.request(Method::GET, &endpoint, None).await?;
        debug!("Availability for {} on {} from Django", availability.doctor, availability.date);

        Ok(availability.available_slots)
    }

    pub async fn get_appointments(&self, filters: &AppointmentFilters) -> Result<Vec<Appointment>> {
        let endpoint = format!(
            "/appointments/{}",
            query_string(&[
                ("status", filters.status.map(|s| s.to_string())),
                ("date", filters.date.map(|d| d.to_string())),
            ])
        );
        let appointments: DjangoList<DjangoAppointment> = self.django.request(Method::GET, &endpoint, None).await?;

        Ok(appointments.into_vec().into_iter().map(Appointment::from).collect())
    }

    pub async fn create_appointment(&self, request: &NewAppointment) -> Result<Appointment> {
        let appointment: DjangoAppointment = self.django.request(
            Method::POST,
            "/appointments/",
            Some(serde_json::to_value(request)?),
        ).await?;

        Ok(appointment.into())
    }

    pub async fn update_appointment(&self, appointment_id: &str, changes: &AppointmentUpdate) -> Result<Appointment> {
        let endpoint = format!("/appointments/{}/", urlencoding::encode(appointment_id));
        let appointment: DjangoAppointment = self.django.request(
            Method::PATCH,
            &endpoint,
            Some(serde_json::to_value(changes)?),
        ).await?;

        Ok(appointment.into())
    }

    pub async fn cancel_appointment(&self, appointment_id: &str) -> Result<Appointment> {
        let endpoint = format!("/appointments/{}/cancel/", urlencoding::encode(appointment_id));
        let response: DjangoCancelResponse = self.django.request(Method::POST, &endpoint, None).await?;
        debug!("{}", response.message);

        Ok(response.appointment.into())
    }

    pub async fn get_time_slots(&self, doctor_id: &str) -> Result<Vec<TimeSlot>> {
        let endpoint = format!("/time-slots/?doctor_id={}", urlencoding::encode(doctor_id));
        let slots: DjangoList<DjangoTimeSlot> = self.django.request(Method::GET, &endpoint, None).await?;

        Ok(slots
            .into_vec()
            .into_iter()
            .map(|slot| slot.into_time_slot(doctor_id))
            .collect())
    }

    pub async fn create_time_slot(&self, request: &NewTimeSlot) -> Result<TimeSlot> {
        let slot: DjangoTimeSlot = self.django.request(
            Method::POST,
            "/time-slots/",
            Some(serde_json::to_value(request)?),
        ).await?;

        Ok(slot.into_time_slot(&request.doctor_id))
    }

    pub async fn update_time_slot(&self, doctor_id: &str, slot_id: &str, changes: &TimeSlotUpdate) -> Result<TimeSlot> {
        let endpoint = format!("/time-slots/{}/", urlencoding::encode(slot_id));
        let slot: DjangoTimeSlot = self.django.request(
            Method::PATCH,
            &endpoint,
            Some(serde_json::to_value(changes)?),
        ).await?;

        Ok(slot.into_time_slot(doctor_id))
    }

    pub async fn send_appointment_confirmation(&self, appointment_id: &str) -> Result<Value> {
        let endpoint = format!("/appointments/{}/send-confirmation/", urlencoding::encode(appointment_id));
        self.django.request(Method::POST, &endpoint, None).await
    }

    pub async fn send_appointment_reminder(&self, appointment_id: &str) -> Result<Value> {
        let endpoint = format!("/appointments/{}/send-reminder/", urlencoding::encode(appointment_id));
        self.django.request(Method::POST, &endpoint, None).await
    }
}
