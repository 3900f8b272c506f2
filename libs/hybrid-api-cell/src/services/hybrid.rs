use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::django::DjangoClient;
use shared_database::session_store::SessionStore;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::{User, UserRole};
use shared_models::clinic::{Appointment, AvailableSlot, Doctor, TimeSlot};

use crate::models::{
    AppointmentFilters, AppointmentUpdate, AuthOutcome, DoctorFilters, NewAppointment,
    NewTimeSlot, ProfileUpdate, Registration, Served, SupabaseSignIn, SupabaseSignUp,
    TimeSlotUpdate,
};
use crate::services::django::DjangoApiService;
use crate::services::supabase::SupabaseService;

/// One operation surface over both backends. Every call goes to Supabase
/// first and is re-issued against Django only when that fails. Nothing is
/// retried beyond that single fallback, and a write that reached Supabase
/// before the failure is not rolled back, so the fallback may duplicate it.
pub struct HybridApiService {
    supabase: SupabaseService,
    django: DjangoApiService,
}

impl HybridApiService {
    pub fn new(config: &AppConfig, store: Arc<dyn SessionStore>) -> Self {
        Self {
            supabase: SupabaseService::new(Arc::new(SupabaseClient::new(config, store.clone()))),
            django: DjangoApiService::new(Arc::new(DjangoClient::new(config, store))),
        }
    }

    pub fn supabase(&self) -> &SupabaseService {
        &self.supabase
    }

    async fn with_fallback<T, P, F, Fut>(&self, operation: &str, primary: P, fallback: F) -> Result<Served<T>>
    where
        P: Future<Output = Result<T>>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match primary.await {
            Ok(payload) => Ok(Served::supabase(payload)),
            Err(e) => {
                warn!("Supabase {} failed, trying Django API: {}", operation, e);
                fallback().await.map(Served::django)
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthOutcome<SupabaseSignIn>> {
        match self.supabase.sign_in(email, password).await {
            Ok(result) => Ok(AuthOutcome::Supabase(result)),
            Err(e) => {
                warn!("Supabase login failed, trying Django API: {}", e);
                Ok(AuthOutcome::Django(self.django.login(email, password).await?))
            }
        }
    }

    pub async fn register(&self, registration: &Registration) -> Result<AuthOutcome<SupabaseSignUp>> {
        match self.supabase.sign_up(registration).await {
            Ok(result) => Ok(AuthOutcome::Supabase(result)),
            Err(e) => {
                warn!("Supabase registration failed, trying Django API: {}", e);
                Ok(AuthOutcome::Django(self.django.register(registration).await?))
            }
        }
    }

    /// Django-only: Supabase refreshes its own session inside the client.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<String> {
        self.django.refresh_token(refresh_token).await
    }

    /// The Django fallback reads the profile of the stored bearer token,
    /// which is the same user whenever a Django session is active.
    pub async fn get_profile(&self, user_id: &str) -> Result<Served<User>> {
        self.with_fallback(
            "getProfile",
            self.supabase.get_profile(user_id),
            || self.django.get_profile(),
        ).await
    }

    pub async fn get_doctors(&self, filters: &DoctorFilters) -> Result<Served<Vec<Doctor>>> {
        self.with_fallback(
            "getDoctors",
            self.supabase.get_doctors(filters),
            || self.django.get_doctors(filters),
        ).await
    }

    pub async fn get_doctor_by_id(&self, doctor_id: &str) -> Result<Served<Doctor>> {
        self.with_fallback(
            "getDoctorById",
            self.supabase.get_doctor_by_id(doctor_id),
            || self.django.get_doctor_by_id(doctor_id),
        ).await
    }

    pub async fn get_doctor_availability(&self, doctor_id: &str, date: NaiveDate) -> Result<Served<Vec<AvailableSlot>>> {
        self.with_fallback(
            "getDoctorAvailability",
            self.supabase.get_doctor_availability(doctor_id, date),
            || self.django.get_doctor_availability(doctor_id, date),
        ).await
    }

    pub async fn get_time_slots(&self, doctor_id: &str) -> Result<Served<Vec<TimeSlot>>> {
        self.with_fallback(
            "getTimeSlots",
            self.supabase.get_time_slots(doctor_id),
            || self.django.get_time_slots(doctor_id),
        ).await
    }

    pub async fn create_time_slot(&self, request: &NewTimeSlot) -> Result<Served<TimeSlot>> {
        self.with_fallback(
            "createTimeSlot",
            self.supabase.create_time_slot(request),
            || self.django.create_time_slot(request),
        ).await
    }

    pub async fn update_time_slot(&self, doctor_id: &str, slot_id: &str, changes: &TimeSlotUpdate) -> Result<Served<TimeSlot>> {
        self.with_fallback(
            "updateTimeSlot",
            self.supabase.update_time_slot(doctor_id, slot_id, changes),
            || self.django.update_time_slot(doctor_id, slot_id, changes),
        ).await
    }

    /// Inserts through Supabase, then asks Django to e-mail a confirmation.
    /// The confirmation is best-effort: its failure is logged and dropped and
    /// never changes the outcome. The Django fallback sends its own e-mail.
    pub async fn create_appointment(&self, request: &NewAppointment) -> Result<Served<Appointment>> {
        match self.supabase.create_appointment(request).await {
            Ok(appointment) => {
                if let Err(e) = self.django.send_appointment_confirmation(&appointment.id).await {
                    warn!("Email notification failed: {}", e);
                } else {
                    debug!("Confirmation requested for appointment {}", appointment.id);
                }
                Ok(Served::supabase(appointment))
            }
            Err(e) => {
                warn!("Supabase createAppointment failed, trying Django API: {}", e);
                self.django.create_appointment(request).await.map(Served::django)
            }
        }
    }

    /// Django scopes the list to the bearer's own role server-side, so only
    /// the filters travel on the fallback path.
    pub async fn get_appointments(
        &self,
        user_id: &str,
        role: UserRole,
        filters: &AppointmentFilters,
    ) -> Result<Served<Vec<Appointment>>> {
        self.with_fallback(
            "getAppointments",
            self.supabase.get_appointments(user_id, role, filters),
            || self.django.get_appointments(filters),
        ).await
    }

    pub async fn update_appointment(&self, appointment_id: &str, changes: &AppointmentUpdate) -> Result<Served<Appointment>> {
        self.with_fallback(
            "updateAppointment",
            self.supabase.update_appointment(appointment_id, changes),
            || self.django.update_appointment(appointment_id, changes),
        ).await
    }

    pub async fn cancel_appointment(&self, appointment_id: &str) -> Result<Served<Appointment>> {
        let cancellation = AppointmentUpdate::cancellation();
        self.with_fallback(
            "cancelAppointment",
            self.supabase.update_appointment(appointment_id, &cancellation),
            || self.django.cancel_appointment(appointment_id),
        ).await
    }

    pub async fn update_profile(&self, user_id: &str, changes: &ProfileUpdate) -> Result<Served<User>> {
        self.with_fallback(
            "updateProfile",
            self.supabase.update_profile(user_id, changes),
            || self.django.update_profile(changes),
        ).await
    }

    pub async fn send_appointment_reminder(&self, appointment_id: &str) -> Result<()> {
        self.django.send_appointment_reminder(appointment_id).await?;
        Ok(())
    }
}
