use std::path::PathBuf;

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{User, UserRole};

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub django_api_url: String,
    pub session_store_path: PathBuf,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            django_api_url: "http://localhost:8000/api".to_string(),
            session_store_path: PathBuf::from("test-session.json"),
        }
    }
}

impl TestConfig {
    /// Points both backends at mock servers.
    pub fn with_backends(supabase_url: &str, django_api_url: &str) -> Self {
        Self {
            supabase_url: supabase_url.to_string(),
            django_api_url: django_api_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            django_api_url: self.django_api_url.clone(),
            session_store_path: self.session_store_path.clone(),
            portal_port: 3000,
        }
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", UserRole::Patient)
    }
}

impl TestUser {
    pub fn new(email: &str, role: UserRole) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, UserRole::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, UserRole::Patient)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, UserRole::Admin)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: "555-0100".to_string(),
            role: self.role,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn session_response(user: &TestUser, access_token: &str) -> Value {
        json!({
            "access_token": access_token,
            "refresh_token": "refresh-token",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": {
                "id": user.id,
                "email": user.email
            }
        })
    }

    pub fn auth_user_response(user: &TestUser) -> Value {
        json!({
            "id": user.id,
            "email": user.email,
            "aud": "authenticated",
            "role": "authenticated"
        })
    }

    pub fn user_row(user: &TestUser) -> Value {
        json!({
            "id": user.id,
            "email": user.email,
            "first_name": user.first_name,
            "last_name": user.last_name,
            "phone": "555-0100",
            "role": user.role,
            "created_at": "2024-01-01T00:00:00+00:00",
            "updated_at": "2024-01-01T00:00:00+00:00"
        })
    }

    pub fn doctor_row(doctor_id: &str, user: &TestUser, specialization: &str) -> Value {
        json!({
            "id": doctor_id,
            "user_id": user.id,
            "specialization": specialization,
            "experience": 10,
            "qualifications": "MBBS, MD",
            "consultation_fee": 150.0,
            "bio": "Experienced practitioner",
            "created_at": "2024-01-01T00:00:00+00:00",
            "updated_at": "2024-01-01T00:00:00+00:00",
            "users": Self::user_row(user)
        })
    }

    pub fn time_slot_row(slot_id: &str, doctor_id: &str, day_of_week: u8, start: &str, end: &str) -> Value {
        json!({
            "id": slot_id,
            "doctor_id": doctor_id,
            "day_of_week": day_of_week,
            "start_time": start,
            "end_time": end,
            "is_available": true,
            "created_at": "2024-01-01T00:00:00+00:00",
            "updated_at": "2024-01-01T00:00:00+00:00"
        })
    }

    pub fn appointment_row(appointment_id: &str, patient_id: &str, doctor_id: &str, status: &str) -> Value {
        json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_date": "2024-12-20",
            "start_time": "09:00:00",
            "end_time": "09:30:00",
            "status": status,
            "reason": "Routine checkup",
            "notes": null,
            "created_at": "2024-12-01T10:00:00+00:00",
            "updated_at": "2024-12-01T10:00:00+00:00"
        })
    }
}

pub struct MockDjangoResponses;

impl MockDjangoResponses {
    pub fn user(id: i64, email: &str, role: &str) -> Value {
        json!({
            "id": id,
            "email": email,
            "first_name": "Django",
            "last_name": "User",
            "phone": "555-0199",
            "role": role,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn auth_response(id: i64, email: &str, access_token: &str) -> Value {
        json!({
            "user": Self::user(id, email, "patient"),
            "access_token": access_token,
            "refresh_token": "django-refresh"
        })
    }

    pub fn doctor(id: i64, user_id: i64, specialization: &str) -> Value {
        json!({
            "id": id,
            "user": Self::user(user_id, "doctor@example.com", "doctor"),
            "specialization": specialization,
            "experience": 8,
            "qualifications": "MD",
            "consultation_fee": "100.00",
            "bio": null,
            "is_available": true,
            "time_slots": [],
            "rating": 4.5,
            "review_count": 25,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment(id: i64, status: &str) -> Value {
        json!({
            "id": id,
            "patient": {
                "id": 3,
                "user": Self::user(30, "patient@example.com", "patient"),
                "date_of_birth": "1990-01-01",
                "age": 34,
                "medical_history": null
            },
            "doctor": Self::doctor(4, 40, "Cardiology"),
            "appointment_date": "2024-12-20",
            "start_time": "09:00:00",
            "end_time": "09:30:00",
            "status": status,
            "reason": "Routine checkup",
            "notes": null,
            "duration_minutes": 30,
            "created_at": "2024-12-01T10:00:00Z",
            "updated_at": "2024-12-01T10:00:00Z"
        })
    }

    pub fn message(text: &str) -> Value {
        json!({ "message": text })
    }
}
