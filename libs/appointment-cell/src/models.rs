use chrono::NaiveDate;
use serde::Deserialize;

use hybrid_api_cell::models::NewAppointment;

/// Booking form as submitted by the signed-in patient. The patient is never
/// taken from the body.
#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: String,
    pub appointment_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub reason: String,
}

impl BookAppointmentRequest {
    pub fn for_patient(self, patient_id: &str) -> NewAppointment {
        NewAppointment {
            patient_id: patient_id.to_string(),
            doctor_id: self.doctor_id,
            appointment_date: self.appointment_date,
            start_time: self.start_time,
            end_time: self.end_time,
            reason: self.reason,
        }
    }
}
