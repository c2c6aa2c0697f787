use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity, demographic and contact fields of a patient.
///
/// Used both as the mutable part of a [`Patient`] row and as the
/// denormalized snapshot copied into screening answers and queue entries.
/// A snapshot is never re-synchronised with the patient row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientInfo {
    #[serde(alias = "nik")]
    pub national_id: String,
    pub full_name: String,
    pub birth_place: String,
    pub birth_date: String,
    pub gender: String,
    pub address: String,
    pub rt: String,
    pub rw: String,
    pub village: String,
    pub district: String,
    pub religion: String,
    pub marital: String,
    pub job: String,
    pub nationality: String,
    pub valid_until: String,
    pub blood_type: String,
    pub height: i32,
    pub weight: i32,
    pub age: i32,
    pub email: String,
    pub phone: String,
}

/// Registration payload: everything the caller controls on a patient row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPatient {
    #[serde(flatten)]
    pub info: PatientInfo,
    #[serde(default)]
    pub ktp_images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    #[serde(flatten)]
    pub info: PatientInfo,
    pub ktp_images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn national_id(&self) -> &str {
        &self.info.national_id
    }
}
