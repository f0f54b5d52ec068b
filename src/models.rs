/*!
 * Data type definitions for gorzdrav directory records
 *
 * Typed representations of the upstream response envelope and of the
 * district → institution → specialty → doctor → appointment hierarchy.
 * Field names follow the upstream camelCase JSON; everything but the
 * identifiers is optional since the upstream omits fields freely.
 */

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::classify::{classify, FailureCondition};
use crate::link::{self, Identifiers};

/// Response envelope wrapping every upstream answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub result: Option<T>,
    pub success: bool,
    pub error_code: Option<i64>,
    pub message: Option<String>,
    pub request_id: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Unwrap the payload or classify the reported failure.
    ///
    /// A successful envelope without a `result` yields `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>, FailureCondition> {
        if self.success {
            Ok(self.result)
        } else {
            Err(classify(self.error_code.unwrap_or_default(), self.message.as_deref()))
        }
    }
}

/// City district
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct District {
    pub id: String,
    pub name: Option<String>,
    pub okato: Option<serde_json::Value>,
}

/// Medical institution (LPU)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lpu {
    pub id: i64,
    pub description: Option<String>,
    pub district: Option<serde_json::Value>,
    pub district_id: Option<serde_json::Value>,
    pub district_name: Option<String>,
    pub is_active: Option<bool>,
    pub lpu_full_name: Option<String>,
    pub lpu_short_name: Option<String>,
    pub lpu_type: Option<String>,
    pub oid: Option<String>,
    pub part_of: Option<serde_json::Value>,
    pub head_organization: Option<String>,
    pub organization: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub covid_vaccination: Option<bool>,
    pub in_depth_examination: Option<bool>,
    pub subdivision: Option<serde_json::Value>,
}

impl Lpu {
    /// Short name when available, otherwise full name
    pub fn display_name(&self) -> String {
        self.lpu_short_name
            .as_deref()
            .or(self.lpu_full_name.as_deref())
            .unwrap_or("")
            .to_string()
    }
}

/// Specialty (department) within an institution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specialty {
    pub id: String,
    pub fer_id: Option<String>,
    pub name: Option<String>,
    pub count_free_participant: Option<i64>,
    pub count_free_ticket: Option<i64>,
    pub last_date: Option<NaiveDateTime>,
    pub nearest_date: Option<NaiveDateTime>,
}

/// Doctor (schedule entry) as returned by the upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDoctor {
    pub id: String,
    pub name: Option<String>,
    pub aria_number: Option<String>,
    pub aria_type: Option<serde_json::Value>,
    pub comment: Option<String>,
    pub free_participant_count: Option<i64>,
    pub free_ticket_count: Option<i64>,
    pub last_date: Option<NaiveDateTime>,
    pub nearest_date: Option<NaiveDateTime>,
}

impl ApiDoctor {
    /// Whether the upstream reports free tickets for this doctor
    pub fn has_free_tickets(&self) -> bool {
        self.free_ticket_count.unwrap_or(0) > 0
    }
}

/// Doctor enriched with the identifiers it was looked up under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    #[serde(flatten)]
    pub doctor: ApiDoctor,
    pub district_id: Option<String>,
    pub lpu_id: i64,
    pub specialty_id: String,
}

impl Doctor {
    pub fn new(doctor: ApiDoctor, lpu_id: i64, specialty_id: impl Into<String>, district_id: Option<String>) -> Self {
        Self {
            doctor,
            district_id,
            lpu_id,
            specialty_id: specialty_id.into(),
        }
    }

    pub fn identifiers(&self) -> Identifiers {
        Identifiers {
            district_id: self.district_id.clone(),
            lpu_id: Some(self.lpu_id),
            specialty_id: Some(self.specialty_id.clone()),
            doctor_id: Some(self.doctor.id.clone()),
        }
    }

    /// Canonical booking page link for this doctor
    pub fn booking_link(&self) -> crate::Result<String> {
        link::generate(&self.identifiers())
    }
}

/// Free appointment slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub visit_start: Option<NaiveDateTime>,
    pub visit_end: Option<NaiveDateTime>,
    pub address: Option<String>,
    pub number: Option<String>,
    pub room: Option<String>,
}

/// One day of a doctor's timetable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    #[serde(default)]
    pub appointments: Vec<Appointment>,
    pub deny_cause: Option<String>,
    pub recordable_day: Option<bool>,
    pub visit_start: Option<NaiveDateTime>,
    pub visit_end: Option<NaiveDateTime>,
}

impl Timetable {
    pub fn is_recordable(&self) -> bool {
        self.recordable_day.unwrap_or(false) && self.deny_cause.is_none()
    }
}
