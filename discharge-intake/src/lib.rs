//! Raw admission JSON to scored `PatientPredictionRecord`s.
//!
//! The upstream EHR/referral feed has no fixed schema, so every field is read
//! leniently (camelCase or snake_case keys, strings or numbers). Only `id`,
//! `patientName` and `admissionDate` are mandatory; records missing any of
//! them are skipped and reported instead of failing the batch.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use discharge_core::{
    evaluate_all, AcuityLevel, AuthorizationStatus, DischargeDestination,
    PatientPredictionRecord, PatientStatus, PipelineConfig, PipelineError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod seed;
pub mod source;
pub mod sync;

pub use source::{AdmissionSource, FetchError, JsonFileSource, StaticSource, WithDeadline};
pub use sync::{PipelineSnapshot, RefreshOutcome, RefreshTicket, SnapshotCache, SyncFailure};

/// A raw admission that could not be normalized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MalformedRecord {
    /// Position of the record in the upstream payload.
    pub index: usize,
    pub id: Option<String>,
    pub missing: Vec<String>,
}

impl From<MalformedRecord> for PipelineError {
    fn from(record: MalformedRecord) -> Self {
        PipelineError::MalformedRecord {
            index: record.index,
            missing: record.missing,
        }
    }
}

/// Normalized records plus the ones that had to be skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProcessedBatch {
    pub records: Vec<PatientPredictionRecord>,
    pub skipped: usize,
    pub issues: Vec<MalformedRecord>,
}

/// Normalize, score and classify admissions from a JSON string.
pub fn process_admissions_str(
    payload: &str,
    config: &PipelineConfig,
) -> Result<ProcessedBatch, PipelineError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|err| PipelineError::ExternalFetch(format!("invalid JSON payload: {err}")))?;
    process_admissions_value(&value, config)
}

/// Normalize, score and classify admissions from a `serde_json::Value`.
///
/// Records come back sorted by marketing priority, earliest predicted
/// discharge first within a priority.
pub fn process_admissions_value(
    payload: &Value,
    config: &PipelineConfig,
) -> Result<ProcessedBatch, PipelineError> {
    let mut batch = normalize_batch(payload)?;
    evaluate_all(&mut batch.records, config);
    Ok(batch)
}

/// Normalize every admission in the payload without scoring.
///
/// Accepts either a bare array or an object wrapping the array under
/// `admissions` (or `data`).
pub fn normalize_batch(payload: &Value) -> Result<ProcessedBatch, PipelineError> {
    let entries = payload
        .as_array()
        .or_else(|| payload.get("admissions").and_then(Value::as_array))
        .or_else(|| payload.get("data").and_then(Value::as_array))
        .ok_or_else(|| {
            PipelineError::ExternalFetch(
                "expected a JSON array of admission records".to_string(),
            )
        })?;

    let mut batch = ProcessedBatch::default();
    for (index, raw) in entries.iter().enumerate() {
        match normalize_admission(raw, index) {
            Ok(record) => batch.records.push(record),
            Err(issue) => {
                log::warn!(
                    "Skipping admission #{index} ({}): missing {}",
                    issue.id.as_deref().unwrap_or("no id"),
                    issue.missing.join(", ")
                );
                batch.issues.push(issue);
            }
        }
    }
    batch.skipped = batch.issues.len();

    log::info!(
        "Normalized {} admissions, skipped {}",
        batch.records.len(),
        batch.skipped
    );
    Ok(batch)
}

/// Convert a single raw admission into a canonical record.
pub fn normalize_admission(
    raw: &Value,
    index: usize,
) -> Result<PatientPredictionRecord, MalformedRecord> {
    let id = text(raw, &["id", "admissionId", "admission_id"]);
    let patient_name = text(raw, &["patientName", "patient_name", "name"]);
    let admission_date = text(raw, &["admissionDate", "admission_date", "admitDate"])
        .as_deref()
        .and_then(parse_timestamp);

    let (Some(id), Some(patient_name), Some(admission_date)) =
        (id.clone(), patient_name.clone(), admission_date)
    else {
        let mut missing = Vec::new();
        if id.is_none() {
            missing.push("id".to_string());
        }
        if patient_name.is_none() {
            missing.push("patientName".to_string());
        }
        if admission_date.is_none() {
            missing.push("admissionDate".to_string());
        }
        return Err(MalformedRecord { index, id, missing });
    };

    let mut record = PatientPredictionRecord::new(id, patient_name, admission_date);

    record.mrn = text(raw, &["mrn", "medicalRecordNumber"]);
    record.dob = text(raw, &["dob", "dateOfBirth", "date_of_birth", "birthDate"])
        .as_deref()
        .and_then(parse_date);
    record.age = unsigned(raw, &["age"])
        .or_else(|| record.dob.and_then(|dob| age_at(dob, admission_date.date_naive())));
    record.gender = text(raw, &["gender", "sex"]);

    if let Some(diagnosis) = text(raw, &["primaryDiagnosis", "primary_diagnosis", "diagnosis"]) {
        record.primary_diagnosis = diagnosis;
    }
    record.icd10_codes = string_list(raw, &["icd10Codes", "icd10_codes", "icd10"]);
    record.comorbidities = string_list(raw, &["comorbidities"]);
    if let Some(acuity) = text(raw, &["acuityLevel", "acuity_level", "acuity"]) {
        record.acuity_level = parse_acuity(&acuity);
    }

    if let Some(facility) = text(raw, &["facility", "hospital"]) {
        record.facility = facility;
    }
    record.unit = text(raw, &["unit"]);
    record.admitting_physician = text(raw, &["admittingPhysician", "admitting_physician"]);
    if let Some(insurance) = text(raw, &["insurance", "payer"]) {
        record.insurance = insurance;
    }
    record.insurance_id = text(raw, &["insuranceId", "insurance_id"]);
    if let Some(auth) = text(raw, &["authorizationStatus", "authorization_status"]) {
        record.authorization_status = parse_authorization(&auth);
    }

    record.reported_los = unsigned(raw, &["predictedLOS", "predictedLos", "predicted_los"]);
    record.actual_discharge = text(raw, &["actualDischarge", "actual_discharge"])
        .as_deref()
        .and_then(parse_timestamp);
    record.planned_destination = text(raw, &["dischargeDestination", "discharge_destination"])
        .as_deref()
        .map(parse_destination);

    if let Some(status) = text(raw, &["status"]) {
        record.status = parse_status(&status);
    }
    record.referral_secured = flag(raw, &["referralSecured", "referral_secured"])
        .unwrap_or(matches!(record.status, PatientStatus::Secured));

    record.assigned_marketer = text(raw, &["assignedMarketer", "assigned_marketer"]);
    record.assigned_nurse = text(raw, &["assignedNurse", "assigned_nurse"]);
    record.case_manager = text(raw, &["caseManager", "case_manager"]);
    record.contact_attempts = unsigned(raw, &["contactAttempts", "contact_attempts"]).unwrap_or(0);
    record.last_contact_date = text(raw, &["lastContactDate", "last_contact_date"])
        .as_deref()
        .and_then(parse_timestamp);

    Ok(record)
}

fn field<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| !value.is_null())
}

fn text(raw: &Value, keys: &[&str]) -> Option<String> {
    let value = field(raw, keys)?;
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn unsigned(raw: &Value, keys: &[&str]) -> Option<u32> {
    let value = field(raw, keys)?;
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if number.is_finite() && number >= 0.0 {
        Some(number.round().min(f64::from(u32::MAX)) as u32)
    } else {
        None
    }
}

fn flag(raw: &Value, keys: &[&str]) -> Option<bool> {
    match field(raw, keys)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn string_list(raw: &Value, keys: &[&str]) -> Vec<String> {
    let Some(value) = field(raw, keys) else {
        return Vec::new();
    };
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(_) => item
                    .get("name")
                    .or_else(|| item.get("display"))
                    .or_else(|| item.get("code"))
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    parse_date(value)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .ok()
}

fn age_at(dob: NaiveDate, on: NaiveDate) -> Option<u32> {
    let mut age = on.year() - dob.year();
    if (on.month(), on.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    u32::try_from(age).ok()
}

fn parse_acuity(value: &str) -> AcuityLevel {
    match value.to_lowercase().as_str() {
        "high" | "critical" | "severe" => AcuityLevel::High,
        "medium" | "moderate" => AcuityLevel::Medium,
        _ => AcuityLevel::Low,
    }
}

fn parse_status(value: &str) -> PatientStatus {
    match value.to_lowercase().as_str() {
        "contacted" => PatientStatus::Contacted,
        "secured" => PatientStatus::Secured,
        "discharged" => PatientStatus::Discharged,
        "lost" => PatientStatus::Lost,
        "admitted" => PatientStatus::Admitted,
        other => {
            log::debug!("Unknown status {other}, treating as admitted");
            PatientStatus::Admitted
        }
    }
}

fn parse_destination(value: &str) -> DischargeDestination {
    let normalized = value.to_lowercase();
    if normalized.contains("snf") || normalized.contains("skilled nursing") {
        DischargeDestination::Snf
    } else if normalized.contains("ltac") || normalized.contains("ltach") {
        DischargeDestination::Ltac
    } else if normalized.contains("rehab") || normalized == "irf" {
        DischargeDestination::Rehab
    } else if normalized.contains("home") {
        DischargeDestination::Home
    } else {
        DischargeDestination::Other
    }
}

fn parse_authorization(value: &str) -> AuthorizationStatus {
    match value.to_lowercase().as_str() {
        "approved" | "authorized" => AuthorizationStatus::Approved,
        "denied" | "rejected" => AuthorizationStatus::Denied,
        "pending" | "submitted" | "in_review" => AuthorizationStatus::Pending,
        _ => AuthorizationStatus::NotRequired,
    }
}
