//! Deterministic demo data: raw admissions, Michigan facilities, marketers.
//!
//! Values rotate through fixed tables by index, so the same `count` and
//! `anchor` always produce the same payload.

use chrono::{Duration, NaiveDate};
use discharge_core::{CoverageArea, FacilityDirectory, FacilitySite, GeoPoint, Marketer};
use serde_json::{json, Value};

const FIRST_NAMES: &[&str] = &[
    "Dorothy", "Raymond", "Linh", "Gerald", "Maria", "Omar", "Beverly", "Darnell", "Agnes",
    "Tomasz", "Patricia", "Walter",
];
const LAST_NAMES: &[&str] = &[
    "Kowalski", "Osei", "Tran", "Finch", "Delgado", "Haddad", "Nowak", "Jackson", "Lindqvist",
    "Brennan", "Okafor",
];
const DIAGNOSES: &[(&str, &str)] = &[
    ("Acute heart failure", "I50.9"),
    ("COPD exacerbation", "J44.1"),
    ("Sepsis, unspecified organism", "A41.9"),
    ("Community-acquired pneumonia", "J18.9"),
    ("Hip fracture, post ORIF", "S72.001A"),
    ("Cellulitis of lower limb", "L03.115"),
    ("Type 2 diabetes with hyperglycemia", "E11.65"),
    ("Ischemic stroke", "I63.9"),
    ("Acute respiratory failure", "J96.01"),
    ("Syncope and collapse", "R55"),
];
const COMORBIDITIES: &[&str] = &[
    "hypertension",
    "diabetes",
    "CAD",
    "CKD stage 3",
    "atrial fibrillation",
    "obesity",
];
const PAYERS: &[&str] = &[
    "Medicare",
    "Humana Medicare Advantage",
    "Medicaid",
    "Blue Cross Blue Shield of Michigan",
    "Priority Health",
    "Self-pay",
];
const ACUITY: &[&str] = &["low", "medium", "high"];
const UNITS: &[&str] = &["4 North", "CVICU", "Med-Surg 6", "Step-down"];

struct SeedFacility {
    name: &'static str,
    region: &'static str,
    lat: f64,
    lon: f64,
}

const FACILITIES: &[SeedFacility] = &[
    SeedFacility {
        name: "Henry Ford Hospital",
        region: "Southeast Michigan",
        lat: 42.3675,
        lon: -83.0846,
    },
    SeedFacility {
        name: "Corewell Health Royal Oak",
        region: "Southeast Michigan",
        lat: 42.5173,
        lon: -83.1946,
    },
    SeedFacility {
        name: "University of Michigan Hospital",
        region: "Washtenaw",
        lat: 42.2846,
        lon: -83.7282,
    },
    SeedFacility {
        name: "Sparrow Hospital",
        region: "Mid-Michigan",
        lat: 42.7336,
        lon: -84.5305,
    },
    SeedFacility {
        name: "McLaren Flint",
        region: "Mid-Michigan",
        lat: 43.0255,
        lon: -83.7135,
    },
    SeedFacility {
        name: "Corewell Health Butterworth",
        region: "West Michigan",
        lat: 42.9701,
        lon: -85.6650,
    },
];

pub fn seed_facilities() -> FacilityDirectory {
    FacilityDirectory::new(
        FACILITIES
            .iter()
            .map(|facility| FacilitySite {
                name: facility.name.to_string(),
                region: facility.region.to_string(),
                location: Some(GeoPoint::new(facility.lat, facility.lon)),
            })
            .collect(),
    )
}

fn marketer(
    id: &str,
    name: &str,
    lat: f64,
    lon: f64,
    facilities: &[&str],
    radius_miles: Option<f64>,
) -> Marketer {
    Marketer {
        id: id.to_string(),
        name: name.to_string(),
        base: GeoPoint::new(lat, lon),
        coverage: CoverageArea {
            facilities: facilities.iter().map(|f| f.to_string()).collect(),
            radius_miles,
        },
    }
}

pub fn seed_marketers() -> Vec<Marketer> {
    vec![
        marketer(
            "mk-southfield",
            "Tasha Reynolds",
            42.4734,
            -83.2219,
            &["Henry Ford Hospital", "Corewell Health Royal Oak"],
            Some(20.0),
        ),
        marketer(
            "mk-ann-arbor",
            "Luis Moreno",
            42.2808,
            -83.7430,
            &["University of Michigan Hospital"],
            Some(35.0),
        ),
        marketer(
            "mk-lansing",
            "Grace Whitfield",
            42.7325,
            -84.5555,
            &["Sparrow Hospital", "McLaren Flint"],
            None,
        ),
    ]
}

/// Raw admissions shaped like the upstream feed (camelCase keys).
pub fn seed_admissions(count: usize, anchor: NaiveDate) -> Value {
    let admissions: Vec<Value> = (0..count).map(|i| seed_admission(i, anchor)).collect();
    Value::Array(admissions)
}

fn seed_admission(i: usize, anchor: NaiveDate) -> Value {
    let (diagnosis, icd10) = DIAGNOSES[i % DIAGNOSES.len()];
    let facility = &FACILITIES[(i * 5 + 1) % FACILITIES.len()];
    let comorbidity_count = i % 5;
    let comorbidities: Vec<&str> = (0..comorbidity_count)
        .map(|offset| COMORBIDITIES[(i + offset) % COMORBIDITIES.len()])
        .collect();
    let age = 58 + (i * 11) % 37;
    let admitted = anchor - Duration::days((i % 4) as i64);
    let dob = admitted - Duration::days((age as i64) * 365 + 40);
    let status = if i % 9 == 8 {
        "secured"
    } else if i % 5 == 4 {
        "contacted"
    } else {
        "admitted"
    };

    json!({
        "id": format!("adm-{:04}", i + 1),
        "mrn": format!("MRN{:06}", 204_100 + i * 37),
        "patientName": format!(
            "{} {}",
            FIRST_NAMES[i % FIRST_NAMES.len()],
            LAST_NAMES[(i * 7) % LAST_NAMES.len()]
        ),
        "dob": dob.format("%Y-%m-%d").to_string(),
        "gender": if i % 2 == 0 { "female" } else { "male" },
        "primaryDiagnosis": diagnosis,
        "icd10Codes": [icd10],
        "comorbidities": comorbidities,
        "acuityLevel": ACUITY[(i * 2 + 1) % ACUITY.len()],
        "facility": facility.name,
        "unit": UNITS[i % UNITS.len()],
        "insurance": PAYERS[(i * 7) % PAYERS.len()],
        "admissionDate": format!("{}T{:02}:15:00Z", admitted.format("%Y-%m-%d"), 6 + i % 12),
        "status": status,
        "contactAttempts": if status == "admitted" { 0 } else { 1 + i % 3 },
    })
}
