use chrono::{TimeZone, Utc};
use discharge_core::{
    aggregate, FacilityDirectory, FacilitySite, GeoPoint, PatientPredictionRecord, PatientStatus,
};

fn directory() -> FacilityDirectory {
    FacilityDirectory::new(vec![
        FacilitySite {
            name: "Henry Ford Hospital".to_string(),
            region: "Southeast Michigan".to_string(),
            location: Some(GeoPoint::new(42.3675, -83.0846)),
        },
        FacilitySite {
            name: "Beaumont Royal Oak".to_string(),
            region: "Southeast Michigan".to_string(),
            location: Some(GeoPoint::new(42.5173, -83.1946)),
        },
    ])
}

fn records() -> Vec<PatientPredictionRecord> {
    let admitted = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();

    let mut secured = PatientPredictionRecord::new("m1", "Secured Patient", admitted);
    secured.facility = "Henry Ford Hospital".to_string();
    secured.status = PatientStatus::Secured;
    secured.predicted_los = 5;
    secured.potential_value = 2250.0;
    secured.home_health_eligible = true;

    let mut discharged_won = PatientPredictionRecord::new("m2", "Discharged Won", admitted);
    discharged_won.facility = "Henry Ford Hospital".to_string();
    discharged_won.status = PatientStatus::Discharged;
    discharged_won.referral_secured = true;
    discharged_won.predicted_los = 7;
    discharged_won.actual_discharge = Some(Utc.with_ymd_and_hms(2026, 10, 5, 0, 0, 0).unwrap());
    discharged_won.potential_value = 1000.0;
    discharged_won.home_health_eligible = true;

    let mut discharged_lost = PatientPredictionRecord::new("m3", "Discharged Lost", admitted);
    discharged_lost.facility = "beaumont royal oak".to_string();
    discharged_lost.status = PatientStatus::Discharged;
    discharged_lost.predicted_los = 3;
    discharged_lost.potential_value = 900.0;

    let mut elsewhere = PatientPredictionRecord::new("m4", "Elsewhere", admitted);
    elsewhere.facility = "Unknown Clinic".to_string();
    elsewhere.predicted_los = 4;

    vec![secured, discharged_won, discharged_lost, elsewhere]
}

#[test]
fn facility_rollups_count_conversions_and_los() {
    let metrics = aggregate(&records(), &directory());

    let henry_ford = metrics
        .facility("Henry Ford Hospital")
        .expect("thiếu Henry Ford");
    assert_eq!(henry_ford.region, "Southeast Michigan");
    assert_eq!(henry_ford.rollup.admissions, 2);
    assert_eq!(henry_ford.rollup.conversions, 2);
    assert_eq!(henry_ford.rollup.conversion_rate, 1.0);
    assert_eq!(henry_ford.rollup.average_los_days, 4.5);
    assert_eq!(henry_ford.rollup.total_potential_value, 3250.0);
    assert_eq!(henry_ford.rollup.home_health_eligible, 2);

    let unknown = metrics.facility("Unknown Clinic").expect("thiếu Unknown");
    assert_eq!(unknown.region, "Unassigned");
    assert_eq!(unknown.rollup.conversions, 0);
}

#[test]
fn region_and_total_rollups_combine_facilities() {
    let metrics = aggregate(&records(), &directory());

    let southeast = metrics.region("Southeast Michigan").expect("thiếu vùng");
    assert_eq!(southeast.facilities, 2);
    assert_eq!(southeast.rollup.admissions, 3);
    assert_eq!(southeast.rollup.conversions, 2);
    assert_eq!(southeast.rollup.conversion_rate, 0.67);
    assert_eq!(southeast.rollup.average_los_days, 4.0);
    assert_eq!(southeast.rollup.total_potential_value, 4150.0);

    assert_eq!(metrics.totals.admissions, 4);
    assert_eq!(metrics.totals.conversions, 2);
    assert_eq!(metrics.totals.conversion_rate, 0.5);
    assert_eq!(metrics.totals.average_los_days, 4.0);

    assert_eq!(metrics.by_status.get(&PatientStatus::Discharged), Some(&2));
    assert_eq!(metrics.by_status.get(&PatientStatus::Admitted), Some(&1));
    assert_eq!(metrics.by_priority.get(&5), Some(&4));
}

#[test]
fn aggregation_is_recomputed_from_scratch() {
    let records = records();
    let first = aggregate(&records, &directory());
    assert_eq!(aggregate(&records, &directory()), first);

    let empty = aggregate(&[], &directory());
    assert!(empty.facilities.is_empty());
    assert_eq!(empty.totals.admissions, 0);
    assert_eq!(empty.totals.average_los_days, 0.0);

    let json = serde_json::to_value(&first).expect("Không serialize chỉ số");
    assert_eq!(json["by_status"]["secured"], 1);
    assert_eq!(json["facilities"][0]["facility"], "Henry Ford Hospital");
    assert_eq!(json["facilities"][0]["admissions"], 2);
}
