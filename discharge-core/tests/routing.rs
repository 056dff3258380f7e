use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use discharge_core::{
    generate_routes, ContactOutcome, CoverageArea, FacilityDirectory, FacilitySite, GeoPoint,
    Marketer, MarketingPriority, PatientPredictionRecord, PipelineError, PlanReason,
    RoutingConfig,
};

const HENRY_FORD: &str = "Henry Ford Hospital";
const ROYAL_OAK: &str = "Beaumont Royal Oak";
const SPARROW: &str = "Sparrow Hospital";
const MACKINAC: &str = "Mackinac Clinic";

fn route_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()
}

fn directory() -> FacilityDirectory {
    FacilityDirectory::new(vec![
        FacilitySite {
            name: HENRY_FORD.to_string(),
            region: "Southeast Michigan".to_string(),
            location: Some(GeoPoint::new(42.3675, -83.0846)),
        },
        FacilitySite {
            name: ROYAL_OAK.to_string(),
            region: "Southeast Michigan".to_string(),
            location: Some(GeoPoint::new(42.5173, -83.1946)),
        },
        FacilitySite {
            name: SPARROW.to_string(),
            region: "Mid-Michigan".to_string(),
            location: Some(GeoPoint::new(42.7336, -84.5305)),
        },
        FacilitySite {
            name: MACKINAC.to_string(),
            region: "Northern Michigan".to_string(),
            location: None,
        },
    ])
}

fn southfield() -> Marketer {
    Marketer {
        id: "mk-southfield".to_string(),
        name: "Tasha Reynolds".to_string(),
        base: GeoPoint::new(42.4734, -83.2219),
        coverage: CoverageArea {
            facilities: vec![HENRY_FORD.to_string(), ROYAL_OAK.to_string()],
            radius_miles: None,
        },
    }
}

fn detroit() -> Marketer {
    Marketer {
        id: "mk-detroit".to_string(),
        name: "Luis Moreno".to_string(),
        base: GeoPoint::new(42.3314, -83.0458),
        coverage: CoverageArea {
            facilities: Vec::new(),
            radius_miles: Some(25.0),
        },
    }
}

fn patient(
    id: &str,
    facility: &str,
    priority: MarketingPriority,
    discharge: DateTime<Utc>,
) -> PatientPredictionRecord {
    let mut record = PatientPredictionRecord::new(id, format!("Patient {id}"), at(12, 8));
    record.facility = facility.to_string();
    record.marketing_priority = priority;
    record.predicted_discharge = discharge;
    record.home_health_eligible = true;
    record
}

#[test]
fn empty_marketer_list_reports_every_eligible_patient() {
    let patients = vec![
        patient("p1", HENRY_FORD, MarketingPriority::URGENT, at(19, 10)),
        patient("p2", ROYAL_OAK, MarketingPriority::MEDIUM, at(20, 10)),
        patient("p3", SPARROW, MarketingPriority::LOW, at(21, 10)),
    ];

    let plan = generate_routes(
        &patients,
        &[],
        &directory(),
        route_date(),
        &RoutingConfig::default(),
    );

    assert!(plan.routes.is_empty());
    assert_eq!(plan.unassigned, ["p1", "p2", "p3"]);
    assert_eq!(plan.reason, Some(PlanReason::NoMarketersConfigured));
    assert_eq!(plan.ensure_routed(), Err(PipelineError::NoMarketersConfigured));

    let json = serde_json::to_value(&plan).expect("Không serialize kế hoạch");
    assert_eq!(json["reason"], "no_marketers_configured");
    assert_eq!(json["routes"], serde_json::json!([]));
}

#[test]
fn every_eligible_patient_lands_in_exactly_one_place() {
    let mut patients = Vec::new();
    let facilities = [HENRY_FORD, ROYAL_OAK, SPARROW, MACKINAC, "Unlisted Hospital"];
    for i in 0..25u32 {
        let priority = MarketingPriority::new((i % 5 + 1) as u8).unwrap();
        let mut record = patient(
            &format!("p{i:02}"),
            facilities[(i as usize) % facilities.len()],
            priority,
            at(13 + i % 9, i % 24),
        );
        record.home_health_eligible = i % 7 != 3;
        patients.push(record);
    }

    let plan = generate_routes(
        &patients,
        &[southfield(), detroit()],
        &directory(),
        route_date(),
        &RoutingConfig::default(),
    );
    assert!(plan.ensure_routed().is_ok());

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for route in &plan.routes {
        for id in route.patient_ids() {
            *seen.entry(id).or_default() += 1;
        }
    }
    for id in &plan.unassigned {
        *seen.entry(id.as_str()).or_default() += 1;
    }

    for record in &patients {
        let count = seen.get(record.id.as_str()).copied().unwrap_or(0);
        if record.home_health_eligible {
            assert_eq!(count, 1, "bệnh nhân {} xuất hiện {count} lần", record.id);
        } else {
            assert_eq!(count, 0, "bệnh nhân {} không đủ điều kiện", record.id);
        }
    }

    for record in patients.iter().filter(|p| p.home_health_eligible) {
        let uncovered = matches!(
            record.facility.as_str(),
            SPARROW | MACKINAC | "Unlisted Hospital"
        );
        assert_eq!(plan.unassigned.contains(&record.id), uncovered);
    }
}

#[test]
fn high_priority_load_is_balanced_before_proximity() {
    let patients = vec![
        patient("first", HENRY_FORD, MarketingPriority::URGENT, at(19, 9)),
        patient("second", HENRY_FORD, MarketingPriority::URGENT, at(19, 11)),
    ];

    let plan = generate_routes(
        &patients,
        &[southfield(), detroit()],
        &directory(),
        route_date(),
        &RoutingConfig::default(),
    );

    let detroit_route = plan.route_for("mk-detroit").expect("tuyến Detroit");
    let southfield_route = plan.route_for("mk-southfield").expect("tuyến Southfield");
    assert!(detroit_route.contains("first"));
    assert!(southfield_route.contains("second"));
}

#[test]
fn low_priority_patients_go_to_the_nearest_marketer() {
    let patients = vec![
        patient("a", HENRY_FORD, MarketingPriority::LOW, at(20, 9)),
        patient("b", HENRY_FORD, MarketingPriority::LOW, at(20, 11)),
        patient("c", ROYAL_OAK, MarketingPriority::LOW, at(20, 12)),
    ];

    let plan = generate_routes(
        &patients,
        &[southfield(), detroit()],
        &directory(),
        route_date(),
        &RoutingConfig::default(),
    );

    let detroit_ids: Vec<&str> = plan
        .route_for("mk-detroit")
        .expect("tuyến Detroit")
        .patient_ids()
        .collect();
    assert_eq!(detroit_ids, ["a", "b"]);
    let southfield_ids: Vec<&str> = plan
        .route_for("mk-southfield")
        .expect("tuyến Southfield")
        .patient_ids()
        .collect();
    assert_eq!(southfield_ids, ["c"]);
}

#[test]
fn same_day_urgent_stops_are_pulled_to_the_front() {
    let patients = vec![
        patient("medium-today", HENRY_FORD, MarketingPriority::MEDIUM, at(19, 9)),
        patient("urgent-today", ROYAL_OAK, MarketingPriority::URGENT, at(19, 15)),
        patient("high-yesterday", HENRY_FORD, MarketingPriority::HIGH, at(18, 12)),
        patient("urgent-later", ROYAL_OAK, MarketingPriority::URGENT, at(21, 8)),
    ];

    let plan = generate_routes(
        &patients,
        &[southfield()],
        &directory(),
        route_date(),
        &RoutingConfig::default(),
    );

    assert_eq!(plan.routes.len(), 1);
    let ids: Vec<&str> = plan.routes[0].patient_ids().collect();
    assert_eq!(
        ids,
        ["urgent-today", "high-yesterday", "medium-today", "urgent-later"]
    );
}

#[test]
fn drive_estimate_uses_straight_line_legs() {
    let config = RoutingConfig {
        circuity_factor: 1.0,
        include_return_leg: false,
        average_speed_mph: 30.0,
        ..RoutingConfig::default()
    };
    let patients = vec![
        patient("hf", HENRY_FORD, MarketingPriority::HIGH, at(19, 9)),
        patient("hf-2", HENRY_FORD, MarketingPriority::HIGH, at(19, 10)),
        patient("north", MACKINAC, MarketingPriority::HIGH, at(19, 11)),
    ];
    let mut mackinac_marketer = detroit();
    mackinac_marketer.coverage.facilities.push(MACKINAC.to_string());

    let plan = generate_routes(
        &patients,
        &[mackinac_marketer],
        &directory(),
        route_date(),
        &config,
    );
    let route = &plan.routes[0];

    let expected = GeoPoint::new(42.3314, -83.0458).miles_to(&GeoPoint::new(42.3675, -83.0846));
    assert!((route.stops[0].leg_miles - expected).abs() < 0.1);
    assert_eq!(route.stops[1].leg_miles, 0.0);
    assert_eq!(route.stops[2].leg_miles, 0.0);
    assert!((route.total_miles - expected).abs() < 0.1);
    assert_eq!(
        route.estimated_drive_minutes,
        (expected / 30.0 * 60.0).round() as u32
    );
}

#[test]
fn ineligible_patients_are_left_out_of_routing() {
    let mut ineligible = patient("skip", HENRY_FORD, MarketingPriority::DEPRIORITIZED, at(19, 9));
    ineligible.home_health_eligible = false;

    let plan = generate_routes(
        &[ineligible],
        &[southfield()],
        &directory(),
        route_date(),
        &RoutingConfig::default(),
    );
    assert!(plan.routes.is_empty());
    assert!(plan.unassigned.is_empty());
    assert_eq!(plan.reason, None);
}

#[test]
fn route_counters_follow_recorded_contacts() {
    let patients = vec![
        patient("x", HENRY_FORD, MarketingPriority::URGENT, at(19, 9)),
        patient("y", ROYAL_OAK, MarketingPriority::HIGH, at(19, 12)),
    ];
    let mut plan = generate_routes(
        &patients,
        &[southfield()],
        &directory(),
        route_date(),
        &RoutingConfig::default(),
    );
    let route = plan.route_for_mut("mk-southfield").expect("tuyến Southfield");

    route
        .record_contact("x", ContactOutcome::Unreached)
        .expect("x nằm trên tuyến");
    route
        .record_contact("x", ContactOutcome::Secured)
        .expect("x nằm trên tuyến");
    route
        .record_contact("y", ContactOutcome::Reached)
        .expect("y nằm trên tuyến");
    assert_eq!(route.completed_contacts, 3);
    assert_eq!(route.successful_contacts, 2);
    assert_eq!(route.secured_referrals, 1);

    assert_eq!(
        route.record_contact("zzz", ContactOutcome::Reached),
        Err(PipelineError::UnknownStop("zzz".to_string()))
    );
    assert_eq!(route.completed_contacts, 3);
}
