//! Gom bệnh nhân theo marketer và dựng tuyến đi trong ngày.
//!
//! Phân bổ tham lam: duyệt bệnh nhân theo thứ tự ưu tiên, giao cho marketer
//! phủ cơ sở đó đang giữ ít ca ưu tiên cao nhất, hòa thì chọn người gần nhất
//! (khoảng cách chim bay). Định tuyến đường bộ thực tế nằm ngoài phạm vi.

use std::cmp::Ordering;

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    priority_order, ContactOutcome, MarketingPriority, PatientPredictionRecord, PipelineError,
    RoutingConfig,
};

const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Tọa độ địa lý (độ thập phân).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Khoảng cách haversine tính bằng dặm.
    pub fn miles_to(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.lon - self.lon).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_MILES * a.sqrt().min(1.0).asin()
    }
}

/// Một cơ sở (bệnh viện) cùng vùng và vị trí.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FacilitySite {
    pub name: String,
    pub region: String,
    pub location: Option<GeoPoint>,
}

/// Danh bạ cơ sở, tra cứu theo tên không phân biệt hoa thường.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct FacilityDirectory {
    sites: Vec<FacilitySite>,
}

impl FacilityDirectory {
    pub fn new(sites: Vec<FacilitySite>) -> Self {
        Self { sites }
    }

    pub fn sites(&self) -> &[FacilitySite] {
        &self.sites
    }

    pub fn find(&self, facility: &str) -> Option<&FacilitySite> {
        let wanted = facility.trim();
        self.sites
            .iter()
            .find(|site| site.name.trim().eq_ignore_ascii_case(wanted))
    }

    pub fn location_of(&self, facility: &str) -> Option<GeoPoint> {
        self.find(facility).and_then(|site| site.location)
    }

    pub fn region_of(&self, facility: &str) -> Option<&str> {
        self.find(facility).map(|site| site.region.as_str())
    }
}

/// Vùng phủ của marketer: danh sách cơ sở và/hoặc bán kính quanh điểm xuất phát.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CoverageArea {
    #[serde(default)]
    pub facilities: Vec<String>,
    #[serde(default)]
    pub radius_miles: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Marketer {
    pub id: String,
    pub name: String,
    pub base: GeoPoint,
    #[serde(default)]
    pub coverage: CoverageArea,
}

impl Marketer {
    pub fn covers(&self, facility: &str, directory: &FacilityDirectory) -> bool {
        let wanted = facility.trim();
        if self
            .coverage
            .facilities
            .iter()
            .any(|name| name.trim().eq_ignore_ascii_case(wanted))
        {
            return true;
        }
        match (self.coverage.radius_miles, self.distance_to(facility, directory)) {
            (Some(radius), Some(distance)) => distance <= radius,
            _ => false,
        }
    }

    pub fn distance_to(&self, facility: &str, directory: &FacilityDirectory) -> Option<f64> {
        directory
            .location_of(facility)
            .map(|location| self.base.miles_to(&location))
    }
}

/// Một điểm dừng trên tuyến; chỉ giữ id bệnh nhân, không sao chép hồ sơ.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteStop {
    pub patient_id: String,
    pub facility: String,
    pub leg_miles: f64,
}

/// Tuyến đi trong ngày của một marketer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketingRoute {
    pub marketer_id: String,
    pub date: NaiveDate,
    pub stops: Vec<RouteStop>,
    pub estimated_drive_minutes: u32,
    pub total_miles: f64,
    pub completed_contacts: u32,
    pub successful_contacts: u32,
    pub secured_referrals: u32,
}

impl MarketingRoute {
    pub fn patient_ids(&self) -> impl Iterator<Item = &str> {
        self.stops.iter().map(|stop| stop.patient_id.as_str())
    }

    pub fn contains(&self, patient_id: &str) -> bool {
        self.patient_ids().any(|id| id == patient_id)
    }

    /// Cập nhật bộ đếm khi marketer hoàn thành một lần liên hệ.
    pub fn record_contact(
        &mut self,
        patient_id: &str,
        outcome: ContactOutcome,
    ) -> Result<(), PipelineError> {
        if !self.contains(patient_id) {
            return Err(PipelineError::UnknownStop(patient_id.to_string()));
        }
        self.completed_contacts += 1;
        match outcome {
            ContactOutcome::Unreached => {}
            ContactOutcome::Reached => self.successful_contacts += 1,
            ContactOutcome::Secured => {
                self.successful_contacts += 1;
                self.secured_referrals += 1;
            }
        }
        Ok(())
    }
}

/// Lý do kế hoạch tuyến không thể dựng được.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanReason {
    NoMarketersConfigured,
}

/// Kết quả phân tuyến cho một ngày.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutePlan {
    pub date: NaiveDate,
    pub routes: Vec<MarketingRoute>,
    /// Id các bệnh nhân đủ điều kiện nhưng không marketer nào phủ được.
    pub unassigned: Vec<String>,
    pub reason: Option<PlanReason>,
}

impl RoutePlan {
    pub fn route_for(&self, marketer_id: &str) -> Option<&MarketingRoute> {
        self.routes
            .iter()
            .find(|route| route.marketer_id == marketer_id)
    }

    pub fn route_for_mut(&mut self, marketer_id: &str) -> Option<&mut MarketingRoute> {
        self.routes
            .iter_mut()
            .find(|route| route.marketer_id == marketer_id)
    }

    /// Chuyển lý do thất bại thành lỗi cho bên gọi cần `Result`.
    pub fn ensure_routed(&self) -> Result<(), PipelineError> {
        match self.reason {
            Some(PlanReason::NoMarketersConfigured) => Err(PipelineError::NoMarketersConfigured),
            None => Ok(()),
        }
    }
}

pub fn generate_routes(
    patients: &[PatientPredictionRecord],
    marketers: &[Marketer],
    directory: &FacilityDirectory,
    date: NaiveDate,
    config: &RoutingConfig,
) -> RoutePlan {
    let mut eligible: Vec<&PatientPredictionRecord> = patients
        .iter()
        .filter(|patient| patient.home_health_eligible)
        .collect();
    eligible.sort_by(|a, b| priority_order(a, b));

    if marketers.is_empty() {
        warn!(
            "Không có marketer nào, {} bệnh nhân chưa được phân tuyến",
            eligible.len()
        );
        return RoutePlan {
            date,
            routes: Vec::new(),
            unassigned: eligible.iter().map(|patient| patient.id.clone()).collect(),
            reason: Some(PlanReason::NoMarketersConfigured),
        };
    }

    let mut high_priority_load = vec![0usize; marketers.len()];
    let mut assignments: Vec<Vec<&PatientPredictionRecord>> = vec![Vec::new(); marketers.len()];
    let mut unassigned = Vec::new();

    for patient in eligible {
        let choice = marketers
            .iter()
            .enumerate()
            .filter(|(_, marketer)| marketer.covers(&patient.facility, directory))
            .min_by(|(left_idx, left), (right_idx, right)| {
                high_priority_load[*left_idx]
                    .cmp(&high_priority_load[*right_idx])
                    .then_with(|| {
                        compare_distance(
                            left.distance_to(&patient.facility, directory),
                            right.distance_to(&patient.facility, directory),
                        )
                    })
                    .then_with(|| left.id.cmp(&right.id))
            });

        match choice {
            Some((index, marketer)) => {
                if patient.marketing_priority.level() <= config.high_priority_cutoff {
                    high_priority_load[index] += 1;
                }
                debug!(
                    "Giao bệnh nhân {} ({}) cho marketer {}",
                    patient.id, patient.facility, marketer.id
                );
                assignments[index].push(patient);
            }
            None => {
                warn!(
                    "Cơ sở {} của bệnh nhân {} không thuộc vùng phủ nào",
                    patient.facility, patient.id
                );
                unassigned.push(patient.id.clone());
            }
        }
    }

    let routes: Vec<MarketingRoute> = marketers
        .iter()
        .zip(assignments)
        .filter(|(_, assigned)| !assigned.is_empty())
        .map(|(marketer, assigned)| build_route(marketer, assigned, directory, date, config))
        .collect();

    info!(
        "Đã dựng {} tuyến cho ngày {date}, {} bệnh nhân chưa phân tuyến",
        routes.len(),
        unassigned.len()
    );

    RoutePlan {
        date,
        routes,
        unassigned,
        reason: None,
    }
}

fn build_route(
    marketer: &Marketer,
    mut assigned: Vec<&PatientPredictionRecord>,
    directory: &FacilityDirectory,
    date: NaiveDate,
    config: &RoutingConfig,
) -> MarketingRoute {
    // Ca mức 1 ra viện ngay trong ngày được kéo lên đầu tuyến.
    assigned.sort_by(|a, b| {
        let a_pulled = is_same_day_urgent(a, date);
        let b_pulled = is_same_day_urgent(b, date);
        b_pulled
            .cmp(&a_pulled)
            .then_with(|| a.predicted_discharge.cmp(&b.predicted_discharge))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut position = marketer.base;
    let mut total_miles = 0.0;
    let mut stops = Vec::with_capacity(assigned.len());

    for patient in assigned {
        let leg_miles = match directory.location_of(&patient.facility) {
            Some(location) => {
                let miles = position.miles_to(&location) * config.circuity_factor;
                position = location;
                miles
            }
            None => 0.0,
        };
        total_miles += leg_miles;
        stops.push(RouteStop {
            patient_id: patient.id.clone(),
            facility: patient.facility.clone(),
            leg_miles: round_tenth(leg_miles),
        });
    }

    if config.include_return_leg && !stops.is_empty() {
        total_miles += position.miles_to(&marketer.base) * config.circuity_factor;
    }

    let estimated_drive_minutes = if config.average_speed_mph > 0.0 {
        (total_miles / config.average_speed_mph * 60.0).round() as u32
    } else {
        0
    };

    MarketingRoute {
        marketer_id: marketer.id.clone(),
        date,
        stops,
        estimated_drive_minutes,
        total_miles: round_tenth(total_miles),
        completed_contacts: 0,
        successful_contacts: 0,
        secured_referrals: 0,
    }
}

fn is_same_day_urgent(patient: &PatientPredictionRecord, date: NaiveDate) -> bool {
    patient.marketing_priority == MarketingPriority::URGENT
        && patient.predicted_discharge_date() == date
}

fn compare_distance(left: Option<f64>, right: Option<f64>) -> Ordering {
    left.unwrap_or(f64::INFINITY)
        .total_cmp(&right.unwrap_or(f64::INFINITY))
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
