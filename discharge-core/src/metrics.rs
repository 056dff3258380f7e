//! Tổng hợp chỉ số theo cơ sở, theo vùng và toàn bộ cho dashboard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{FacilityDirectory, PatientPredictionRecord, PatientStatus};

const UNASSIGNED_REGION: &str = "Unassigned";

/// Bộ số liệu dùng chung cho mọi cấp tổng hợp.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Rollup {
    pub admissions: usize,
    pub conversions: usize,
    pub conversion_rate: f64,
    pub home_health_eligible: usize,
    pub average_los_days: f64,
    pub total_potential_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FacilityAggregate {
    pub facility: String,
    pub region: String,
    #[serde(flatten)]
    pub rollup: Rollup,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionAggregate {
    pub region: String,
    pub facilities: usize,
    #[serde(flatten)]
    pub rollup: Rollup,
}

/// Ảnh chụp chỉ số, dựng lại hoàn toàn mỗi lần làm mới.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardMetrics {
    pub facilities: Vec<FacilityAggregate>,
    pub regions: Vec<RegionAggregate>,
    pub totals: Rollup,
    pub by_status: BTreeMap<PatientStatus, usize>,
    pub by_priority: BTreeMap<u8, usize>,
}

impl DashboardMetrics {
    pub fn facility(&self, name: &str) -> Option<&FacilityAggregate> {
        self.facilities.iter().find(|agg| agg.facility == name)
    }

    pub fn region(&self, name: &str) -> Option<&RegionAggregate> {
        self.regions.iter().find(|agg| agg.region == name)
    }
}

#[derive(Default)]
struct Accumulator {
    admissions: usize,
    conversions: usize,
    eligible: usize,
    los_sum: f64,
    value_sum: f64,
}

impl Accumulator {
    fn push(&mut self, record: &PatientPredictionRecord) {
        self.admissions += 1;
        if record.is_converted() {
            self.conversions += 1;
        }
        if record.home_health_eligible {
            self.eligible += 1;
        }
        self.los_sum += record.effective_los_days();
        self.value_sum += record.potential_value;
    }

    fn finish(&self) -> Rollup {
        let ratio = |part: f64| {
            if self.admissions == 0 {
                0.0
            } else {
                part / self.admissions as f64
            }
        };
        Rollup {
            admissions: self.admissions,
            conversions: self.conversions,
            conversion_rate: round2(ratio(self.conversions as f64)),
            home_health_eligible: self.eligible,
            average_los_days: round2(ratio(self.los_sum)),
            total_potential_value: round2(self.value_sum),
        }
    }
}

pub fn aggregate(
    records: &[PatientPredictionRecord],
    directory: &FacilityDirectory,
) -> DashboardMetrics {
    let mut by_facility: BTreeMap<&str, Accumulator> = BTreeMap::new();
    let mut by_region: BTreeMap<String, (Accumulator, usize)> = BTreeMap::new();
    let mut totals = Accumulator::default();
    let mut by_status = BTreeMap::new();
    let mut by_priority = BTreeMap::new();

    for record in records {
        by_facility
            .entry(record.facility.as_str())
            .or_default()
            .push(record);
        totals.push(record);
        *by_status.entry(record.status).or_insert(0) += 1;
        *by_priority
            .entry(record.marketing_priority.level())
            .or_insert(0) += 1;
    }

    let facilities: Vec<FacilityAggregate> = by_facility
        .into_iter()
        .map(|(facility, acc)| {
            let region = region_for(facility, directory);
            let entry = by_region
                .entry(region.clone())
                .or_insert_with(|| (Accumulator::default(), 0));
            entry.0.admissions += acc.admissions;
            entry.0.conversions += acc.conversions;
            entry.0.eligible += acc.eligible;
            entry.0.los_sum += acc.los_sum;
            entry.0.value_sum += acc.value_sum;
            entry.1 += 1;
            FacilityAggregate {
                facility: facility.to_string(),
                region,
                rollup: acc.finish(),
            }
        })
        .collect();

    let regions = by_region
        .into_iter()
        .map(|(region, (acc, facilities))| RegionAggregate {
            region,
            facilities,
            rollup: acc.finish(),
        })
        .collect();

    DashboardMetrics {
        facilities,
        regions,
        totals: totals.finish(),
        by_status,
        by_priority,
    }
}

fn region_for(facility: &str, directory: &FacilityDirectory) -> String {
    directory
        .region_of(facility)
        .unwrap_or(UNASSIGNED_REGION)
        .to_string()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
