//! Logic lõi chấm điểm bệnh nhân nhập viện, xếp ưu tiên tiếp thị và phân tuyến.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

mod config;
pub mod metrics;
pub mod priority;
pub mod routing;
pub mod scoring;

pub use config::{
    AcuityWeights, DiagnosisRule, PayerRate, PipelineConfig, PriorityConfig, RoutingConfig,
    ScoringConfig,
};
pub use metrics::{aggregate, DashboardMetrics, FacilityAggregate, RegionAggregate, Rollup};
pub use priority::{classify, priority_order, MarketingPriority, PriorityInputs};
pub use routing::{
    generate_routes, CoverageArea, FacilityDirectory, FacilitySite, GeoPoint, Marketer,
    MarketingRoute, PlanReason, RoutePlan, RouteStop,
};
pub use scoring::{score, RiskAssessment};

/// Mức độ nặng khi nhập viện.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum AcuityLevel {
    #[default]
    Low,
    Medium,
    High,
}

/// Nơi bệnh nhân dự kiến về sau khi ra viện.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DischargeDestination {
    #[default]
    Home,
    Snf,
    Ltac,
    Rehab,
    Other,
}

/// Trạng thái quy trình tiếp thị của một ca nhập viện.
///
/// Thứ tự hợp lệ: admitted → contacted → secured | lost → discharged.
/// Có thể bỏ qua bước trung gian nhưng không được đi lùi.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    #[default]
    Admitted,
    Contacted,
    Secured,
    Lost,
    Discharged,
}

impl PatientStatus {
    fn stage(self) -> u8 {
        match self {
            PatientStatus::Admitted => 0,
            PatientStatus::Contacted => 1,
            PatientStatus::Secured | PatientStatus::Lost => 2,
            PatientStatus::Discharged => 3,
        }
    }

    /// `true` nếu chuyển sang `next` không đi lùi trong quy trình.
    pub fn can_advance_to(self, next: PatientStatus) -> bool {
        self == next || next.stage() > self.stage()
    }
}

/// Tình trạng ủy quyền của bên chi trả cho dịch vụ chăm sóc tại nhà.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    #[default]
    NotRequired,
    Pending,
    Approved,
    Denied,
}

/// Kết quả một lần liên hệ với case manager.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContactOutcome {
    Unreached,
    Reached,
    Secured,
}

/// Hồ sơ dự báo ra viện của một bệnh nhân.
///
/// Các trường `risk_score`, `potential_value`, `predicted_los`,
/// `predicted_discharge`, `marketing_priority`, `home_health_eligible` và
/// `discharge_destination` chỉ được tính lại qua [`evaluate_record`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientPredictionRecord {
    pub id: String,
    pub mrn: Option<String>,
    pub patient_name: String,
    pub dob: Option<NaiveDate>,
    pub age: Option<u32>,
    pub gender: Option<String>,

    pub primary_diagnosis: String,
    #[serde(default)]
    pub icd10_codes: Vec<String>,
    #[serde(default)]
    pub comorbidities: Vec<String>,
    #[serde(default)]
    pub acuity_level: AcuityLevel,

    pub facility: String,
    pub unit: Option<String>,
    pub admitting_physician: Option<String>,
    pub insurance: String,
    pub insurance_id: Option<String>,
    #[serde(default)]
    pub authorization_status: AuthorizationStatus,

    pub admission_date: DateTime<Utc>,
    /// Số ngày nằm viện do hệ thống nguồn ước tính (nếu có).
    pub reported_los: Option<u32>,
    pub predicted_los: u32,
    pub predicted_discharge: DateTime<Utc>,
    pub actual_discharge: Option<DateTime<Utc>>,

    pub risk_score: u8,
    pub potential_value: f64,
    #[serde(default)]
    pub marketing_priority: MarketingPriority,
    pub home_health_eligible: bool,
    /// Nơi về do nhóm kế hoạch ra viện xác nhận, ưu tiên hơn dự đoán.
    pub planned_destination: Option<DischargeDestination>,
    #[serde(default)]
    pub discharge_destination: DischargeDestination,

    #[serde(default)]
    pub status: PatientStatus,
    #[serde(default)]
    pub referral_secured: bool,

    pub assigned_marketer: Option<String>,
    pub assigned_nurse: Option<String>,
    pub case_manager: Option<String>,
    #[serde(default)]
    pub contact_attempts: u32,
    pub last_contact_date: Option<DateTime<Utc>>,
}

impl PatientPredictionRecord {
    /// Khởi tạo hồ sơ với ba trường định danh bắt buộc, các trường khác để mặc định.
    pub fn new(
        id: impl Into<String>,
        patient_name: impl Into<String>,
        admission_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            mrn: None,
            patient_name: patient_name.into(),
            dob: None,
            age: None,
            gender: None,
            primary_diagnosis: "Unspecified".to_string(),
            icd10_codes: Vec::new(),
            comorbidities: Vec::new(),
            acuity_level: AcuityLevel::Low,
            facility: "Unknown facility".to_string(),
            unit: None,
            admitting_physician: None,
            insurance: "Unknown".to_string(),
            insurance_id: None,
            authorization_status: AuthorizationStatus::NotRequired,
            admission_date,
            reported_los: None,
            predicted_los: 0,
            predicted_discharge: admission_date,
            actual_discharge: None,
            risk_score: 0,
            potential_value: 0.0,
            marketing_priority: MarketingPriority::DEPRIORITIZED,
            home_health_eligible: false,
            planned_destination: None,
            discharge_destination: DischargeDestination::Home,
            status: PatientStatus::Admitted,
            referral_secured: false,
            assigned_marketer: None,
            assigned_nurse: None,
            case_manager: None,
            contact_attempts: 0,
            last_contact_date: None,
        }
    }

    /// Ngày ra viện dự kiến (UTC).
    pub fn predicted_discharge_date(&self) -> NaiveDate {
        self.predicted_discharge.date_naive()
    }

    /// Số ngày nằm viện: thực tế nếu đã ra viện, ngược lại dùng dự đoán.
    pub fn effective_los_days(&self) -> f64 {
        match self.actual_discharge {
            Some(discharged) => {
                let minutes = (discharged - self.admission_date).num_minutes().max(0);
                minutes as f64 / (24.0 * 60.0)
            }
            None => f64::from(self.predicted_los),
        }
    }

    /// Ca đã chuyển đổi thành referral thành công.
    pub fn is_converted(&self) -> bool {
        match self.status {
            PatientStatus::Secured => true,
            PatientStatus::Discharged => self.referral_secured,
            _ => false,
        }
    }

    /// Chuyển trạng thái, từ chối mọi bước đi lùi.
    pub fn advance_status(&mut self, next: PatientStatus) -> Result<(), PipelineError> {
        if !self.status.can_advance_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        if next == PatientStatus::Secured {
            self.referral_secured = true;
        }
        self.status = next;
        Ok(())
    }

    /// Ghi nhận một lần liên hệ và cập nhật trạng thái tương ứng.
    pub fn register_contact(
        &mut self,
        outcome: ContactOutcome,
        at: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        let target = match outcome {
            ContactOutcome::Secured => Some(PatientStatus::Secured),
            _ if self.status == PatientStatus::Admitted => Some(PatientStatus::Contacted),
            _ => None,
        };
        if let Some(target) = target {
            self.advance_status(target)?;
        }
        self.contact_attempts = self.contact_attempts.saturating_add(1);
        self.last_contact_date = Some(at);
        Ok(())
    }
}

/// Chấm điểm và xếp ưu tiên lại cho một hồ sơ.
pub fn evaluate_record(record: &mut PatientPredictionRecord, config: &PipelineConfig) {
    let assessment = scoring::score(record, &config.scoring);
    record.risk_score = assessment.risk_score;
    record.potential_value = assessment.potential_value;
    record.predicted_los = assessment.predicted_los_days;
    record.predicted_discharge = record
        .admission_date
        .checked_add_signed(Duration::days(i64::from(assessment.predicted_los_days)))
        .unwrap_or(record.admission_date);
    record.discharge_destination = assessment.discharge_destination;
    record.home_health_eligible = assessment.home_health_eligible;
    record.marketing_priority =
        priority::classify(&PriorityInputs::from(&*record), &config.priority);
}

/// Chấm điểm toàn bộ danh sách rồi sắp theo thứ tự ưu tiên.
pub fn evaluate_all(records: &mut [PatientPredictionRecord], config: &PipelineConfig) {
    for record in records.iter_mut() {
        evaluate_record(record, config);
    }
    records.sort_by(priority_order);
    log::info!("Đã chấm điểm {} hồ sơ nhập viện", records.len());
}

/// Lỗi chung của pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("Bản ghi #{index} thiếu trường bắt buộc: {}", .missing.join(", "))]
    MalformedRecord { index: usize, missing: Vec<String> },
    #[error("Chưa cấu hình marketer nào để phân tuyến")]
    NoMarketersConfigured,
    #[error("Không lấy được dữ liệu từ nguồn: {0}")]
    ExternalFetch(String),
    #[error("Không thể chuyển trạng thái từ {from:?} sang {to:?}")]
    InvalidTransition {
        from: PatientStatus,
        to: PatientStatus,
    },
    #[error("Bệnh nhân {0} không có trong tuyến")]
    UnknownStop(String),
    #[error("Cấu hình không hợp lệ: {0}")]
    Config(String),
}
