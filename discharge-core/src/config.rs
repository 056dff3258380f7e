//! Cấu hình trọng số chấm điểm, ngưỡng ưu tiên và tham số phân tuyến.

use serde::{Deserialize, Serialize};

use crate::{DischargeDestination, PipelineError};

/// Toàn bộ cấu hình được truyền vào pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub scoring: ScoringConfig,
    pub priority: PriorityConfig,
    pub routing: RoutingConfig,
}

impl PipelineConfig {
    /// Kiểm tra các ngưỡng và tham số trước khi chạy.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let p = &self.priority;
        if !(p.urgent_threshold >= p.high_threshold && p.high_threshold >= p.medium_threshold) {
            return Err(PipelineError::Config(format!(
                "ngưỡng ưu tiên phải giảm dần, nhận {}/{}/{}",
                p.urgent_threshold, p.high_threshold, p.medium_threshold
            )));
        }
        if p.urgent_threshold > 100 {
            return Err(PipelineError::Config(
                "ngưỡng khẩn cấp vượt quá 100".to_string(),
            ));
        }
        if self.scoring.max_los_days == 0 {
            return Err(PipelineError::Config(
                "trần số ngày nằm viện phải lớn hơn 0".to_string(),
            ));
        }
        if !(self.routing.average_speed_mph > 0.0) {
            return Err(PipelineError::Config(
                "tốc độ trung bình phải lớn hơn 0".to_string(),
            ));
        }
        if !(self.routing.circuity_factor >= 1.0) {
            return Err(PipelineError::Config(
                "hệ số đường vòng phải >= 1".to_string(),
            ));
        }
        if self.routing.high_priority_cutoff == 0 || self.routing.high_priority_cutoff > 5 {
            return Err(PipelineError::Config(
                "high_priority_cutoff phải nằm trong 1..=5".to_string(),
            ));
        }
        if let Some(rate) = self
            .scoring
            .payer_rates
            .iter()
            .find(|rate| !(rate.daily_rate >= 0.0))
        {
            return Err(PipelineError::Config(format!(
                "đơn giá ngày của {} không hợp lệ",
                rate.payer
            )));
        }
        if !(self.scoring.default_daily_rate >= 0.0) {
            return Err(PipelineError::Config(
                "đơn giá ngày mặc định không hợp lệ".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trọng số của bộ chấm điểm rủi ro/giá trị.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    /// Bảng tra nhóm chẩn đoán, dùng quy tắc khớp đầu tiên.
    pub diagnosis_rules: Vec<DiagnosisRule>,
    pub default_base_risk: u8,
    pub default_los_days: u32,
    /// Số bệnh kèm được "miễn" trước khi bắt đầu cộng điểm.
    pub comorbidity_threshold: usize,
    pub per_extra_comorbidity: u8,
    pub elderly_age: u32,
    pub elderly_bonus: u8,
    pub acuity_bonus: AcuityWeights,
    pub high_acuity_extra_los_days: u32,
    /// Trần số ngày nằm viện dự đoán, áp cho cả giá trị báo từ nguồn.
    pub max_los_days: u32,
    /// Tuổi từ đó ca nặng được dự đoán chuyển SNF thay vì về nhà.
    pub snf_age: u32,
    /// Bảng đơn giá theo bên chi trả, dùng quy tắc khớp đầu tiên.
    pub payer_rates: Vec<PayerRate>,
    pub default_daily_rate: f64,
    pub default_covers_home_health: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            diagnosis_rules: default_diagnosis_rules(),
            default_base_risk: 30,
            default_los_days: 3,
            comorbidity_threshold: 1,
            per_extra_comorbidity: 5,
            elderly_age: 70,
            elderly_bonus: 10,
            acuity_bonus: AcuityWeights::default(),
            high_acuity_extra_los_days: 2,
            max_los_days: 365,
            snf_age: 80,
            payer_rates: default_payer_rates(),
            default_daily_rate: 250.0,
            default_covers_home_health: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcuityWeights {
    pub low: u8,
    pub medium: u8,
    pub high: u8,
}

impl Default for AcuityWeights {
    fn default() -> Self {
        Self {
            low: 0,
            medium: 7,
            high: 15,
        }
    }
}

/// Một dòng trong bảng tra nhóm chẩn đoán.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisRule {
    pub category: String,
    /// Từ khóa so khớp không phân biệt hoa thường trong chẩn đoán chính.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Tiền tố mã ICD-10.
    #[serde(default)]
    pub icd10_prefixes: Vec<String>,
    pub base_risk: u8,
    pub base_los_days: u32,
    pub home_health_eligible: bool,
    #[serde(default)]
    pub typical_destination: DischargeDestination,
}

impl DiagnosisRule {
    fn new(
        category: &str,
        keywords: &[&str],
        icd10_prefixes: &[&str],
        base_risk: u8,
        base_los_days: u32,
        home_health_eligible: bool,
        typical_destination: DischargeDestination,
    ) -> Self {
        Self {
            category: category.to_string(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            icd10_prefixes: icd10_prefixes.iter().map(|s| s.to_string()).collect(),
            base_risk,
            base_los_days,
            home_health_eligible,
            typical_destination,
        }
    }
}

/// Đơn giá bồi hoàn bình quân mỗi ngày theo bên chi trả.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayerRate {
    pub payer: String,
    #[serde(default)]
    pub match_terms: Vec<String>,
    pub daily_rate: f64,
    #[serde(default = "covers_by_default")]
    pub covers_home_health: bool,
}

fn covers_by_default() -> bool {
    true
}

impl PayerRate {
    fn new(payer: &str, match_terms: &[&str], daily_rate: f64, covers_home_health: bool) -> Self {
        Self {
            payer: payer.to_string(),
            match_terms: match_terms.iter().map(|s| s.to_string()).collect(),
            daily_rate,
            covers_home_health,
        }
    }
}

/// Ngưỡng điểm cho các mức ưu tiên 1..4.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PriorityConfig {
    pub urgent_threshold: u8,
    pub high_threshold: u8,
    pub medium_threshold: u8,
    /// Số lần liên hệ tối đa trước khi hạ xuống mức 5.
    pub max_contact_attempts: u32,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            urgent_threshold: 90,
            high_threshold: 75,
            medium_threshold: 50,
            max_contact_attempts: 6,
        }
    }
}

/// Tham số ước lượng quãng đường và phân bổ tải.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoutingConfig {
    /// Mức ưu tiên (bao gồm) được tính là "ưu tiên cao" khi cân tải.
    pub high_priority_cutoff: u8,
    pub average_speed_mph: f64,
    /// Hệ số nhân quãng đường chim bay để xấp xỉ đường bộ.
    pub circuity_factor: f64,
    pub include_return_leg: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            high_priority_cutoff: 2,
            average_speed_mph: 32.0,
            circuity_factor: 1.2,
            include_return_leg: true,
        }
    }
}

fn default_diagnosis_rules() -> Vec<DiagnosisRule> {
    use DischargeDestination::{Home, Ltac, Rehab};
    vec![
        DiagnosisRule::new(
            "heart_failure",
            &["heart failure", "chf", "cardiomyopathy"],
            &["I50"],
            60,
            5,
            true,
            Home,
        ),
        DiagnosisRule::new(
            "respiratory_failure",
            &["respiratory failure", "ventilator"],
            &["J96"],
            70,
            9,
            false,
            Ltac,
        ),
        DiagnosisRule::new(
            "copd",
            &["copd", "chronic obstructive"],
            &["J44"],
            55,
            4,
            true,
            Home,
        ),
        DiagnosisRule::new("sepsis", &["sepsis", "septic"], &["A41"], 58, 7, true, Home),
        DiagnosisRule::new(
            "stroke",
            &["stroke", "cerebral infarction", "cva"],
            &["I63"],
            62,
            6,
            true,
            Rehab,
        ),
        DiagnosisRule::new("pneumonia", &["pneumonia"], &["J18"], 45, 4, true, Home),
        DiagnosisRule::new(
            "wound_care",
            &["wound", "cellulitis", "pressure ulcer"],
            &["L03", "L89"],
            42,
            4,
            true,
            Home,
        ),
        DiagnosisRule::new(
            "orthopedic",
            &["hip fracture", "joint replacement", "arthroplasty", "knee replacement"],
            &["S72", "Z96"],
            40,
            3,
            true,
            Home,
        ),
        DiagnosisRule::new(
            "diabetes",
            &["diabetes", "diabetic"],
            &["E11"],
            40,
            3,
            true,
            Home,
        ),
    ]
}

fn default_payer_rates() -> Vec<PayerRate> {
    vec![
        PayerRate::new(
            "Medicare Advantage",
            &["medicare advantage", "humana", "aetna medicare"],
            380.0,
            true,
        ),
        PayerRate::new("Medicare", &["medicare"], 450.0, true),
        PayerRate::new("Medicaid", &["medicaid", "molina", "meridian"], 260.0, true),
        PayerRate::new(
            "Commercial",
            &["blue cross", "bcbs", "priority health", "united", "aetna", "cigna", "commercial"],
            420.0,
            true,
        ),
        PayerRate::new("Self-pay", &["self-pay", "self pay", "uninsured"], 0.0, false),
    ]
}
