//! Phân loại mức ưu tiên tiếp thị 1..5 (1 là cao nhất).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
    AuthorizationStatus, PatientPredictionRecord, PatientStatus, PipelineError, PriorityConfig,
};

/// Mức ưu tiên tiếp thị, số càng nhỏ càng gấp.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub struct MarketingPriority(u8);

impl MarketingPriority {
    pub const URGENT: Self = Self(1);
    pub const HIGH: Self = Self(2);
    pub const MEDIUM: Self = Self(3);
    pub const LOW: Self = Self(4);
    /// Dành cho ca không đủ điều kiện hoặc đã bị hạ ưu tiên.
    pub const DEPRIORITIZED: Self = Self(5);

    pub fn new(level: u8) -> Option<Self> {
        (1..=5).contains(&level).then_some(Self(level))
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

impl Default for MarketingPriority {
    fn default() -> Self {
        Self::DEPRIORITIZED
    }
}

impl TryFrom<u8> for MarketingPriority {
    type Error = PipelineError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level).ok_or_else(|| {
            PipelineError::Config(format!("mức ưu tiên {level} nằm ngoài 1..=5"))
        })
    }
}

impl From<MarketingPriority> for u8 {
    fn from(priority: MarketingPriority) -> Self {
        priority.0
    }
}

/// Dữ liệu đầu vào của bộ phân loại, tách khỏi hồ sơ để kiểm thử độc lập.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityInputs {
    pub risk_score: u8,
    pub status: PatientStatus,
    pub contact_attempts: u32,
    pub authorization_status: AuthorizationStatus,
    pub home_health_eligible: bool,
}

impl From<&PatientPredictionRecord> for PriorityInputs {
    fn from(record: &PatientPredictionRecord) -> Self {
        Self {
            risk_score: record.risk_score,
            status: record.status,
            contact_attempts: record.contact_attempts,
            authorization_status: record.authorization_status,
            home_health_eligible: record.home_health_eligible,
        }
    }
}

pub fn classify(inputs: &PriorityInputs, config: &PriorityConfig) -> MarketingPriority {
    let closed = matches!(
        inputs.status,
        PatientStatus::Lost | PatientStatus::Discharged
    );
    if !inputs.home_health_eligible
        || closed
        || inputs.authorization_status == AuthorizationStatus::Denied
        || inputs.contact_attempts >= config.max_contact_attempts
    {
        return MarketingPriority::DEPRIORITIZED;
    }

    if inputs.risk_score >= config.urgent_threshold {
        MarketingPriority::URGENT
    } else if inputs.risk_score >= config.high_threshold {
        MarketingPriority::HIGH
    } else if inputs.risk_score >= config.medium_threshold {
        MarketingPriority::MEDIUM
    } else {
        MarketingPriority::LOW
    }
}

/// Thứ tự xử lý: ưu tiên, rồi ngày ra viện dự kiến sớm nhất, rồi id.
pub fn priority_order(a: &PatientPredictionRecord, b: &PatientPredictionRecord) -> Ordering {
    a.marketing_priority
        .cmp(&b.marketing_priority)
        .then_with(|| a.predicted_discharge.cmp(&b.predicted_discharge))
        .then_with(|| a.id.cmp(&b.id))
}
