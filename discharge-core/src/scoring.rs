//! Chấm điểm rủi ro và giá trị tiềm năng theo trọng số cấu hình.
//!
//! Hàm thuần: cùng hồ sơ và cùng cấu hình luôn cho cùng kết quả.

use serde::{Deserialize, Serialize};

use crate::{
    AcuityLevel, DiagnosisRule, DischargeDestination, PatientPredictionRecord, PayerRate,
    ScoringConfig,
};

/// Kết quả chấm điểm một hồ sơ.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub risk_score: u8,
    pub potential_value: f64,
    pub predicted_los_days: u32,
    pub discharge_destination: DischargeDestination,
    pub home_health_eligible: bool,
    pub diagnosis_category: Option<String>,
}

pub fn score(record: &PatientPredictionRecord, config: &ScoringConfig) -> RiskAssessment {
    let rule = match_diagnosis(record, &config.diagnosis_rules);
    let payer = match_payer(&record.insurance, &config.payer_rates);

    let base = rule.map_or(config.default_base_risk, |rule| rule.base_risk);
    let extra = record
        .comorbidities
        .len()
        .saturating_sub(config.comorbidity_threshold);
    let comorbidity_points = u32::try_from(extra)
        .unwrap_or(u32::MAX)
        .saturating_mul(u32::from(config.per_extra_comorbidity));
    let age_points = match record.age {
        Some(age) if age > config.elderly_age => u32::from(config.elderly_bonus),
        _ => 0,
    };
    let acuity_points = u32::from(match record.acuity_level {
        AcuityLevel::Low => config.acuity_bonus.low,
        AcuityLevel::Medium => config.acuity_bonus.medium,
        AcuityLevel::High => config.acuity_bonus.high,
    });

    let raw = u32::from(base)
        .saturating_add(comorbidity_points)
        .saturating_add(age_points)
        .saturating_add(acuity_points);
    let risk_score = raw.min(100) as u8;

    let predicted_los_days = predict_los(record, rule, config);
    let daily_rate = payer.map_or(config.default_daily_rate, |payer| payer.daily_rate);
    let potential_value = round_cents(f64::from(predicted_los_days) * daily_rate);

    let discharge_destination = predict_destination(record, rule, config);
    let covers_home_health =
        payer.map_or(config.default_covers_home_health, |payer| payer.covers_home_health);
    let home_health_eligible = rule.map_or(true, |rule| rule.home_health_eligible)
        && covers_home_health
        && discharge_destination == DischargeDestination::Home;

    RiskAssessment {
        risk_score,
        potential_value,
        predicted_los_days,
        discharge_destination,
        home_health_eligible,
        diagnosis_category: rule.map(|rule| rule.category.clone()),
    }
}

/// Tìm nhóm chẩn đoán đầu tiên khớp theo từ khóa hoặc tiền tố ICD-10.
pub fn match_diagnosis<'a>(
    record: &PatientPredictionRecord,
    rules: &'a [DiagnosisRule],
) -> Option<&'a DiagnosisRule> {
    let diagnosis = record.primary_diagnosis.to_lowercase();
    rules.iter().find(|rule| {
        rule.keywords
            .iter()
            .any(|keyword| !keyword.is_empty() && diagnosis.contains(&keyword.to_lowercase()))
            || rule.icd10_prefixes.iter().any(|prefix| {
                record
                    .icd10_codes
                    .iter()
                    .any(|code| code.trim().to_uppercase().starts_with(&prefix.to_uppercase()))
            })
    })
}

/// Tìm đơn giá bên chi trả đầu tiên có từ khóa nằm trong tên bảo hiểm.
pub fn match_payer<'a>(insurance: &str, rates: &'a [PayerRate]) -> Option<&'a PayerRate> {
    let insurance = insurance.to_lowercase();
    rates.iter().find(|rate| {
        rate.match_terms
            .iter()
            .any(|term| !term.is_empty() && insurance.contains(&term.to_lowercase()))
    })
}

fn predict_los(
    record: &PatientPredictionRecord,
    rule: Option<&DiagnosisRule>,
    config: &ScoringConfig,
) -> u32 {
    if let Some(reported) = record.reported_los.filter(|days| *days > 0) {
        return reported.min(config.max_los_days);
    }
    let base = rule.map_or(config.default_los_days, |rule| rule.base_los_days);
    let days = if record.acuity_level == AcuityLevel::High {
        base.saturating_add(config.high_acuity_extra_los_days)
    } else {
        base
    };
    days.min(config.max_los_days)
}

fn predict_destination(
    record: &PatientPredictionRecord,
    rule: Option<&DiagnosisRule>,
    config: &ScoringConfig,
) -> DischargeDestination {
    if let Some(planned) = record.planned_destination {
        return planned;
    }
    let elderly_high_acuity = record.acuity_level == AcuityLevel::High
        && record.age.is_some_and(|age| age >= config.snf_age);
    if elderly_high_acuity {
        return DischargeDestination::Snf;
    }
    rule.map_or(DischargeDestination::Home, |rule| rule.typical_destination)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
