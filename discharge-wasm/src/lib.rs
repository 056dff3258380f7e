//! Cầu nối WASM <-> JavaScript cho dashboard tiếp thị, không phụ thuộc framework.

use chrono::NaiveDate;
use discharge_core::{
    FacilityDirectory, Marketer, PatientPredictionRecord, PipelineConfig, PipelineError,
};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
struct JsPipelineConfig {
    #[serde(default)]
    urgent_threshold: Option<u8>,
    #[serde(default)]
    high_threshold: Option<u8>,
    #[serde(default)]
    medium_threshold: Option<u8>,
    #[serde(default)]
    max_contact_attempts: Option<u32>,
    #[serde(default)]
    comorbidity_threshold: Option<usize>,
    #[serde(default)]
    elderly_age: Option<u32>,
    #[serde(default)]
    default_daily_rate: Option<f64>,
    #[serde(default)]
    average_speed_mph: Option<f64>,
    #[serde(default)]
    circuity_factor: Option<f64>,
    #[serde(default)]
    include_return_leg: Option<bool>,
}

impl From<JsPipelineConfig> for PipelineConfig {
    fn from(cfg: JsPipelineConfig) -> Self {
        let mut base = PipelineConfig::default();
        if let Some(value) = cfg.urgent_threshold {
            base.priority.urgent_threshold = value;
        }
        if let Some(value) = cfg.high_threshold {
            base.priority.high_threshold = value;
        }
        if let Some(value) = cfg.medium_threshold {
            base.priority.medium_threshold = value;
        }
        if let Some(value) = cfg.max_contact_attempts {
            base.priority.max_contact_attempts = value;
        }
        if let Some(value) = cfg.comorbidity_threshold {
            base.scoring.comorbidity_threshold = value;
        }
        if let Some(value) = cfg.elderly_age {
            base.scoring.elderly_age = value;
        }
        if let Some(value) = cfg.default_daily_rate {
            base.scoring.default_daily_rate = value;
        }
        if let Some(value) = cfg.average_speed_mph {
            base.routing.average_speed_mph = value;
        }
        if let Some(value) = cfg.circuity_factor {
            base.routing.circuity_factor = value;
        }
        if let Some(value) = cfg.include_return_leg {
            base.routing.include_return_leg = value;
        }
        base
    }
}

/// Chuẩn hóa, chấm điểm và xếp ưu tiên danh sách nhập viện thô.
#[wasm_bindgen]
pub fn process_admissions(raw: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let payload = from_value::<serde_json::Value>(raw)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được JSON nhập viện: {err}")))?;
    let cfg = read_config(config)?;

    let batch = discharge_intake::process_admissions_value(&payload, &cfg)
        .map_err(|err| JsValue::from_str(&format_pipeline_error(err)))?;

    to_js(&batch)
}

/// Dựng tuyến trong ngày từ các hồ sơ đã chấm điểm.
#[wasm_bindgen]
pub fn generate_routes(
    records: JsValue,
    marketers: JsValue,
    facilities: JsValue,
    date: String,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let records: Vec<PatientPredictionRecord> = from_value(records)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được hồ sơ: {err}")))?;
    let marketers: Vec<Marketer> = from_value(marketers)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được marketer: {err}")))?;
    let directory: FacilityDirectory = from_value(facilities)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được danh bạ cơ sở: {err}")))?;
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|err| JsValue::from_str(&format!("Ngày không hợp lệ {date}: {err}")))?;
    let cfg = read_config(config)?;

    let plan =
        discharge_core::generate_routes(&records, &marketers, &directory, date, &cfg.routing);
    to_js(&plan)
}

/// Tổng hợp chỉ số theo cơ sở và vùng.
#[wasm_bindgen]
pub fn aggregate_metrics(records: JsValue, facilities: JsValue) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let records: Vec<PatientPredictionRecord> = from_value(records)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được hồ sơ: {err}")))?;
    let directory: FacilityDirectory = from_value(facilities)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được danh bạ cơ sở: {err}")))?;

    to_js(&discharge_core::aggregate(&records, &directory))
}

fn read_config(config: Option<JsValue>) -> Result<PipelineConfig, JsValue> {
    let cfg = match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsPipelineConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}")))?;
            PipelineConfig::from(cfg)
        }
        _ => PipelineConfig::default(),
    };
    cfg.validate()
        .map_err(|err| JsValue::from_str(&format_pipeline_error(err)))?;
    Ok(cfg)
}

// Map thành object thường thay vì `Map` để JS đọc trực tiếp.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(|err| JsValue::from_str(&format!("Không serialize kết quả: {err}")))
}

fn format_pipeline_error(err: PipelineError) -> String {
    format!("Pipeline error: {err}")
}
