//! Review form, submission and analytics types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of input a form field collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Rating,
    Select,
    Checkbox,
    Email,
    Phone,
    Date,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewField {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rating: Option<i32>,
    /// Presentation of rating fields: stars, hearts or thumbs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_type: Option<String>,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormSettings {
    pub allow_anonymous: bool,
    pub require_email: bool,
    pub show_progress: bool,
    pub redirect_url: Option<String>,
    pub thank_you_message: String,
    pub collect_location: bool,
    pub collect_device_info: bool,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            allow_anonymous: true,
            require_email: false,
            show_progress: true,
            redirect_url: None,
            thank_you_message: "Thank you for your feedback!".to_string(),
            collect_location: true,
            collect_device_info: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewForm {
    pub id: String,
    pub business_id: String,
    pub title: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub fields: Vec<ReviewField>,
    pub settings: FormSettings,
}

/// One answer within a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldResponse {
    pub field_id: String,
    pub value: Value,
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub form_id: String,
    pub business_id: String,
    pub submitted_at: DateTime<Utc>,
    pub user_info: Map<String, Value>,
    pub responses: Vec<FieldResponse>,
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormRequest {
    pub business_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<ReviewField>,
    #[serde(default)]
    pub settings: FormSettings,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFormRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub fields: Option<Vec<ReviewField>>,
    pub settings: Option<FormSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub responses: Vec<FieldResponse>,
    #[serde(default)]
    pub user_info: Option<Map<String, Value>>,
    #[serde(default)]
    pub device_info: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAnalytics {
    pub field_id: String,
    pub field_label: String,
    pub field_type: FieldType,
    pub response_count: usize,
    pub average_value: Option<f64>,
    pub common_responses: Vec<ValueCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationStat {
    pub country: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStat {
    pub platform: String,
    pub browser: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeStat {
    /// Calendar day in `YYYY-MM-DD` form (UTC).
    pub date: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormAnalytics {
    pub total_submissions: usize,
    /// Percentage of submissions answering every field.
    pub completion_rate: f64,
    pub average_rating: f64,
    pub field_analytics: Vec<FieldAnalytics>,
    pub location_stats: Vec<LocationStat>,
    pub device_stats: Vec<DeviceStat>,
    pub time_stats: Vec<TimeStat>,
}
