//! Aggregates computed over a form's submissions.

use super::models::{
    DeviceStat, FieldAnalytics, FieldType, FormAnalytics, LocationStat, ReviewForm, Submission,
    TimeStat, ValueCount,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Values listed per field in `commonResponses`.
const TOP_RESPONSES: usize = 5;

const UNKNOWN: &str = "Unknown";

/// Compute analytics for a form.
pub fn compute(form: &ReviewForm, submissions: &[Submission]) -> FormAnalytics {
    let total = submissions.len();

    let ratings: Vec<f64> = submissions
        .iter()
        .flat_map(|s| &s.responses)
        .filter(|r| r.field_type == FieldType::Rating)
        .filter_map(|r| numeric(&r.value))
        .collect();

    FormAnalytics {
        total_submissions: total,
        completion_rate: completion_rate(form, submissions),
        average_rating: mean(&ratings).unwrap_or(0.0),
        field_analytics: form
            .fields
            .iter()
            .map(|field| {
                let values: Vec<&Value> = submissions
                    .iter()
                    .flat_map(|s| &s.responses)
                    .filter(|r| r.field_id == field.id && is_answered(&r.value))
                    .map(|r| &r.value)
                    .collect();

                let average_value = if field.field_type == FieldType::Rating {
                    let nums: Vec<f64> = values.iter().filter_map(|v| numeric(v)).collect();
                    mean(&nums)
                } else {
                    None
                };

                FieldAnalytics {
                    field_id: field.id.clone(),
                    field_label: field.label.clone(),
                    field_type: field.field_type,
                    response_count: values.len(),
                    average_value,
                    common_responses: common_responses(&values),
                }
            })
            .collect(),
        location_stats: location_stats(submissions),
        device_stats: device_stats(submissions),
        time_stats: time_stats(submissions),
    }
}

fn completion_rate(form: &ReviewForm, submissions: &[Submission]) -> f64 {
    if submissions.is_empty() {
        return 0.0;
    }
    let complete = submissions
        .iter()
        .filter(|s| {
            form.fields.iter().all(|field| {
                s.responses
                    .iter()
                    .any(|r| r.field_id == field.id && is_answered(&r.value))
            })
        })
        .count();
    complete as f64 * 100.0 / submissions.len() as f64
}

/// Whether a response value carries an answer.
pub(crate) fn is_answered(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        _ => true,
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn common_responses(values: &[&Value]) -> Vec<ValueCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in values {
        match value {
            // Checkbox answers count each selected option.
            Value::Array(items) => {
                for item in items {
                    *counts.entry(display(item)).or_default() += 1;
                }
            }
            other => *counts.entry(display(other)).or_default() += 1,
        }
    }
    let mut sorted = sorted_counts(counts);
    sorted.truncate(TOP_RESPONSES);
    sorted
        .into_iter()
        .map(|(value, count)| ValueCount { value, count })
        .collect()
}

/// Sort by count descending, then key ascending.
fn sorted_counts<K: Ord>(counts: HashMap<K, usize>) -> Vec<(K, usize)> {
    let mut entries: Vec<(K, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

fn info_str(submission: &Submission, section: &str, key: &str) -> String {
    submission
        .user_info
        .get(section)
        .and_then(|v| v.get(key))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

fn location_stats(submissions: &[Submission]) -> Vec<LocationStat> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for s in submissions {
        *counts.entry(info_str(s, "location", "country")).or_default() += 1;
    }
    sorted_counts(counts)
        .into_iter()
        .map(|(country, count)| LocationStat { country, count })
        .collect()
}

fn device_stats(submissions: &[Submission]) -> Vec<DeviceStat> {
    let mut counts: HashMap<(String, String), usize> = HashMap::new();
    for s in submissions {
        let key = (info_str(s, "device", "platform"), info_str(s, "device", "browser"));
        *counts.entry(key).or_default() += 1;
    }
    sorted_counts(counts)
        .into_iter()
        .map(|((platform, browser), count)| DeviceStat {
            platform,
            browser,
            count,
        })
        .collect()
}

fn time_stats(submissions: &[Submission]) -> Vec<TimeStat> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for s in submissions {
        *counts
            .entry(s.submitted_at.format("%Y-%m-%d").to_string())
            .or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(date, count)| TimeStat { date, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reviews::models::{FieldResponse, FormSettings, ReviewField};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn field(id: &str, field_type: FieldType) -> ReviewField {
        ReviewField {
            id: id.to_string(),
            field_type,
            label: id.to_uppercase(),
            placeholder: None,
            required: false,
            options: None,
            min_rating: None,
            max_rating: None,
            rating_type: None,
            order: 0,
        }
    }

    fn form() -> ReviewForm {
        let now = Utc::now();
        ReviewForm {
            id: "form-1".to_string(),
            business_id: "biz-1".to_string(),
            title: "Feedback".to_string(),
            description: String::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
            fields: vec![
                field("stars", FieldType::Rating),
                field("perks", FieldType::Checkbox),
            ],
            settings: FormSettings::default(),
        }
    }

    fn submission(day: u32, rating: Value, perks: Option<Value>, user_info: Value) -> Submission {
        let mut responses = vec![FieldResponse {
            field_id: "stars".to_string(),
            value: rating,
            field_type: FieldType::Rating,
        }];
        if let Some(p) = perks {
            responses.push(FieldResponse {
                field_id: "perks".to_string(),
                value: p,
                field_type: FieldType::Checkbox,
            });
        }
        Submission {
            id: format!("s-{}", day),
            form_id: "form-1".to_string(),
            business_id: "biz-1".to_string(),
            submitted_at: Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap(),
            user_info: user_info.as_object().cloned().unwrap_or_default(),
            responses,
            is_anonymous: true,
        }
    }

    #[test]
    fn test_empty_form_analytics() {
        let analytics = compute(&form(), &[]);
        assert_eq!(analytics.total_submissions, 0);
        assert_eq!(analytics.completion_rate, 0.0);
        assert_eq!(analytics.average_rating, 0.0);
        assert_eq!(analytics.field_analytics.len(), 2);
        assert!(analytics.field_analytics[0].average_value.is_none());
    }

    #[test]
    fn test_aggregates() {
        let subs = vec![
            submission(
                1,
                json!(5),
                Some(json!(["wifi", "parking"])),
                json!({"location": {"country": "India"}, "device": {"platform": "iOS", "browser": "Safari"}}),
            ),
            submission(
                1,
                json!("3"),
                Some(json!(["wifi"])),
                json!({"location": {"country": "India"}}),
            ),
            submission(2, json!(4), None, json!({})),
        ];

        let analytics = compute(&form(), &subs);
        assert_eq!(analytics.total_submissions, 3);
        assert!((analytics.average_rating - 4.0).abs() < 1e-9);
        assert!((analytics.completion_rate - 200.0 / 3.0).abs() < 1e-9);

        let stars = &analytics.field_analytics[0];
        assert_eq!(stars.response_count, 3);
        assert_eq!(stars.average_value, Some(4.0));

        let perks = &analytics.field_analytics[1];
        assert_eq!(perks.response_count, 2);
        assert_eq!(perks.common_responses[0], ValueCount { value: "wifi".to_string(), count: 2 });

        assert_eq!(analytics.location_stats[0], LocationStat { country: "India".to_string(), count: 2 });
        assert_eq!(analytics.location_stats[1].country, "Unknown");

        assert!(analytics.device_stats.contains(&DeviceStat {
            platform: "Unknown".to_string(),
            browser: "Unknown".to_string(),
            count: 2,
        }));

        assert_eq!(
            analytics.time_stats,
            vec![
                TimeStat { date: "2026-03-01".to_string(), count: 2 },
                TimeStat { date: "2026-03-02".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_is_answered() {
        assert!(!is_answered(&Value::Null));
        assert!(!is_answered(&json!("  ")));
        assert!(!is_answered(&json!([])));
        assert!(is_answered(&json!(false)));
        assert!(is_answered(&json!(0)));
    }
}
