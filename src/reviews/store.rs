//! In-process review form store.

use super::analytics::{self, is_answered};
use super::models::{
    CreateFormRequest, FormAnalytics, ReviewForm, SubmitRequest, Submission, UpdateFormRequest,
};
use crate::error::{EngageError, Result};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

const FORM: &str = "Review form";

#[derive(Default)]
struct ReviewData {
    forms: HashMap<String, ReviewForm>,
    submissions: HashMap<String, Vec<Submission>>,
}

/// Forms and their submissions, held behind one lock so deletes cascade atomically.
#[derive(Default)]
pub struct ReviewStore {
    data: RwLock<ReviewData>,
}

impl ReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, request: CreateFormRequest) -> Result<ReviewForm> {
        if request.business_id.trim().is_empty() {
            return Err(EngageError::InvalidInput("businessId is required".to_string()));
        }
        if request.title.trim().is_empty() {
            return Err(EngageError::InvalidInput("title is required".to_string()));
        }

        let now = Utc::now();
        let mut fields = request.fields;
        fields.sort_by_key(|f| f.order);

        let form = ReviewForm {
            id: Uuid::new_v4().to_string(),
            business_id: request.business_id,
            title: request.title,
            description: request.description,
            is_active: true,
            created_at: now,
            updated_at: now,
            fields,
            settings: request.settings,
        };

        self.data.write().await.forms.insert(form.id.clone(), form.clone());
        info!("Created review form {} for business {}", form.id, form.business_id);
        Ok(form)
    }

    /// Forms of a business, newest first.
    pub async fn list_for_business(&self, business_id: &str) -> Vec<ReviewForm> {
        let data = self.data.read().await;
        let mut forms: Vec<ReviewForm> = data
            .forms
            .values()
            .filter(|f| f.business_id == business_id)
            .cloned()
            .collect();
        forms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        forms
    }

    pub async fn get(&self, form_id: &str) -> Result<ReviewForm> {
        self.data
            .read()
            .await
            .forms
            .get(form_id)
            .cloned()
            .ok_or_else(|| EngageError::NotFound(FORM.to_string()))
    }

    pub async fn update(&self, form_id: &str, update: UpdateFormRequest) -> Result<ReviewForm> {
        let mut data = self.data.write().await;
        let form = data
            .forms
            .get_mut(form_id)
            .ok_or_else(|| EngageError::NotFound(FORM.to_string()))?;

        if let Some(title) = update.title {
            if title.trim().is_empty() {
                return Err(EngageError::InvalidInput("title cannot be empty".to_string()));
            }
            form.title = title;
        }
        if let Some(description) = update.description {
            form.description = description;
        }
        if let Some(is_active) = update.is_active {
            form.is_active = is_active;
        }
        if let Some(mut fields) = update.fields {
            fields.sort_by_key(|f| f.order);
            form.fields = fields;
        }
        if let Some(settings) = update.settings {
            form.settings = settings;
        }
        form.updated_at = Utc::now();

        Ok(form.clone())
    }

    /// Delete a form together with all of its submissions.
    pub async fn delete(&self, form_id: &str) -> Result<()> {
        let mut data = self.data.write().await;
        data.forms
            .remove(form_id)
            .ok_or_else(|| EngageError::NotFound(FORM.to_string()))?;
        let removed = data.submissions.remove(form_id).map_or(0, |s| s.len());
        info!("Deleted review form {} and {} submissions", form_id, removed);
        Ok(())
    }

    /// Record a submission. Unknown or inactive forms are rejected as invalid input.
    pub async fn submit(&self, form_id: &str, request: SubmitRequest) -> Result<Submission> {
        let mut data = self.data.write().await;
        let form = data
            .forms
            .get(form_id)
            .ok_or_else(|| EngageError::InvalidInput(format!("{} not found", FORM)))?;

        if !form.is_active {
            return Err(EngageError::InvalidInput(format!("{} is not active", FORM)));
        }

        for field in form.fields.iter().filter(|f| f.required) {
            let answered = request
                .responses
                .iter()
                .any(|r| r.field_id == field.id && is_answered(&r.value));
            if !answered {
                return Err(EngageError::InvalidInput(format!("{} is required", field.label)));
            }
        }

        let mut user_info = request.user_info.unwrap_or_default();
        let has_email = non_empty(&user_info, "email");
        let is_anonymous = !has_email && !non_empty(&user_info, "name");

        if form.settings.require_email && !has_email {
            return Err(EngageError::InvalidInput("email is required".to_string()));
        }
        if !form.settings.allow_anonymous && is_anonymous {
            return Err(EngageError::InvalidInput(
                "Anonymous submissions are not allowed".to_string(),
            ));
        }

        if form.settings.collect_device_info {
            if let Some(device) = request.device_info {
                user_info.insert("device".to_string(), device);
            }
        } else {
            user_info.remove("device");
        }

        if form.settings.collect_location {
            user_info
                .entry("location")
                .or_insert_with(|| json!({ "country": "Unknown", "region": "Unknown", "city": "Unknown" }));
        } else {
            user_info.remove("location");
        }

        let submission = Submission {
            id: Uuid::new_v4().to_string(),
            form_id: form.id.clone(),
            business_id: form.business_id.clone(),
            submitted_at: Utc::now(),
            user_info,
            responses: request.responses,
            is_anonymous,
        };

        data.submissions
            .entry(form_id.to_string())
            .or_default()
            .push(submission.clone());
        Ok(submission)
    }

    pub async fn submissions(&self, form_id: &str) -> Result<Vec<Submission>> {
        let data = self.data.read().await;
        if !data.forms.contains_key(form_id) {
            return Err(EngageError::NotFound(FORM.to_string()));
        }
        Ok(data.submissions.get(form_id).cloned().unwrap_or_default())
    }

    pub async fn analytics(&self, form_id: &str) -> Result<FormAnalytics> {
        let data = self.data.read().await;
        let form = data
            .forms
            .get(form_id)
            .ok_or_else(|| EngageError::NotFound(FORM.to_string()))?;
        let submissions = data.submissions.get(form_id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(analytics::compute(form, submissions))
    }
}

fn non_empty(info: &Map<String, Value>, key: &str) -> bool {
    info.get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}
