//! Review forms, submissions and analytics.

mod analytics;
mod models;
mod store;

pub use analytics::compute as compute_analytics;
pub use models::{
    CreateFormRequest, DeviceStat, FieldAnalytics, FieldResponse, FieldType, FormAnalytics,
    FormSettings, LocationStat, ReviewField, ReviewForm, SubmitRequest, Submission, TimeStat,
    UpdateFormRequest, ValueCount,
};
pub use store::ReviewStore;
