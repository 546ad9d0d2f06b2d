use serde::{Deserialize, Serialize};

use crate::models::excluded_email::ExcludedEmail;
use crate::query::PageMeta;

#[derive(Debug, Default, Deserialize)]
pub struct ExcludedEmailListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateExcludedEmailRequest {
    pub email: String,
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct ExcludedEmailListResponse {
    pub excluded_emails: Vec<ExcludedEmail>,
    #[serde(flatten)]
    pub meta: PageMeta,
}
