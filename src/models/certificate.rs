// src/models/certificate.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'certificates' table: at most one per (user, course).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Certificate {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub code: String,
    pub issued_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Certificate joined with course info, for the "my certificates" listing.
#[derive(Debug, Serialize, FromRow)]
pub struct CertificateListEntry {
    pub id: i64,
    pub course_id: i64,
    pub course_title: String,
    pub hours: i32,
    pub code: String,
    pub issued_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Input to the certificate issuer collaborator.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub user_id: i64,
    pub course_id: i64,
    pub user_name: String,
    pub course_title: String,
    pub hours: i32,
}

/// Issued certificate handle returned by the issuer.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedCertificate {
    pub code: String,
    pub url: String,
}
