// src/services/certificate.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::certificate::{Certificate, IssueRequest, IssuedCertificate},
};

/// Collaborator seam for certificate issuance.
///
/// `issue` must be idempotent: calling twice for the same (user, course)
/// returns the existing certificate rather than erroring. The progress
/// aggregator calls this best-effort after its transaction commits; failures
/// here are logged and never propagate to the progress caller.
#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    async fn issue(&self, req: IssueRequest) -> Result<IssuedCertificate, AppError>;
}

/// Generates a unique, human-quotable certificate code.
fn generate_code(course_id: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("CERT-{}-{}", course_id, &suffix[..12].to_uppercase())
}

fn certificate_url(code: &str) -> String {
    format!("/certificates/{code}")
}

/// Postgres-backed issuer. Idempotence is enforced by the unique
/// (user_id, course_id) key: the insert is ON CONFLICT DO NOTHING and the
/// stored code is re-read afterwards, so a duplicate call or a concurrent
/// race both land on the same row.
pub struct PgCertificateIssuer {
    pool: PgPool,
}

impl PgCertificateIssuer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CertificateIssuer for PgCertificateIssuer {
    async fn issue(&self, req: IssueRequest) -> Result<IssuedCertificate, AppError> {
        let code = generate_code(req.course_id);

        sqlx::query(
            r#"
            INSERT INTO certificates (user_id, course_id, code)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, course_id) DO NOTHING
            "#,
        )
        .bind(req.user_id)
        .bind(req.course_id)
        .bind(&code)
        .execute(&self.pool)
        .await?;

        // Re-read the stored row: on conflict the original certificate wins.
        let stored = sqlx::query_as::<_, Certificate>(
            "SELECT * FROM certificates WHERE user_id = $1 AND course_id = $2",
        )
        .bind(req.user_id)
        .bind(req.course_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            "Certificate {} for user {} ({}) on course {} ({}, {}h)",
            stored.code,
            req.user_id,
            req.user_name,
            req.course_id,
            req.course_title,
            req.hours
        );

        Ok(IssuedCertificate {
            url: certificate_url(&stored.code),
            code: stored.code,
        })
    }
}
