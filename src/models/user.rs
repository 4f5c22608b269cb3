// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// Display name printed on certificates.
    pub full_name: String,

    /// User role: 'student', 'teacher' or 'admin'.
    pub role: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Role tag carried in JWT claims and user rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    /// Unrecognized tags degrade to the least-privileged role.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "admin" => Role::Admin,
            "teacher" => Role::Teacher,
            _ => Role::Student,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }

    /// Teachers and admins may author content and review submissions.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Teacher | Role::Admin)
    }
}

/// Authenticated identity passed explicitly into every service operation.
/// Built from validated JWT claims by the handlers; services never read
/// ambient auth state.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_falls_back_to_student() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("teacher"), Role::Teacher);
        assert_eq!(Role::parse("student"), Role::Student);
        assert_eq!(Role::parse("something-else"), Role::Student);
    }

    #[test]
    fn staff_check() {
        assert!(Role::Teacher.is_staff());
        assert!(Role::Admin.is_staff());
        assert!(!Role::Student.is_staff());
    }
}
