//! Tenant-scoped resource models: courses and everything below them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ParseEnumError;

/// Implements `as_str`, `Display` and exact-match `FromStr` for a unit enum.
macro_rules! string_enum {
    ($ty:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    _ => Err(ParseEnumError::new($label, s)),
                }
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub org_id: Uuid,
    pub code: String,
    pub title: String,
    pub description: String,
    pub created_by: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub org_id: Uuid,
    pub code: String,
    pub title: String,
    pub description: String,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
}

#[derive(Debug, Clone)]
pub struct NewModule {
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaterialKind {
    Video,
    Text,
    Doc,
}

string_enum!(MaterialKind, "material kind", {
    Video => "VIDEO",
    Text => "TEXT",
    Doc => "DOC",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub id: Uuid,
    pub module_id: Uuid,
    pub kind: MaterialKind,
    pub title: String,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub module_id: Uuid,
    pub kind: MaterialKind,
    pub title: String,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Active,
    Archived,
}

string_enum!(AssignmentStatus, "assignment status", {
    Active => "ACTIVE",
    Archived => "ARCHIVED",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub due_at: DateTime<Utc>,
    pub points: i32,
    pub instructions: String,
    pub status: AssignmentStatus,
}

#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub course_id: Uuid,
    pub title: String,
    pub due_at: DateTime<Utc>,
    pub points: i32,
    pub instructions: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Submitted,
    Graded,
}

string_enum!(SubmissionStatus, "submission status", {
    Submitted => "SUBMITTED",
    Graded => "GRADED",
});

/// A student's work on an assignment. `user_id` is the author, never the grader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub user_id: Uuid,
    pub status: SubmissionStatus,
    pub file_url: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub grade: Option<i32>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub course_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub created_by: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
