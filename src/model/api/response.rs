//! Envelopes shared by every response body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A successful response: `{"success": true, ...body}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Success<T> {
    success: bool,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Success<T> {
    pub fn new(body: T) -> Self {
        Self {
            success: true,
            body,
        }
    }
}

/// A body carrying nothing but a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Success<Self> {
        Success::new(Self {
            message: message.into(),
        })
    }
}

/// A failed response: `{"success": false, "message": ..., "reason": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Failure {
    pub fn new(message: impl Into<String>, reason: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            reason,
        }
    }
}

/// Body of a health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}
