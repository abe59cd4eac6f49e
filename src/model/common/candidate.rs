use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// States in the candidate lifecycle.
///
/// Candidates are never physically removed, so that historical votes and
/// reviews always refer to an existing record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    /// Listed and eligible to receive votes.
    Active,
    /// Removed by an admin; kept for attribution only.
    Retired,
}

impl CandidateStatus {
    pub fn is_active(&self) -> bool {
        *self == Self::Active
    }
}

impl From<CandidateStatus> for Bson {
    fn from(status: CandidateStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
