use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    engine::CandidateResult,
    model::{api::id::ApiId, db::vote::Vote, mongodb::Id},
};

/// A request to cast a vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[serde(alias = "voterRef")]
    pub user_id: Id,
    #[serde(alias = "candidateRef")]
    pub candidate_id: Id,
}

/// Confirmation of a recorded vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    pub id: ApiId,
    pub candidate_id: ApiId,
    pub country: String,
    pub timestamp: DateTime<Utc>,
}

impl From<Vote> for VoteReceipt {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id.into(),
            candidate_id: vote.vote.candidate_id.into(),
            country: vote.vote.country,
            timestamp: vote.vote.cast_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecorded {
    pub message: String,
    pub vote: VoteReceipt,
}

/// Vote counts keyed by candidate ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateTally {
    pub votes: HashMap<String, u64>,
    pub total: u64,
}

/// Vote counts keyed by the voters' countries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryTally {
    pub stats: HashMap<String, u64>,
    pub total: u64,
}

/// Per-candidate results with percentages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionResults {
    pub total: u64,
    pub results: Vec<CandidateResultDesc>,
}

/// API-friendly representation of one candidate's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResultDesc {
    pub candidate_id: ApiId,
    pub name: String,
    pub party: String,
    pub active: bool,
    pub votes: u64,
    pub percentage: f64,
}

impl From<CandidateResult> for CandidateResultDesc {
    fn from(result: CandidateResult) -> Self {
        Self {
            candidate_id: result.candidate.id.into(),
            active: result.candidate.status.is_active(),
            name: result.candidate.candidate.name,
            party: result.candidate.candidate.party,
            votes: result.votes,
            percentage: result.percentage,
        }
    }
}
