use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        api::id::ApiId,
        common::ReviewStatus,
        db::{candidate::Candidate, review::Review},
        mongodb::Id,
    },
    moderation::Sentiment,
};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// A review submitted by a voter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(alias = "voterRef")]
    pub user_id: Id,
    #[serde(default, alias = "candidateRef")]
    pub candidate_id: Option<Id>,
    pub rating: u8,
    pub content: String,
}

impl ReviewRequest {
    /// Check the parts of the request that do not depend on stored data.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(Error::validation(format!(
                "`rating` must be between {MIN_RATING} and {MAX_RATING}"
            )));
        }
        Ok(())
    }
}

/// Outcome of a review submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmitted {
    pub message: String,
    /// True if the review is being held for admin approval.
    pub ai_filtered: bool,
    pub review_id: ApiId,
}

/// The candidate a review is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewedCandidate {
    pub id: ApiId,
    pub name: String,
    pub party: String,
}

impl From<&Candidate> for ReviewedCandidate {
    fn from(candidate: &Candidate) -> Self {
        Self {
            id: candidate.id.into(),
            name: candidate.name.clone(),
            party: candidate.party.clone(),
        }
    }
}

/// API-friendly representation of a review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDescription {
    pub id: ApiId,
    pub user_id: ApiId,
    pub user_name: String,
    pub user_country: String,
    pub candidate: Option<ReviewedCandidate>,
    pub rating: u8,
    pub content: String,
    pub ai_approved: bool,
    pub ai_reason: String,
    pub ai_confidence: u8,
    pub sentiment: Sentiment,
    pub status: ReviewStatus,
    pub timestamp: DateTime<Utc>,
}

impl ReviewDescription {
    /// Describe the review, resolving its candidate from the given lookup.
    pub fn new(review: Review, candidates: &HashMap<Id, Candidate>) -> Self {
        let candidate = review
            .candidate_id
            .and_then(|id| candidates.get(&id))
            .map(ReviewedCandidate::from);
        let review_core = review.review;
        Self {
            id: review.id.into(),
            user_id: review_core.voter_id.into(),
            user_name: review_core.voter_name,
            user_country: review_core.country,
            candidate,
            rating: review_core.rating,
            content: review_core.content,
            ai_approved: review_core.moderation.approved,
            ai_reason: review_core.moderation.reason.to_string(),
            ai_confidence: review_core.moderation.confidence,
            sentiment: review_core.moderation.sentiment,
            status: review_core.status,
            timestamp: review_core.submitted_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewList {
    pub reviews: Vec<ReviewDescription>,
}
