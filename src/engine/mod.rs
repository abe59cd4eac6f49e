//! Vote eligibility, recording and tallying.

use std::net::IpAddr;

use thiserror::Error;

use crate::{
    error::Result,
    model::{
        db::vote::{NewVote, Vote},
        mongodb::Id,
    },
    store::{Recorded, Storage},
};

mod tally;

pub use tally::{percentage, CandidateResult, Tally};

/// Why a vote was refused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum VoteRejection {
    #[error("Voter not found")]
    VoterNotFound,
    #[error("User not verified")]
    VoterNotVerified,
    #[error("User has already voted")]
    AlreadyVoted,
    #[error("Invalid candidate")]
    CandidateInvalid,
}

impl VoteRejection {
    /// Stable identifier clients can match on.
    pub fn code(&self) -> &'static str {
        match self {
            Self::VoterNotFound => "VoterNotFound",
            Self::VoterNotVerified => "VoterNotVerified",
            Self::AlreadyVoted => "AlreadyVoted",
            Self::CandidateInvalid => "CandidateInvalid",
        }
    }
}

/// Records votes and computes tallies over the shared store.
pub struct VoteEngine {
    storage: Storage,
}

impl VoteEngine {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Cast a vote for the given candidate on behalf of the given voter.
    ///
    /// Checks, in order: the voter exists, is verified and has not voted,
    /// then the candidate exists and is active. The store repeats the last
    /// two checks when recording, so a concurrent vote or retirement cannot
    /// slip past them. The vote and the voter's has-voted flag are written
    /// together or not at all.
    pub async fn cast_vote(
        &self,
        voter_id: Id,
        candidate_id: Id,
        origin: Option<IpAddr>,
    ) -> Result<Vote> {
        let voter = self
            .storage
            .voter(voter_id)
            .await?
            .ok_or(VoteRejection::VoterNotFound)?;
        if !voter.verified {
            return Err(VoteRejection::VoterNotVerified.into());
        }
        if voter.has_voted {
            return Err(VoteRejection::AlreadyVoted.into());
        }

        let candidate = self.storage.candidate(candidate_id).await?;
        if !candidate.map_or(false, |c| c.status.is_active()) {
            return Err(VoteRejection::CandidateInvalid.into());
        }

        let vote = NewVote::new(&voter, candidate_id, origin);
        match self.storage.record_vote(vote).await? {
            Recorded::Vote(vote) => {
                info!("Recorded vote {} by voter {voter_id}", vote.id);
                Ok(vote)
            }
            // Eligibility was checked above, so the only thing that can have
            // changed in between is a concurrent vote by the same voter.
            Recorded::VoterIneligible => {
                debug!("Lost a concurrent vote race for voter {voter_id}");
                Err(VoteRejection::AlreadyVoted.into())
            }
            Recorded::CandidateInactive => {
                debug!("Candidate {candidate_id} was retired while voter {voter_id} voted");
                Err(VoteRejection::CandidateInvalid.into())
            }
        }
    }

    /// Vote counts per candidate.
    pub async fn tally_by_candidate(&self) -> Result<Tally<Id>> {
        let counts = self.storage.count_by_candidate().await?;
        Ok(Tally::new(counts))
    }

    /// Vote counts per voter country, as recorded when each vote was cast.
    pub async fn tally_by_country(&self) -> Result<Tally<String>> {
        let counts = self.storage.count_by_country().await?;
        Ok(Tally::new(counts))
    }

    /// Results for every active candidate and every retired candidate that
    /// received votes, most votes first.
    pub async fn results(&self) -> Result<Vec<CandidateResult>> {
        let tally = self.tally_by_candidate().await?;
        let candidates = self.storage.candidates(true).await?;
        let mut results: Vec<CandidateResult> = candidates
            .into_iter()
            .map(|candidate| {
                let votes = tally.count(&candidate.id);
                CandidateResult {
                    percentage: percentage(votes, tally.total),
                    candidate,
                    votes,
                }
            })
            .filter(|result| result.candidate.status.is_active() || result.votes > 0)
            .collect();
        // Stable, so ties keep the candidates' creation order.
        results.sort_by(|a, b| b.votes.cmp(&a.votes));
        Ok(results)
    }
}
