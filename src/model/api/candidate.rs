use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        api::{auth::non_empty, id::ApiId},
        db::candidate::{Candidate, NewCandidate},
    },
};

/// An admin's description of a new candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    pub party: String,
}

impl TryFrom<CandidateSpec> for NewCandidate {
    type Error = Error;

    fn try_from(spec: CandidateSpec) -> Result<Self> {
        Ok(NewCandidate::new(
            non_empty("name", spec.name)?,
            non_empty("party", spec.party)?,
        ))
    }
}

/// API-friendly representation of a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: ApiId,
    pub name: String,
    pub party: String,
    pub active: bool,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id.into(),
            active: candidate.status.is_active(),
            name: candidate.candidate.name,
            party: candidate.candidate.party,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateList {
    pub candidates: Vec<CandidateDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateCreated {
    pub message: String,
    pub candidate: CandidateDescription,
}
