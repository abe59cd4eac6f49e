use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, common::DocumentType, db::voter::Voter};

/// What a voter may see about themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterSummary {
    pub id: ApiId,
    pub name: String,
    pub country: String,
    pub document_type: DocumentType,
    pub document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub document_verified: bool,
    pub has_voted: bool,
}

impl From<Voter> for VoterSummary {
    fn from(voter: Voter) -> Self {
        Self {
            id: voter.id.into(),
            name: voter.voter.name,
            country: voter.voter.country,
            document_type: voter.voter.document_type,
            document_id: voter.voter.document_id,
            email: voter.voter.email,
            document_verified: voter.voter.verified,
            has_voted: voter.voter.has_voted,
        }
    }
}

/// A partial edit of a voter's profile. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub country: Option<String>,
}

/// Body of a profile response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterProfile {
    pub user: VoterSummary,
}
