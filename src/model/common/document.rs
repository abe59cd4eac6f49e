use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Kinds of identity document a voter may authenticate with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    Passport,
    #[serde(rename = "National ID")]
    NationalId,
    #[serde(rename = "Citizenship Certificate")]
    CitizenshipCertificate,
    #[serde(rename = "Driving License")]
    DrivingLicense,
    #[serde(rename = "Voter ID")]
    VoterId,
}

impl Display for DocumentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Passport => "Passport",
            Self::NationalId => "National ID",
            Self::CitizenshipCertificate => "Citizenship Certificate",
            Self::DrivingLicense => "Driving License",
            Self::VoterId => "Voter ID",
        };
        write!(f, "{name}")
    }
}
