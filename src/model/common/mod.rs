//! Types shared between the API and DB representations.

mod candidate;
mod document;
mod review;

pub use candidate::CandidateStatus;
pub use document::DocumentType;
pub use review::ReviewStatus;
