use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use rocket::{
    http::{Status, StatusClass},
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use thiserror::Error;

use crate::{
    engine::VoteRejection,
    model::api::response::Failure,
    store::StoreError,
    Config,
};

pub type Result<T> = std::result::Result<T, Error>;

/// Message shown in place of internal errors when they are not exposed.
const GENERIC_FAILURE: &str = "Something went wrong";

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error(transparent)]
    Vote(#[from] VoteRejection),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(why: impl Into<String>) -> Self {
        Self::Validation(why.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Validation(_) => Status::BadRequest,
            Self::NotFound(_) => Status::NotFound,
            Self::Conflict(_) => Status::Conflict,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::Vote(rejection) => match rejection {
                VoteRejection::VoterNotFound => Status::NotFound,
                VoteRejection::VoterNotVerified => Status::Forbidden,
                VoteRejection::AlreadyVoted => Status::Conflict,
                VoteRejection::CandidateInvalid => Status::BadRequest,
            },
            Self::Storage(StoreError::Duplicate(_)) => Status::Conflict,
            Self::Storage(_) | Self::Io(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature
                | JwtErrorKind::ImmatureSignature
                | JwtErrorKind::InvalidSignature => Status::Unauthorized,
                _ => Status::BadRequest,
            },
        }
    }

    /// A machine-readable reason code, where the client might branch on it.
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Vote(rejection) => Some(rejection.code().to_string()),
            _ => None,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let message = if status.class() == StatusClass::ServerError {
            error!("{self}");
            let expose = req
                .rocket()
                .state::<Config>()
                .map_or(false, Config::expose_errors);
            if expose {
                self.to_string()
            } else {
                GENERIC_FAILURE.to_string()
            }
        } else {
            debug!("Rejected request: {self}");
            self.to_string()
        };
        let failure = Failure::new(message, self.reason());
        (status, Json(failure)).respond_to(req)
    }
}
