use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            admin::{hash_password, MIN_PASSWORD_LENGTH},
            voter::VoterSummary,
        },
        common::DocumentType,
        db::voter::NewVoter,
    },
};

/// A voter sign-in, identified by their identity document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub name: String,
    pub country: String,
    pub document_type: DocumentType,
    pub document_id: String,
}

impl TryFrom<LoginRequest> for NewVoter {
    type Error = Error;

    /// Trim every field, and reject the request if any of them end up empty.
    fn try_from(request: LoginRequest) -> Result<Self> {
        let name = non_empty("name", request.name)?;
        let country = non_empty("country", request.country)?;
        let document_id = non_empty("documentId", request.document_id)?;
        Ok(NewVoter::new(name, country, request.document_type, document_id))
    }
}

/// An up-front registration, with contact details and a password.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub name: String,
    pub email: String,
    pub country: String,
    pub document_type: DocumentType,
    pub document_id: String,
    pub password: String,
}

impl TryFrom<RegistrationRequest> for NewVoter {
    type Error = Error;

    /// Validate the request and hash the password. Emails are compared
    /// case-insensitively, so they are stored lowercased.
    fn try_from(request: RegistrationRequest) -> Result<Self> {
        let email = non_empty("email", request.email)?.to_lowercase();
        if !email.contains('@') {
            return Err(Error::validation("`email` is not an email address"));
        }
        if request.password.len() < MIN_PASSWORD_LENGTH {
            return Err(Error::validation(format!(
                "`password` must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        let mut voter = NewVoter::try_from(LoginRequest {
            name: request.name,
            country: request.country,
            document_type: request.document_type,
            document_id: request.document_id,
        })?;
        let password_hash = hash_password(&request.password)
            .map_err(|e| Error::validation(format!("Unusable password: {e}")))?;
        voter.email = Some(email);
        voter.password_hash = Some(password_hash);
        Ok(voter)
    }
}

/// Response to a successful registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub message: String,
    pub user: VoterSummary,
}

/// Trim the field, failing if nothing remains.
pub(crate) fn non_empty(field: &str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation(format!("`{field}` must not be empty")))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Response to a successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token; also set as the `auth_token` cookie.
    pub token: String,
    pub user: VoterSummary,
}
