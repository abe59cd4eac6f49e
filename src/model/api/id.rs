use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A record ID as it appears in response bodies: a plain hex string.
///
/// Request bodies can use [`Id`] directly, since it also accepts hex strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String")]
pub struct ApiId(Id);

impl Display for ApiId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Id> for ApiId {
    fn from(id: Id) -> Self {
        Self(id)
    }
}

impl From<ApiId> for String {
    fn from(id: ApiId) -> Self {
        id.to_string()
    }
}
