//! Wire views exchanged with the API

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to a stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRef {
    #[serde(rename = "fileID")]
    pub id: Uuid,
}

/// Reference to an open upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionRef {
    #[serde(rename = "sessionID")]
    pub id: Uuid,
}

/// Request body opening an upload session.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionForm {
    pub part_size: u64,
}

/// Authentication scheme of an issued token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    Bearer,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer => f.write_str("Bearer"),
        }
    }
}

/// Token issued in exchange for an API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenView {
    pub access_token: String,
    pub token_type: TokenType,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenView {
    /// Value of the `Authorization` header for this token.
    pub fn credential(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    pub fn lifetime(&self) -> Option<Duration> {
        self.expires_in.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_view_builds_credential() {
        let view: TokenView = serde_json::from_str(
            r#"{"accessToken":"abc.def","tokenType":"Bearer","expiresIn":3600}"#,
        )
        .unwrap();

        assert_eq!(view.credential(), "Bearer abc.def");
        assert_eq!(view.lifetime(), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn refs_use_api_field_names() {
        let id = Uuid::new_v4();
        let file: FileRef = serde_json::from_value(serde_json::json!({ "fileID": id })).unwrap();
        let session: SessionRef =
            serde_json::from_value(serde_json::json!({ "sessionID": id })).unwrap();

        assert_eq!(file.id, id);
        assert_eq!(session.id, id);
        assert_eq!(
            serde_json::to_value(SessionForm { part_size: 5 }).unwrap(),
            serde_json::json!({ "partSize": 5 })
        );
    }
}
