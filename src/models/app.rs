//! Application identity models.
//!
//! Applications authenticate with a name and an API key. Keys are stored as
//! bcrypt hashes; the plaintext only ever leaves the service once, in the
//! registration response.

use serde::{Deserialize, Serialize};

/// Represents an application record from the database.
///
/// # Database Table
///
/// Maps to the `apps` table with columns:
/// - `id`: Auto-assigned identifier
/// - `name`: Unique application name used for lookups
/// - `api_key_hash`: bcrypt hash of the application's API key
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct App {
    pub id: i64,

    pub name: String,

    /// bcrypt hash (salt and cost are embedded in the string).
    ///
    /// Never serialized. When a request arrives with `X-App-Name: foo` and
    /// `X-API-Key: abc`, the row for `foo` is fetched and `abc` is verified
    /// against this hash.
    pub api_key_hash: String,
}

/// Public view of an application, without any key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AppSummary {
    pub id: i64,
    pub name: String,
}

impl From<App> for AppSummary {
    fn from(app: App) -> Self {
        Self {
            id: app.id,
            name: app.name,
        }
    }
}

/// Result of a registration: the only place the plaintext key appears.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": 7,
///   "name": "billing-service",
///   "api_key": "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedApp {
    pub id: i64,
    pub name: String,
    pub api_key: String,
}

/// Request body for registering a new application.
///
/// A missing `name` deserializes to an empty string so the handler can
/// reject it with a 400 rather than a deserialization error.
#[derive(Debug, Deserialize)]
pub struct CreateAppRequest {
    #[serde(default)]
    pub name: String,
}

/// Query string of the revoke endpoint (`?id=<id>`).
///
/// Kept as a string so a malformed id can be reported as a 400 with a
/// precise message.
#[derive(Debug, Deserialize)]
pub struct RevokeAppParams {
    pub id: Option<String>,
}
