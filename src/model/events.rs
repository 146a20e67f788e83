use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

///
/// A notification carrying a freshly issued reset token to whoever delivers it to the account
/// holder (e-mail, SMS, etc.).
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PasswordResetRequested {
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
