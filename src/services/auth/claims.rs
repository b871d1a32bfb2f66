use serde::{Deserialize, Deserializer};

/// Identity claims carried by a gateway access token.
///
/// Every field is optional here; the strategy decides which ones are mandatory.
/// Login services are inconsistent about claim types (`"user_id": 42` vs `"42"`),
/// so scalar values are normalised to strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Claims {
    #[serde(default, alias = "userId", deserialize_with = "lenient_string")]
    pub user_id: Option<String>,
    #[serde(default, alias = "userName", deserialize_with = "lenient_string")]
    pub username: Option<String>,
    #[serde(default, alias = "userCode", deserialize_with = "lenient_string")]
    pub user_code: Option<String>,
    #[serde(default, alias = "isManager", deserialize_with = "lenient_string")]
    pub is_manager: Option<String>,
    #[serde(default, alias = "isSuper", deserialize_with = "lenient_string")]
    pub is_super: Option<String>,
    /// Feishu open id
    #[serde(
        default,
        alias = "feishu_open_id",
        alias = "feishuOpenId",
        alias = "externalId",
        deserialize_with = "lenient_string"
    )]
    pub external_id: Option<String>,
    #[serde(default, alias = "deptId", deserialize_with = "lenient_string")]
    pub dept_id: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or_default()
    }

    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }

    /// Both mandatory identity fields are present and non-blank.
    pub fn is_complete(&self) -> bool {
        !self.user_id().trim().is_empty() && !self.username().trim().is_empty()
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;

    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}
