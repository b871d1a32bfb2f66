//! Outbound header rewriting: identity headers in, spoofable headers out.
//!
//! Nothing here touches a live request. Changes are collected into a
//! [`HeaderMutation`] and applied in one step once the whole check has passed,
//! so a check that is rejected or cancelled half-way leaves the request as it was.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::services::auth::claims::Claims;

pub const USER_ID: HeaderName = HeaderName::from_static("x-user-id");
pub const USERNAME: HeaderName = HeaderName::from_static("x-username");
pub const USER_CODE: HeaderName = HeaderName::from_static("x-user-code");
pub const IS_MANAGER: HeaderName = HeaderName::from_static("x-is-manager");
pub const IS_SUPER: HeaderName = HeaderName::from_static("x-is-super");
pub const OPEN_ID: HeaderName = HeaderName::from_static("x-open-id");
pub const DEPT_ID: HeaderName = HeaderName::from_static("x-dept-id");
pub const DEPT_AUTH_LIST: HeaderName = HeaderName::from_static("x-dept-auth-list");

/// Every header name the identity writer owns.
pub const IDENTITY_HEADERS: [HeaderName; 8] = [
    USER_ID,
    USERNAME,
    USER_CODE,
    IS_MANAGER,
    IS_SUPER,
    OPEN_ID,
    DEPT_ID,
    DEPT_AUTH_LIST,
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum HeaderOp {
    Set(HeaderName, HeaderValue),
    Remove(HeaderName),
}

/// Ordered set/remove operations, applied later in one go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMutation {
    ops: Vec<HeaderOp>,
}

impl HeaderMutation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any existing value of `name`.
    pub fn set(&mut self, name: HeaderName, value: HeaderValue) {
        self.ops.push(HeaderOp::Set(name, value));
    }

    pub fn remove(&mut self, name: HeaderName) {
        self.ops.push(HeaderOp::Remove(name));
    }

    pub fn apply(self, headers: &mut HeaderMap) {
        for op in self.ops {
            match op {
                HeaderOp::Set(name, value) => {
                    headers.insert(name, value);
                }
                HeaderOp::Remove(name) => {
                    headers.remove(name);
                }
            }
        }
    }
}

/// Percent-encode `value` and set it, so non-ASCII names (e.g. CJK usernames)
/// survive as legal header values.
pub fn set_encoded(mutation: &mut HeaderMutation, name: HeaderName, value: &str) {
    let encoded = urlencoding::encode(value);
    match HeaderValue::from_str(&encoded) {
        Ok(v) => mutation.set(name, v),
        Err(err) => tracing::warn!(header = %name, error = %err, "skip unencodable header value"),
    }
}

/// Drop every identity header the caller may have sent.
pub fn clear_identity(mutation: &mut HeaderMutation) {
    for name in IDENTITY_HEADERS {
        mutation.remove(name);
    }
}

/// Write one header per present claim field.
///
/// All identity headers are cleared first: a value the caller sent for a field
/// that is absent from the claims must not reach upstream.
pub fn write_identity(
    mutation: &mut HeaderMutation,
    claims: &Claims,
    dept_auth_list: Option<&serde_json::Value>,
) {
    clear_identity(mutation);

    let fields = [
        (USER_ID, &claims.user_id),
        (USERNAME, &claims.username),
        (USER_CODE, &claims.user_code),
        (IS_MANAGER, &claims.is_manager),
        (IS_SUPER, &claims.is_super),
        (OPEN_ID, &claims.external_id),
        (DEPT_ID, &claims.dept_id),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            set_encoded(mutation, name, value);
        }
    }

    match dept_auth_list {
        None | Some(serde_json::Value::Null) => {}
        Some(list) => match serde_json::to_string(list) {
            Ok(json) => set_encoded(mutation, DEPT_AUTH_LIST, &json),
            Err(err) => tracing::warn!(error = %err, "failed to serialize dept auth list"),
        },
    }
}

/// Strip headers only trusted internal components may set.
pub fn sanitize(mutation: &mut HeaderMutation, reserved: &[HeaderName]) {
    for name in reserved {
        mutation.remove(name.clone());
    }
}
