//! User and community wrappers resolved through the API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// A user profile as returned by `users.get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub screen_name: Option<String>,
}

impl User {
    /// Returns the inline mention markup for this user, e.g. `[id1|Pavel]`.
    pub fn mention(&self) -> String {
        format!("[id{}|{}]", self.id, self.first_name)
    }

    /// Returns `"first last"`, trimmed when either part is missing.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A community (group / public page) as returned by `groups.getById`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub screen_name: Option<String>,
}

impl Group {
    /// Returns the inline mention markup for this community, e.g. `[club1|Team]`.
    pub fn mention(&self) -> String {
        format!("[club{}|{}]", self.id, self.name)
    }
}

/// Either kind of page that can be mentioned in a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    User(User),
    Group(Group),
}

impl Entity {
    /// Returns the peer id of the page: positive for users, negative for
    /// communities.
    pub fn peer_id(&self) -> i64 {
        match self {
            Self::User(user) => user.id,
            Self::Group(group) => -group.id,
        }
    }

    /// Returns the inline mention markup of the page.
    pub fn mention(&self) -> String {
        match self {
            Self::User(user) => user.mention(),
            Self::Group(group) => group.mention(),
        }
    }
}

/// Extracts the first element of a `users.get` / `groups.getById` response.
///
/// Newer API versions wrap communities in `{"groups": [...]}`, older ones
/// return the bare array; both shapes are accepted.
pub(crate) fn first_of<T>(response: Value, wrapper_key: &str) -> ApiResult<Option<T>>
where
    T: serde::de::DeserializeOwned,
{
    let list = match response {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(wrapper_key) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ApiError::UnexpectedResponse(format!(
                    "expected an array or an object with '{wrapper_key}'"
                )));
            }
        },
        other => {
            return Err(ApiError::UnexpectedResponse(format!(
                "expected an array, got {other}"
            )));
        }
    };

    list.into_iter()
        .next()
        .map(serde_json::from_value)
        .transpose()
        .map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_mention() {
        let user = User {
            id: 1,
            first_name: "Pavel".into(),
            last_name: "Durov".into(),
            screen_name: Some("durov".into()),
        };
        assert_eq!(user.mention(), "[id1|Pavel]");
        assert_eq!(user.full_name(), "Pavel Durov");
        assert_eq!(Entity::User(user).peer_id(), 1);
    }

    #[test]
    fn test_group_peer_id_is_negative() {
        let group = Group {
            id: 42,
            name: "Team".into(),
            screen_name: None,
        };
        assert_eq!(group.mention(), "[club42|Team]");
        assert_eq!(Entity::Group(group).peer_id(), -42);
    }

    #[test]
    fn test_first_of_bare_array() {
        let user: Option<User> =
            first_of(json!([{"id": 5, "first_name": "Ann"}]), "users").unwrap();
        assert_eq!(user.unwrap().id, 5);
    }

    #[test]
    fn test_first_of_wrapped_object() {
        let group: Option<Group> = first_of(
            json!({"groups": [{"id": 7, "name": "Club"}], "profiles": []}),
            "groups",
        )
        .unwrap();
        assert_eq!(group.unwrap().name, "Club");
    }

    #[test]
    fn test_first_of_empty() {
        let user: Option<User> = first_of(json!([]), "users").unwrap();
        assert!(user.is_none());
    }

    #[test]
    fn test_first_of_wrong_shape() {
        let result: ApiResult<Option<User>> = first_of(json!(12), "users");
        assert!(matches!(result, Err(ApiError::UnexpectedResponse(_))));
    }
}
