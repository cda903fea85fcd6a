use serde::{Deserialize, Serialize};

use crate::auth::UserId;

/// Body of `POST /user/login`
#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Body of `POST /user/register`
#[derive(Debug, Clone, Serialize)]
pub struct Registration<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub email: &'a str,
}

/// Profile edit as the front-end collects it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct UserInfoUpdate {
    #[serde(alias = "userId")]
    pub user_id: String,
    pub email: String,
    pub phone: String,
    pub name: String,
    pub bio: String,
}

/// Wire body of `PUT /user/:id`. The backend calls the phone field
/// `phoneNumber`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserInfoBody<'a> {
    pub email: &'a str,
    #[serde(rename = "phoneNumber")]
    pub phone_number: &'a str,
    pub name: &'a str,
    pub bio: &'a str,
}

impl UserInfoUpdate {
    pub fn body(&self) -> UserInfoBody<'_> {
        UserInfoBody {
            email: &self.email,
            phone_number: &self.phone,
            name: &self.name,
            bio: &self.bio,
        }
    }

    pub fn user_id(&self) -> UserId {
        UserId::from_raw(&self.user_id)
    }
}

/// Password change as the front-end collects it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PasswordChange {
    #[serde(alias = "oldPassword")]
    pub old_password: String,
    #[serde(alias = "newPassword")]
    pub new_password: String,
    #[serde(alias = "confirmPassword")]
    pub confirm_password: String,
}

/// Wire body of `PUT /user/password`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PasswordBody<'a> {
    #[serde(rename = "oldPwd")]
    pub old_pwd: &'a str,
    #[serde(rename = "newPwd")]
    pub new_pwd: &'a str,
    #[serde(rename = "rePwd")]
    pub re_pwd: &'a str,
}

impl PasswordChange {
    pub fn body(&self) -> PasswordBody<'_> {
        PasswordBody {
            old_pwd: &self.old_password,
            new_pwd: &self.new_password,
            re_pwd: &self.confirm_password,
        }
    }

    pub fn confirmation_matches(&self) -> bool {
        self.new_password == self.confirm_password
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_info_body_renames_phone() {
        let update = UserInfoUpdate {
            user_id: "12".to_string(),
            email: "a@example.com".to_string(),
            phone: "13800000000".to_string(),
            name: "Alice".to_string(),
            bio: "Likes maps".to_string(),
        };
        let body = serde_json::to_value(update.body()).unwrap();
        assert_eq!(
            body,
            json!({
                "email": "a@example.com",
                "phoneNumber": "13800000000",
                "name": "Alice",
                "bio": "Likes maps"
            })
        );
        assert_eq!(update.user_id(), UserId::Number(12));
    }

    #[test]
    fn test_user_info_update_accepts_camel_case_id() {
        let update: UserInfoUpdate = serde_json::from_value(json!({
            "userId": "abc",
            "email": "",
            "phone": "",
            "name": "",
            "bio": ""
        }))
        .unwrap();
        assert_eq!(update.user_id(), UserId::Text("abc".to_string()));
    }

    #[test]
    fn test_password_body_field_names() {
        let change = PasswordChange {
            old_password: "old".to_string(),
            new_password: "new".to_string(),
            confirm_password: "new".to_string(),
        };
        assert!(change.confirmation_matches());
        assert_eq!(
            serde_json::to_value(change.body()).unwrap(),
            json!({"oldPwd": "old", "newPwd": "new", "rePwd": "new"})
        );
    }
}
