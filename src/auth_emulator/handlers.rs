//! Request/response bodies and handlers for each Identity Toolkit
//! endpoint, shaped after the real REST API's JSON (and, by extension,
//! after the fields `auth::auth::SignInResponse` deserializes on the
//! client side of this same wire format).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::store::{UserRecord, UserStore};
use super::token;

const DEFAULT_EXPIRES_IN: &str = "3600";

pub type AppState = Arc<UserStore>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: ErrorDetail {
                code: status.as_u16(),
                message: message.to_string(),
            },
        }),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    pub id_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub id_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAccountInfoRequest {
    pub id_token: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub local_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: String,
    pub registered: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub local_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub email_verified: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub users: Vec<UserInfo>,
}

impl SignInResponse {
    fn new(user: &UserRecord, registered: bool) -> Self {
        Self {
            local_id: user.local_id.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            id_token: token::issue(&user.local_id),
            refresh_token: crate::id::generate_doc_id(),
            expires_in: DEFAULT_EXPIRES_IN.to_string(),
            registered,
        }
    }
}

impl From<&UserRecord> for UserInfo {
    fn from(user: &UserRecord) -> Self {
        Self {
            local_id: user.local_id.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            email_verified: user.email_verified,
            created_at: user.created_at_millis.to_string(),
        }
    }
}

fn resolve_user(store: &UserStore, id_token: &str) -> Result<UserRecord, ApiError> {
    let local_id = token::local_id_of(id_token)
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "INVALID_ID_TOKEN"))?;
    store
        .get(&local_id)
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "USER_NOT_FOUND"))
}

pub async fn sign_up(
    State(store): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<Json<SignInResponse>, ApiError> {
    if let Some(email) = &req.email {
        if email.is_empty() {
            return Err(error(StatusCode::BAD_REQUEST, "MISSING_EMAIL"));
        }
        if store.find_by_email(email).is_some() {
            return Err(error(StatusCode::BAD_REQUEST, "EMAIL_EXISTS"));
        }
    }
    let user = UserRecord {
        local_id: crate::id::generate_doc_id(),
        email: req.email,
        password: req.password.unwrap_or_default(),
        display_name: None,
        email_verified: false,
        created_at_millis: chrono::Utc::now().timestamp_millis(),
    };
    store.insert(user.clone());
    Ok(Json(SignInResponse::new(&user, false)))
}

pub async fn sign_in_with_password(
    State(store): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<SignInResponse>, ApiError> {
    let user = store
        .find_by_email(&req.email)
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "EMAIL_NOT_FOUND"))?;
    if user.password != req.password {
        return Err(error(StatusCode::BAD_REQUEST, "INVALID_PASSWORD"));
    }
    Ok(Json(SignInResponse::new(&user, true)))
}

pub async fn lookup(
    State(store): State<AppState>,
    Json(req): Json<LookupRequest>,
) -> Result<Json<LookupResponse>, ApiError> {
    let user = resolve_user(&store, &req.id_token)?;
    Ok(Json(LookupResponse {
        users: vec![UserInfo::from(&user)],
    }))
}

pub async fn delete(
    State(store): State<AppState>,
    Json(req): Json<DeleteRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = resolve_user(&store, &req.id_token)?;
    store.remove(&user.local_id);
    Ok(Json(serde_json::json!({})))
}

pub async fn update(
    State(store): State<AppState>,
    Json(req): Json<SetAccountInfoRequest>,
) -> Result<Json<SignInResponse>, ApiError> {
    let user = resolve_user(&store, &req.id_token)?;
    let updated = store
        .update(&user.local_id, req.email, req.password, req.display_name)
        .expect("resolve_user already confirmed the user exists");
    Ok(Json(SignInResponse::new(&updated, true)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        Arc::new(UserStore::new())
    }

    #[tokio::test]
    async fn sign_up_then_sign_in_round_trips() {
        let store = state();
        let signed_up = sign_up(
            State(store.clone()),
            Json(SignUpRequest {
                email: Some("alice@example.com".to_string()),
                password: Some("hunter2".to_string()),
                return_secure_token: true,
            }),
        )
        .await
        .unwrap()
        .0;
        assert!(!signed_up.registered);

        let signed_in = sign_in_with_password(
            State(store),
            Json(SignInRequest {
                email: "alice@example.com".to_string(),
                password: "hunter2".to_string(),
                return_secure_token: true,
            }),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(signed_in.local_id, signed_up.local_id);
        assert!(signed_in.registered);
    }

    #[tokio::test]
    async fn sign_up_rejects_duplicate_email() {
        let store = state();
        let req = || SignUpRequest {
            email: Some("alice@example.com".to_string()),
            password: Some("hunter2".to_string()),
            return_secure_token: true,
        };
        sign_up(State(store.clone()), Json(req())).await.unwrap();
        let err = sign_up(State(store), Json(req())).await.unwrap_err();
        assert_eq!(err.0.code, 400);
        assert_eq!(err.1 .0.error.message, "EMAIL_EXISTS");
    }

    #[tokio::test]
    async fn sign_in_rejects_wrong_password() {
        let store = state();
        sign_up(
            State(store.clone()),
            Json(SignUpRequest {
                email: Some("alice@example.com".to_string()),
                password: Some("hunter2".to_string()),
                return_secure_token: true,
            }),
        )
        .await
        .unwrap();

        let err = sign_in_with_password(
            State(store),
            Json(SignInRequest {
                email: "alice@example.com".to_string(),
                password: "wrong".to_string(),
                return_secure_token: true,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.1 .0.error.message, "INVALID_PASSWORD");
    }

    #[tokio::test]
    async fn lookup_then_delete_then_lookup_fails() {
        let store = state();
        let signed_up = sign_up(
            State(store.clone()),
            Json(SignUpRequest {
                email: Some("alice@example.com".to_string()),
                password: Some("hunter2".to_string()),
                return_secure_token: true,
            }),
        )
        .await
        .unwrap()
        .0;

        let found = lookup(
            State(store.clone()),
            Json(LookupRequest {
                id_token: signed_up.id_token.clone(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(found.0.users[0].local_id, signed_up.local_id);

        delete(
            State(store.clone()),
            Json(DeleteRequest {
                id_token: signed_up.id_token.clone(),
            }),
        )
        .await
        .unwrap();

        let err = lookup(
            State(store),
            Json(LookupRequest {
                id_token: signed_up.id_token,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.1 .0.error.message, "USER_NOT_FOUND");
    }
}
