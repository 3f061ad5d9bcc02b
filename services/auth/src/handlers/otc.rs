use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::types::SubmittedCode;
use crate::error::AuthServiceError;
use crate::state::AppState;
use crate::usecase::otc::{
    RequestCodeInput, RequestCodeUseCase, SendCodeUseCase, VerifyCodeInput, VerifyCodeUseCase,
};

// ── POST /send-otp ───────────────────────────────────────────────────────────

/// Absent or `null` fields deserialize as `None` so they surface as domain
/// errors (400) rather than extractor rejections.
#[derive(Deserialize)]
pub struct SendCodeRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Serialize)]
pub struct SendCodeResponse {
    pub message: &'static str,
    #[serde(serialize_with = "mailcode_core::serde::to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
}

pub async fn send_code(
    State(state): State<AppState>,
    Json(body): Json<SendCodeRequest>,
) -> Result<Json<SendCodeResponse>, AuthServiceError> {
    let usecase = SendCodeUseCase {
        request: RequestCodeUseCase {
            codes: state.code_store(),
            clock: state.clock(),
            policy: state.policy,
        },
        mailer: state.mailer(),
    };
    let issued = usecase
        .execute(RequestCodeInput {
            email: body.email.unwrap_or_default(),
        })
        .await?;
    Ok(Json(SendCodeResponse {
        message: "OTP sent successfully.",
        expires_at: issued.expires_at,
    }))
}

// ── POST /verify-otp ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyCodeRequest {
    #[serde(default)]
    pub email: Option<String>,
    /// JSON string or number.
    #[serde(default)]
    pub otp: Option<SubmittedCode>,
}

#[derive(Serialize)]
pub struct VerifyCodeResponse {
    pub message: &'static str,
    pub email: String,
}

pub async fn verify_code(
    State(state): State<AppState>,
    Json(body): Json<VerifyCodeRequest>,
) -> Result<Json<VerifyCodeResponse>, AuthServiceError> {
    let usecase = VerifyCodeUseCase {
        codes: state.code_store(),
        clock: state.clock(),
    };
    let identity = usecase
        .execute(VerifyCodeInput {
            email: body.email.unwrap_or_default(),
            code: body.otp,
        })
        .await?;
    Ok(Json(VerifyCodeResponse {
        message: "OTP verified successfully.",
        email: identity.to_string(),
    }))
}
