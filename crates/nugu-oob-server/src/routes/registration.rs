//! Registration document endpoints (`/oauth`).

use axum::{
    Form, Json,
    body::Bytes,
    extract::State,
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use nugu_oob_oauth::{Registration, types::ensure_json_object};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::state::AppState;

/// Reply to a raw document replacement.
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Form posted by the status page.
#[derive(Debug, Deserialize)]
pub struct RegistrationForm {
    #[serde(rename = "pocId", default)]
    pub poc_id: String,
    #[serde(rename = "clientId", default)]
    pub client_id: String,
    #[serde(rename = "clientSecret", default)]
    pub client_secret: String,
    #[serde(default)]
    pub serial: String,
}

impl From<RegistrationForm> for Registration {
    fn from(form: RegistrationForm) -> Self {
        Registration {
            poc_id: form.poc_id,
            client_id: form.client_id,
            client_secret: form.client_secret,
            device_serial_number: form.serial,
        }
    }
}

/// Serve a stored document as JSON, byte for byte.
pub(crate) fn json_bytes(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], bytes).into_response()
}

/// GET /oauth - Raw registration document.
pub async fn get_registration_handler(State(state): State<AppState>) -> Result<Response> {
    let bytes = state.store.read_registration_raw().await?;
    Ok(json_bytes(bytes))
}

/// PUT /oauth - Replace the registration document with the request body.
pub async fn put_registration_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>> {
    ensure_json_object(&body)?;
    state.store.write_registration_raw(&body).await?;
    info!("Registration replaced");
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /oauth - Save the registration form and return to the status page.
pub async fn submit_registration_handler(
    State(state): State<AppState>,
    Form(form): Form<RegistrationForm>,
) -> Result<Redirect> {
    let registration = Registration::from(form);
    state.store.write_registration(&registration).await?;
    info!(
        client_id = %registration.client_id,
        serial = %registration.device_serial_number,
        "Registration saved from form"
    );
    Ok(Redirect::to("/"))
}
