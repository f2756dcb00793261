// File: voltledger-core/src/api/response.rs

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { success: true, data, message: None })
}

pub fn ok_with<T: Serialize>(data: T, message: &str) -> Json<Envelope<T>> {
    Json(Envelope { success: true, data, message: Some(message.to_string()) })
}

pub fn created<T: Serialize>(data: T, message: &str) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, ok_with(data, message))
}
