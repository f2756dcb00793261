// File: voltledger-core/src/api/validate.rs
//
// Request body validation. Bodies are deserialized first, then checked
// field by field so every problem is reported at once.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

use voltledger_common::FieldError;
use crate::api::error::ApiError;
use crate::Error;

pub static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
pub static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+234[0-9]{10}$").expect("valid phone regex"));
pub static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid slug regex"));

pub trait Validate {
    fn validate(&self, v: &mut Checks);
}

/// Collects field failures.
#[derive(Debug, Default)]
pub struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    pub fn require(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn min_len(&mut self, value: &str, min: usize, field: &str) -> &mut Self {
        let ok = value.trim().chars().count() >= min;
        self.require(ok, field, &format!("Must be at least {} characters", min))
    }

    pub fn email(&mut self, value: &str, field: &str) -> &mut Self {
        self.require(EMAIL_RE.is_match(value.trim()), field, "Invalid email address")
    }

    pub fn url(&mut self, value: &str, field: &str) -> &mut Self {
        self.require(url::Url::parse(value).is_ok(), field, "Must be a valid URL")
    }

    pub fn finish(self) -> Result<(), Error> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self.errors))
        }
    }
}

pub fn check<T: Validate>(value: &T) -> Result<(), Error> {
    let mut checks = Checks::default();
    value.validate(&mut checks);
    checks.finish()
}

/// `Json<T>` that also runs `T::validate`.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| {
                ApiError(Error::BadRequest(rejection.body_text()))
            })?;
        check(&value)?;
        Ok(ValidatedJson(value))
    }
}
