//! Input validation for JSON request bodies

use axum::{
    body::HttpBody,
    extract::{rejection::JsonRejection, FromRequest},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    BoxError, Json,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::response::ApiResponse;

/// A validated JSON extractor that ensures input validation
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

/// Rejection type for validation errors
#[derive(Debug)]
pub enum ValidationRejection {
    JsonRejection(JsonRejection),
    ValidationError(ValidationErrors),
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        let body = match self {
            ValidationRejection::JsonRejection(rejection) => {
                let message = match &rejection {
                    JsonRejection::JsonDataError(_) => "Invalid JSON format",
                    JsonRejection::JsonSyntaxError(_) => "JSON syntax error",
                    JsonRejection::MissingJsonContentType(_) => {
                        "Missing Content-Type: application/json header"
                    }
                    _ => "Bad request",
                };
                ApiResponse::error("BAD_REQUEST", message)
                    .with_details(Some(json!({ "reason": rejection.body_text() })))
            }
            ValidationRejection::ValidationError(errors) => {
                let mut fields = Vec::new();
                collect_field_errors("", &errors, &mut fields);
                fields.sort();
                let message = fields
                    .iter()
                    .map(|(field, message)| format!("{}: {}", field, message))
                    .collect::<Vec<_>>()
                    .join(", ");
                let details: Value = fields
                    .into_iter()
                    .map(|(field, message)| json!({ "field": field, "message": message }))
                    .collect();
                ApiResponse::error("VALIDATION_ERROR", message).with_details(Some(details))
            }
        };

        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Flatten nested struct and list errors into `assets[0].base_value` style paths
fn collect_field_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<(String, String)>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error.message.as_deref().unwrap_or(&*error.code);
                    out.push((path.clone(), message.to_string()));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_field_errors(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_field_errors(&format!("{}[{}]", path, index), nested, out);
                }
            }
        }
    }
}

#[axum::async_trait]
impl<T, S, B> FromRequest<S, B> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
    Json<T>: FromRequest<S, B, Rejection = JsonRejection>,
{
    type Rejection = ValidationRejection;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidationRejection::JsonRejection)?;

        value
            .validate()
            .map_err(ValidationRejection::ValidationError)?;

        Ok(ValidatedJson(value))
    }
}

/// Common validation functions
pub mod validators {
    use validator::ValidationError;

    /// Reject identifiers that are empty or only whitespace
    pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            let mut error = ValidationError::new("blank");
            error.message = Some("must not be blank".into());
            Err(error)
        } else {
            Ok(())
        }
    }
}
