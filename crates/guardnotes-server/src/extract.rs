//! JSON extractor whose rejections use the API's error body.
//!
//! [`axum::Json`] answers a malformed body with plain text. [`Json`] wraps
//! it and turns every rejection into [`AppError::BadRequest`], so clients
//! always get `{ "error", "message" }`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Drop-in replacement for [`axum::Json`] in request and response position.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match &rejection {
            JsonRejection::JsonSyntaxError(_) => {
                format!("invalid JSON syntax in request body: {}", rejection.body_text())
            }
            JsonRejection::JsonDataError(_) => {
                format!("invalid request data: {}", rejection.body_text())
            }
            JsonRejection::MissingJsonContentType(_) => {
                "request must have Content-Type: application/json".to_owned()
            }
            _ => format!("failed to read request body: {}", rejection.body_text()),
        };
        Self::BadRequest(message)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{StatusCode, header};

    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        name: String,
    }

    async fn extract(content_type: Option<&str>, body: &'static str) -> Result<Payload, AppError> {
        let mut builder = Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        let req = builder.body(Body::from(body)).unwrap();
        Json::<Payload>::from_request(req, &()).await.map(|Json(p)| p)
    }

    #[tokio::test]
    async fn syntax_error_is_bad_request() {
        let err = extract(Some("application/json"), "{not json").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.starts_with("invalid JSON syntax")));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_content_type_is_bad_request() {
        let err = extract(None, r#"{"name":"x"}"#).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn wrong_shape_is_bad_request() {
        let err = extract(Some("application/json"), r#"{"name":7}"#).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.starts_with("invalid request data")));
    }
}
