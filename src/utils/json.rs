use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{header::CONTENT_TYPE, request::Parts, HeaderMap},
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::dto::common::FieldError;
use crate::error::Error;

/// JSON body extractor that also runs `Validate`. Decode failures are
/// reported against the offending field and every rejection uses the API
/// envelope instead of axum's plain-text 4xx.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_json(req.headers()) {
            return Err(Error::BadRequest(
                "Expected request with `Content-Type: application/json`".to_string(),
            ));
        }
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| Error::BadRequest(rejection.body_text()))?;
        let value: T = decode(&bytes)?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// `Query<T>` with its rejection mapped into the envelope.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| Error::BadRequest(rejection.body_text()))?;
        Ok(ApiQuery(value))
    }
}

/// `Path<T>` with its rejection mapped into the envelope.
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| Error::BadRequest(rejection.body_text()))?;
        Ok(ApiPath(value))
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case("application/json") || essence.ends_with("+json")
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let value = serde_path_to_error::deserialize(&mut de).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        if inner.is_syntax() || inner.is_eof() || inner.is_io() {
            return Error::BadRequest(format!("Malformed JSON body: {}", inner));
        }
        let message = without_position(&inner.to_string());
        let field = missing_field(&message).map(str::to_string).unwrap_or_else(|| {
            if path == "." {
                "body".to_string()
            } else {
                path
            }
        });
        Error::InvalidFields(vec![FieldError { field, message }])
    })?;
    de.end()
        .map_err(|e| Error::BadRequest(format!("Malformed JSON body: {}", e)))?;
    Ok(value)
}

/// serde_json appends ` at line L column C` to every message.
fn without_position(message: &str) -> String {
    match message.rsplit_once(" at line ") {
        Some((head, _)) => head.to_string(),
        None => message.to_string(),
    }
}

fn missing_field(message: &str) -> Option<&str> {
    message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.strip_suffix('`'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::{get, post},
        Router,
    };
    use chrono::{DateTime, Utc};
    use serde::Deserialize;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::models::visit::VisitStatus;

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    #[allow(dead_code)]
    struct Body1 {
        #[validate(range(min = 15, message = "Duration must be at least 15 minutes"))]
        minutes: i32,
        #[serde(default)]
        visit_date: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Filter {
        status: Option<VisitStatus>,
    }

    async fn handler(ValidatedJson(_body): ValidatedJson<Body1>) -> &'static str {
        "ok"
    }

    async fn filtered(ApiQuery(_filter): ApiQuery<Filter>) -> &'static str {
        "ok"
    }

    async fn by_id(ApiPath(_id): ApiPath<Uuid>) -> &'static str {
        "ok"
    }

    fn app() -> Router {
        Router::new()
            .route("/", post(handler))
            .route("/filtered", get(filtered))
            .route("/visits/:id", get(by_id))
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn envelope(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_body() {
        let resp = app().oneshot(post_json(r#"{"minutes": 30}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_and_invalid_bodies_are_400() {
        let resp = app().oneshot(post_json("not json")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(envelope(resp).await["success"], false);

        let resp = app().oneshot(post_json(r#"{"minutes": 5}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(envelope(resp).await["errors"][0]["field"], "minutes");

        let resp = app().oneshot(post_json(r#"{"minutes": 30} trailing"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn undecodable_field_is_reported_by_name() {
        let resp = app()
            .oneshot(post_json(r#"{"minutes": 30, "visitDate": "tomorrow"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = envelope(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["errors"][0]["field"], "visitDate");

        let resp = app().oneshot(post_json(r#"{}"#)).await.unwrap();
        let body = envelope(resp).await;
        assert_eq!(body["errors"][0]["field"], "minutes");
        assert_eq!(body["errors"][0]["message"], "missing field `minutes`");
    }

    #[tokio::test]
    async fn missing_content_type_is_enveloped() {
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(r#"{"minutes": 30}"#))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(envelope(resp).await["success"], false);
    }

    #[tokio::test]
    async fn bad_query_and_path_values_are_enveloped() {
        for uri in ["/filtered?status=pending", "/visits/not-a-uuid"] {
            let resp = app().oneshot(get_request(uri)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
            let body = envelope(resp).await;
            assert_eq!(body["success"], false, "{uri}");
            assert!(body["message"].is_string(), "{uri}");
        }

        let resp = app().oneshot(get_request("/filtered?status=checked-in")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
