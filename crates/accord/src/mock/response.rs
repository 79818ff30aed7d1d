//! Response construction for the mock server.

use crate::interaction::ResponseExpectation;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

/// Build an HTTP response with headers.
///
/// Falls back to a bare 500 if the builder rejects a header.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder.body(Full::new(body.into())).unwrap_or_else(|_| {
        let mut response = Response::new(Full::new(Bytes::from("Internal Server Error")));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string_pretty(body).unwrap_or_else(|_| "{}".to_string());
    build_response_with_headers(status, [("Content-Type", "application/json")], json)
}

/// Serve the example response of an interaction. A JSON body without a
/// declared `Content-Type` gets `application/json`.
pub fn example_response(expected: &ResponseExpectation) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(expected.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut headers = expected.example_headers();
    let body = expected.example_body();

    let declares_content_type = headers
        .iter()
        .any(|(k, _)| k.eq_ignore_ascii_case("content-type"));
    let is_json = expected
        .body
        .as_ref()
        .is_some_and(|b| !b.example().is_string());
    if is_json && !declares_content_type {
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
    }

    build_response_with_headers(status, headers, body.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MatchRule;
    use http_body_util::BodyExt;
    use serde_json::json;

    async fn body_text(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_example_response_adds_json_content_type() {
        let expected = ResponseExpectation::new(404)
            .body(json!({"message": "Requested car is not found"}));
        let response = example_response(&expected);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(
            body_text(response).await,
            r#"{"message":"Requested car is not found"}"#
        );
    }

    #[tokio::test]
    async fn test_example_response_keeps_declared_content_type() {
        let expected = ResponseExpectation::new(200)
            .header(
                "Content-Type",
                MatchRule::regex("application/json; charset=utf-8", r"application\/json").unwrap(),
            )
            .body(json!({"id": "1"}));
        let response = example_response(&expected);
        assert_eq!(
            response.headers()["content-type"],
            "application/json; charset=utf-8"
        );
        assert_eq!(response.headers().get_all("content-type").iter().count(), 1);
    }

    #[tokio::test]
    async fn test_text_body_is_sent_verbatim() {
        let expected = ResponseExpectation::new(200).body(crate::ExpectationNode::from("pong"));
        let response = example_response(&expected);
        assert!(response.headers().get("content-type").is_none());
        assert_eq!(body_text(response).await, "pong");
    }
}
