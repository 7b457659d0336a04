use super::*;

fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.insert(*name, HeaderValue::from_static(value));
    }
    map
}

// =============================================================================
// upstream_url
// =============================================================================

#[test]
fn upstream_url_joins_base_api_and_tail() {
    assert_eq!(upstream_url("http://chat:8001", "v1/chat", None), "http://chat:8001/api/v1/chat");
}

#[test]
fn upstream_url_appends_query() {
    assert_eq!(
        upstream_url("http://edu:8002", "cases", Some("page=2&q=t%C3%B3rax")),
        "http://edu:8002/api/cases?page=2&q=t%C3%B3rax"
    );
}

#[test]
fn upstream_url_ignores_empty_query_and_leading_slash() {
    assert_eq!(upstream_url("http://sim:8003", "/sessions", Some("")), "http://sim:8003/api/sessions");
}

// =============================================================================
// methods
// =============================================================================

#[test]
fn body_only_for_post_put_patch() {
    assert!(forwards_body(&Method::POST));
    assert!(forwards_body(&Method::PUT));
    assert!(forwards_body(&Method::PATCH));
    assert!(!forwards_body(&Method::GET));
    assert!(!forwards_body(&Method::DELETE));
}

#[test]
fn options_and_head_are_not_forwarded() {
    assert!(is_forwardable(&Method::DELETE));
    assert!(!is_forwardable(&Method::OPTIONS));
    assert!(!is_forwardable(&Method::HEAD));
}

#[test]
fn proxy_request_keeps_only_content_type_and_authorization() {
    let incoming = headers(&[
        ("content-type", "application/json"),
        ("authorization", "Bearer tok"),
        ("cookie", "session=abc"),
    ]);
    let req = ProxyRequest::new(Method::POST, "chat", Some("stream=true"), &incoming, Bytes::from_static(b"{}"));
    assert_eq!(req.content_type, Some(HeaderValue::from_static("application/json")));
    assert_eq!(req.authorization, Some(HeaderValue::from_static("Bearer tok")));
    assert_eq!(req.query.as_deref(), Some("stream=true"));
}

// =============================================================================
// classify
// =============================================================================

#[test]
fn classify_event_stream() {
    assert_eq!(classify(&headers(&[("content-type", "text/event-stream")])), RelayMode::Stream);
}

#[test]
fn classify_plain_text_streams() {
    assert_eq!(classify(&headers(&[("content-type", "text/plain; charset=utf-8")])), RelayMode::Stream);
}

#[test]
fn classify_chunked_wins_over_json() {
    let h = headers(&[("content-type", "application/json"), ("transfer-encoding", "chunked")]);
    assert_eq!(classify(&h), RelayMode::Stream);
}

#[test]
fn classify_json_case_insensitive() {
    assert_eq!(classify(&headers(&[("content-type", "Application/JSON")])), RelayMode::Json);
}

#[test]
fn classify_other_is_text() {
    assert_eq!(classify(&headers(&[("content-type", "text/html")])), RelayMode::Text);
    assert_eq!(classify(&HeaderMap::new()), RelayMode::Text);
}

// =============================================================================
// errors
// =============================================================================

#[test]
fn error_status_mapping() {
    let unknown = ProxyError::from(UnknownService("billing".into()));
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert_eq!(unknown.error_code(), "E_UNKNOWN_SERVICE");
    assert_eq!(unknown.user_message(), "Servicio no encontrado: billing");

    let timeout = ProxyError::Timeout { service: ServiceName::Chatbot, after: Duration::from_secs(30) };
    assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(timeout.retryable());
    assert_eq!(timeout.to_string(), "upstream chatbot did not respond within 30000ms");

    let invalid = ProxyError::InvalidJson { service: ServiceName::Radiografias, message: "eof".into() };
    assert_eq!(invalid.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(invalid.error_code(), "E_PROXY_FAILED");
    assert!(!invalid.retryable());
}

#[test]
fn public_details_never_expose_transport_text() {
    let upstream = ProxyError::Upstream {
        service: ServiceName::Educacion,
        message: "error sending request for url (http://10.0.3.7:8002/api/cases)".into(),
    };
    assert_eq!(upstream.public_details(), None);
    assert!(upstream.to_string().contains("10.0.3.7"));

    let timeout = ProxyError::Timeout { service: ServiceName::Chatbot, after: Duration::from_millis(250) };
    assert_eq!(timeout.public_details().as_deref(), Some("sin respuesta tras 250ms"));
}
