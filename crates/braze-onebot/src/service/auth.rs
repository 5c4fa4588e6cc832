//! Access-token validation for incoming upgrade requests.

use axum::http::{HeaderMap, header};

/// Validates a client's access token against the configured one.
///
/// With no configured token (or an empty one), every request passes. A
/// client may present its token either as `Authorization: Bearer <token>`
/// or, only when no `Authorization` header is present at all, as the
/// `access_token` query parameter. An `Authorization` header in any other
/// form yields no candidate and fails validation.
pub fn validate_access_token(
    configured: Option<&str>,
    headers: &HeaderMap,
    query: Option<&str>,
) -> bool {
    let Some(expected) = configured.filter(|t| !t.is_empty()) else {
        return true;
    };

    let candidate = match headers.get(header::AUTHORIZATION) {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer ")),
        None => query.and_then(|q| find_query_param(q, "access_token")),
    };

    candidate == Some(expected)
}

/// Returns the raw value of the first `name=value` pair in `query`.
fn find_query_param<'q>(query: &'q str, name: &str) -> Option<&'q str> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_authorization(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn no_configured_token_allows_all() {
        assert!(validate_access_token(None, &HeaderMap::new(), None));
        assert!(validate_access_token(Some(""), &HeaderMap::new(), None));
        assert!(validate_access_token(
            Some(""),
            &headers_with_authorization("Bearer anything"),
            None
        ));
    }

    #[test]
    fn bearer_header_must_match() {
        let headers = headers_with_authorization("Bearer k");
        assert!(validate_access_token(Some("k"), &headers, None));
        assert!(!validate_access_token(Some("other"), &headers, None));
    }

    #[test]
    fn non_bearer_authorization_fails() {
        let headers = headers_with_authorization("Token k");
        assert!(!validate_access_token(Some("k"), &headers, None));
    }

    #[test]
    fn query_parameter_used_only_without_authorization_header() {
        assert!(validate_access_token(
            Some("k"),
            &HeaderMap::new(),
            Some("access_token=k")
        ));
        assert!(!validate_access_token(
            Some("k"),
            &HeaderMap::new(),
            Some("access_token=wrong")
        ));
        // header present -> query ignored
        let headers = headers_with_authorization("Bearer wrong");
        assert!(!validate_access_token(
            Some("k"),
            &headers,
            Some("access_token=k")
        ));
    }

    #[test]
    fn missing_candidate_fails() {
        assert!(!validate_access_token(Some("k"), &HeaderMap::new(), None));
        assert!(!validate_access_token(
            Some("k"),
            &HeaderMap::new(),
            Some("other=1")
        ));
    }

    #[test]
    fn finds_parameter_among_many() {
        let query = "foo=1&access_token=tok&bar=2";
        assert!(validate_access_token(Some("tok"), &HeaderMap::new(), Some(query)));
    }
}
