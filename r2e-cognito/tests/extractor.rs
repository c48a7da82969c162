use http::header::{AUTHORIZATION, COOKIE};
use http::{HeaderMap, HeaderValue};
use r2e_cognito::extractor::{extract_bearer_token, extract_token};
use r2e_cognito::TokenSource;

const CLIENT_ID: &str = "client123";

fn headers(pairs: &[(http::HeaderName, &str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.append(name.clone(), HeaderValue::from_str(value).unwrap());
    }
    map
}

#[test]
fn valid_bearer_token() {
    assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
}

#[test]
fn case_insensitive_scheme() {
    assert_eq!(extract_bearer_token("bearer abc123"), Some("abc123"));
    assert_eq!(extract_bearer_token("BEARER abc123"), Some("abc123"));
}

#[test]
fn invalid_scheme_basic() {
    assert_eq!(extract_bearer_token("Basic abc123"), None);
}

#[test]
fn empty_authorization_header() {
    assert_eq!(extract_bearer_token(""), None);
    assert_eq!(extract_bearer_token("Bearer "), None);
}

#[test]
fn token_with_dots() {
    assert_eq!(extract_bearer_token("Bearer eyJ.eyJ.sig"), Some("eyJ.eyJ.sig"));
}

#[test]
fn header_map_bearer() {
    let map = headers(&[(AUTHORIZATION, "Bearer eyJ.eyJ.sig")]);
    assert_eq!(map.bearer_token().as_deref(), Some("eyJ.eyJ.sig"));
}

#[test]
fn header_map_cookie_across_headers() {
    let map = headers(&[(COOKIE, "a=1"), (COOKIE, "b=2; c=3")]);
    assert_eq!(map.cookie("a").as_deref(), Some("1"));
    assert_eq!(map.cookie("c").as_deref(), Some("3"));
    assert_eq!(map.cookie("d"), None);
}

#[test]
fn missing_everything_is_anonymous() {
    assert_eq!(extract_token(&HeaderMap::new(), CLIENT_ID), None);
}

#[test]
fn cookie_pair_yields_access_token() {
    let map = headers(&[(
        COOKIE,
        "CognitoIdentityServiceProvider.client123.LastAuthUser=alice; \
         CognitoIdentityServiceProvider.client123.alice.accessToken=eyJ.eyJ.sig",
    )]);
    assert_eq!(extract_token(&map, CLIENT_ID).as_deref(), Some("eyJ.eyJ.sig"));
}

#[test]
fn bearer_takes_priority_over_cookies() {
    let map = headers(&[
        (AUTHORIZATION, "Bearer from.header.sig"),
        (
            COOKIE,
            "CognitoIdentityServiceProvider.client123.LastAuthUser=alice; \
             CognitoIdentityServiceProvider.client123.alice.accessToken=from.cookie.sig",
        ),
    ]);
    assert_eq!(extract_token(&map, CLIENT_ID).as_deref(), Some("from.header.sig"));
}

#[test]
fn non_bearer_authorization_falls_back_to_cookies() {
    let map = headers(&[
        (AUTHORIZATION, "Basic dXNlcjpwYXNz"),
        (
            COOKIE,
            "CognitoIdentityServiceProvider.client123.LastAuthUser=alice; \
             CognitoIdentityServiceProvider.client123.alice.accessToken=from.cookie.sig",
        ),
    ]);
    assert_eq!(extract_token(&map, CLIENT_ID).as_deref(), Some("from.cookie.sig"));
}

#[test]
fn last_auth_user_without_token_cookie() {
    let map = headers(&[(COOKIE, "CognitoIdentityServiceProvider.client123.LastAuthUser=alice")]);
    assert_eq!(extract_token(&map, CLIENT_ID), None);
}

#[test]
fn cookies_of_another_client_are_ignored() {
    let map = headers(&[(
        COOKIE,
        "CognitoIdentityServiceProvider.other.LastAuthUser=alice; \
         CognitoIdentityServiceProvider.other.alice.accessToken=eyJ.eyJ.sig",
    )]);
    assert_eq!(extract_token(&map, CLIENT_ID), None);
}

#[test]
fn token_cookie_of_another_user_is_ignored() {
    let map = headers(&[(
        COOKIE,
        "CognitoIdentityServiceProvider.client123.LastAuthUser=alice; \
         CognitoIdentityServiceProvider.client123.bob.accessToken=eyJ.eyJ.sig",
    )]);
    assert_eq!(extract_token(&map, CLIENT_ID), None);
}
