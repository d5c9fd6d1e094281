mod common;

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::any};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use tower::{ServiceExt, service_fn};

use common::{
    OTHER_PRIVATE_KEY, PRIVATE_KEY, PUBLIC_KEY, body_string, create_expired_jwt_token,
    create_jwt_token, jwt, now, sign_with,
};
use jwt_gate::{FORBIDDEN_BODY, USER_HEADER};

const SEEN_USER: HeaderName = HeaderName::from_static("x-seen-user");

/// Downstream handler: answers "treasure" and reports the `X-USER` value it received.
async fn treasure(headers: HeaderMap) -> impl IntoResponse {
    let seen = headers
        .get(USER_HEADER)
        .cloned()
        .unwrap_or(HeaderValue::from_static("none"));
    ([(SEEN_USER, seen)], "treasure")
}

fn app() -> Router {
    Router::new().route("/", any(treasure)).layer(jwt().layer())
}

fn get_with_auth(value: &str) -> Request<Body> {
    Request::builder()
        .uri("/")
        .header(header::AUTHORIZATION, value)
        .body(Body::empty())
        .unwrap()
}

async fn assert_forbidden(resp: Response) {
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(resp.headers()[header::CONTENT_LENGTH], "22");
    assert_eq!(body_string(resp).await, r#"{"error": "forbidden"}"#);
}

fn seen_claims(resp: &Response) -> Value {
    serde_json::from_slice(resp.headers()[SEEN_USER].as_bytes()).unwrap()
}

#[tokio::test]
async fn valid_token_reaches_downstream_with_claims() {
    let token = create_jwt_token("123");

    let resp = app()
        .oneshot(get_with_auth(&format!("Bearer {token}")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let claims = seen_claims(&resp);
    assert_eq!(claims["userid"], "123");
    assert_eq!(body_string(resp).await, "treasure");
}

#[tokio::test]
async fn forwarded_claims_equal_token_claims_exactly() {
    let claims = json!({
        "userid": "123",
        "exp": now() + 3600,
        "name": "山田 太郎",
        "roles": ["reader", "writer"],
        "org": {"id": 7, "admin": false},
    });
    let token = sign_with(PRIVATE_KEY, &claims);

    let resp = app()
        .oneshot(get_with_auth(&format!("Bearer {token}")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(seen_claims(&resp), claims);
}

#[tokio::test]
async fn client_supplied_user_header_is_replaced() {
    let token = create_jwt_token("123");
    let req = Request::builder()
        .uri("/")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(USER_HEADER, r#"{"userid": "admin"}"#)
        .body(Body::empty())
        .unwrap();

    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(seen_claims(&resp)["userid"], "123");
}

#[tokio::test]
async fn options_is_forwarded_without_credentials() {
    for auth in [None, Some("open please"), Some("Bearer not.a.jwt")] {
        let mut req = Request::builder().method(Method::OPTIONS).uri("/");
        if let Some(auth) = auth {
            req = req.header(header::AUTHORIZATION, auth);
        }

        let resp = app().oneshot(req.body(Body::empty()).unwrap()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK, "auth: {auth:?}");
        assert_eq!(resp.headers()[SEEN_USER], "none");
        assert_eq!(body_string(resp).await, "treasure");
    }
}

#[tokio::test]
async fn expired_token_is_forbidden() {
    let token = create_expired_jwt_token("123");

    let resp = app()
        .oneshot(get_with_auth(&format!("Bearer {token}")))
        .await
        .unwrap();

    assert_forbidden(resp).await;
}

#[tokio::test]
async fn missing_authorization_is_forbidden() {
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();

    let resp = app().oneshot(req).await.unwrap();

    assert_forbidden(resp).await;
}

#[tokio::test]
async fn malformed_authorization_is_forbidden() {
    for value in ["blablabla=", "open please", "Bearer", "Bearer garbage"] {
        let resp = app().oneshot(get_with_auth(value)).await.unwrap();
        assert_forbidden(resp).await;
    }
}

#[tokio::test]
async fn token_from_other_key_is_forbidden() {
    let token = sign_with(OTHER_PRIVATE_KEY, &json!({"userid": "123", "exp": now() + 3600}));

    let resp = app()
        .oneshot(get_with_auth(&format!("Bearer {token}")))
        .await
        .unwrap();

    assert_forbidden(resp).await;
}

#[tokio::test]
async fn hmac_token_keyed_with_public_key_is_forbidden() {
    let key = EncodingKey::from_secret(PUBLIC_KEY.as_bytes());
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &json!({"userid": "123", "exp": now() + 3600}),
        &key,
    )
    .unwrap();

    let resp = app()
        .oneshot(get_with_auth(&format!("Bearer {token}")))
        .await
        .unwrap();

    assert_forbidden(resp).await;
}

#[tokio::test]
async fn new_handler_wraps_plain_tower_service() {
    let next = service_fn(|req: Request<Body>| async move {
        let auth = req.headers()[header::AUTHORIZATION].clone();
        Ok::<_, Infallible>(([(header::AUTHORIZATION, auth)], "treasure").into_response())
    });
    let svc = jwt().new_handler(next);
    let value = format!("Bearer {}", create_jwt_token("123"));

    let resp = svc.oneshot(get_with_auth(&value)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    // Authorization reaches downstream untouched.
    assert_eq!(resp.headers()[header::AUTHORIZATION], value.as_str());
}

#[tokio::test]
async fn concurrent_requests_are_isolated() {
    let app = app();

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let user = i.to_string();
                let token = if i % 2 == 0 {
                    create_jwt_token(&user)
                } else {
                    create_expired_jwt_token(&user)
                };
                let resp = app
                    .oneshot(get_with_auth(&format!("Bearer {token}")))
                    .await
                    .unwrap();
                (i, user, resp)
            })
        })
        .collect();

    for task in tasks {
        let (i, user, resp) = task.await.unwrap();
        if i % 2 == 0 {
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(seen_claims(&resp)["userid"], user.as_str());
        } else {
            assert_forbidden(resp).await;
        }
    }
}

#[tokio::test]
async fn claims_unfit_for_a_header_are_forbidden() {
    // Valid signature and expiry, but serde_json emits DEL raw and headers refuse it.
    let token = sign_with(
        PRIVATE_KEY,
        &json!({"userid": "a\u{7f}b", "exp": now() + 3600}),
    );
    let calls = Arc::new(AtomicUsize::new(0));
    let next = {
        let calls = calls.clone();
        service_fn(move |_req: Request<Body>| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Infallible>("treasure".into_response()) }
        })
    };

    let resp = jwt()
        .new_handler(next)
        .oneshot(get_with_auth(&format!("Bearer {token}")))
        .await
        .unwrap();

    assert_forbidden(resp).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn forbidden_body_is_22_bytes() {
    assert_eq!(FORBIDDEN_BODY.len(), 22);
}
