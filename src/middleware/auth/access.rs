//! Bearer JWT filter: verify the access token, publish its claims in `X-USER`, forward.
//!
//! Per request:
//! 1. `OPTIONS` is forwarded untouched (pre-flight never carries credentials).
//! 2. `Authorization: Bearer <jwt>` is extracted. Missing or unparseable values are treated
//!    exactly like an invalid token.
//! 3. The token is verified by [`AccessVerifier`].
//! 4. Valid: claims are written to `X-USER` as compact JSON and the request goes to `next`.
//!    Invalid: `next` is not called and a fixed 403 JSON response is returned.

use std::future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    Router,
    body::Body,
    http::{
        HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, header,
        header::InvalidHeaderValue,
    },
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tower::{Layer, Service};
use tracing::{debug, error, warn};

use crate::plugin::JwtMiddleware;
use crate::services::auth::{AccessVerifier, ClaimSet, InvalidToken};

/// Header carrying the verified claims to downstream handlers.
pub const USER_HEADER: &str = "X-USER";

const USER_HEADER_NAME: HeaderName = HeaderName::from_static("x-user");

/// Body of every rejection. Exact bytes, no trailing newline.
pub const FORBIDDEN_BODY: &str = r#"{"error": "forbidden"}"#;

/// Put every route of `router` behind the JWT filter.
///
/// ```ignore
/// let v1 = middleware::auth::access::apply(api::v1::protected_routes(), &jwt);
/// ```
pub fn apply<S>(router: Router<S>, jwt: &JwtMiddleware) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(jwt.layer())
}

/// Read the bearer credential from `Authorization`.
///
/// The scheme is matched case-insensitively. Returns `None` when the header is absent,
/// not visible ASCII, uses another scheme, or carries an empty token.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// The terminal response for every refused request.
pub fn forbidden() -> Response {
    Response::builder()
        .status(StatusCode::FORBIDDEN)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, FORBIDDEN_BODY.len())
        .body(Body::from(FORBIDDEN_BODY))
        .unwrap_or_else(|err| {
            error!(error = %err, "failed to build forbidden response");
            StatusCode::FORBIDDEN.into_response()
        })
}

#[derive(Debug, Error)]
enum ClaimsHeaderError {
    #[error("cannot serialize claims: {0}")]
    Json(#[from] serde_json::Error),
    #[error("claims are not a valid header value: {0}")]
    Header(#[from] InvalidHeaderValue),
}

fn claims_header(claims: &ClaimSet) -> Result<HeaderValue, ClaimsHeaderError> {
    let json = serde_json::to_vec(claims)?;
    Ok(HeaderValue::from_bytes(&json)?)
}

/// Decide whether `req` may be forwarded.
///
/// `Ok(())` leaves `req` ready for `next` (with `X-USER` set unless bypassed).
/// `Err(response)` is the terminal rejection.
pub fn authorize<B>(verifier: &AccessVerifier, req: &mut Request<B>) -> Result<(), Response> {
    if req.method() == Method::OPTIONS {
        return Ok(());
    }

    let verified = extract_bearer_token(req.headers())
        .ok_or(InvalidToken::MissingCredential)
        .and_then(|token| verifier.verify(token));

    let claims = match verified {
        Ok(claims) => claims,
        Err(reason) => {
            warn!(
                %reason,
                method = %req.method(),
                uri = %req.uri(),
                "access token verification failed"
            );
            return Err(forbidden());
        }
    };

    let value = claims_header(&claims).map_err(|err| {
        error!(error = %err, "cannot publish claims in {USER_HEADER}");
        forbidden()
    })?;

    debug!(claims = claims.len(), "access token verified");
    // Overwrites anything the client sent under the same name.
    req.headers_mut().insert(USER_HEADER_NAME, value);

    Ok(())
}

/// Tower layer wrapping a service in [`JwtHandler`].
#[derive(Clone, Debug)]
pub struct JwtLayer {
    verifier: Arc<AccessVerifier>,
}

impl JwtLayer {
    pub fn new(verifier: Arc<AccessVerifier>) -> Self {
        Self { verifier }
    }
}

impl<S> Layer<S> for JwtLayer {
    type Service = JwtHandler<S>;

    fn layer(&self, next: S) -> Self::Service {
        JwtHandler::new(self.verifier.clone(), next)
    }
}

/// The filter composed with its downstream handler.
#[derive(Clone, Debug)]
pub struct JwtHandler<S> {
    verifier: Arc<AccessVerifier>,
    next: S,
}

impl<S> JwtHandler<S> {
    pub fn new(verifier: Arc<AccessVerifier>, next: S) -> Self {
        Self { verifier, next }
    }
}

impl<S, B> Service<Request<B>> for JwtHandler<S>
where
    S: Service<Request<B>, Response = Response>,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        match authorize(&self.verifier, &mut req) {
            Ok(()) => Box::pin(self.next.call(req)),
            Err(rejection) => Box::pin(future::ready(Ok(rejection))),
        }
    }
}
