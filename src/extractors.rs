use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;
use std::net::SocketAddr;

use crate::auth::handlers::ADMIN_COOKIE;
use crate::auth::session;
use crate::error::AppError;
use crate::state::AppState;

/// An admin holding an unexpired session token.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub username: String,
    pub token: String,
}

/// Extractor that requires an admin session.
/// The token is read from `Authorization: Bearer` first, then the admin cookie.
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)
            .or_else(|| extract_cookie(parts, ADMIN_COOKIE))
            .ok_or(AppError::Unauthorized)?
            .to_string();

        let username = session::find_session(&state.db, &token)?.ok_or(AppError::Unauthorized)?;
        Ok(AdminUser { username, token })
    }
}

/// Best-effort caller details attached to analytics events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let ip = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        Ok(RequestContext { ip, user_agent })
    }
}

fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn extract_cookie<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name {
                Some(val)
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_token_is_extracted() {
        let parts = parts_with(&[("authorization", "Bearer abc123")]);
        assert_eq!(extract_bearer_token(&parts), Some("abc123"));

        let parts = parts_with(&[("authorization", "Basic abc123")]);
        assert_eq!(extract_bearer_token(&parts), None);
    }

    #[test]
    fn cookie_is_found_among_others() {
        let parts = parts_with(&[("cookie", "theme=dark; qrshare_admin=tok; other=1")]);
        assert_eq!(extract_cookie(&parts, ADMIN_COOKIE), Some("tok"));
        assert_eq!(extract_cookie(&parts, "missing"), None);
    }

    #[tokio::test]
    async fn request_context_prefers_forwarded_for() {
        let mut parts = parts_with(&[
            ("x-forwarded-for", "203.0.113.9, 10.0.0.1"),
            ("user-agent", "Mobile Safari"),
        ]);
        parts
            .extensions
            .insert(ConnectInfo("127.0.0.1:5000".parse::<SocketAddr>().unwrap()));

        let ctx = RequestContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(ctx.user_agent.as_deref(), Some("Mobile Safari"));
    }

    #[tokio::test]
    async fn request_context_falls_back_to_socket_address() {
        let mut parts = parts_with(&[]);
        parts
            .extensions
            .insert(ConnectInfo("192.168.1.7:5000".parse::<SocketAddr>().unwrap()));

        let ctx = RequestContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.ip.as_deref(), Some("192.168.1.7"));
        assert!(ctx.user_agent.is_none());
    }
}
