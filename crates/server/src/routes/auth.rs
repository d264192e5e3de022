//! Authentication route handlers.
//!
//! Login is the wishlist merge trigger: the guest record folds into the
//! user's durable record *before* the session flips to the authenticated
//! identity. Once the flip happens the identity resolver ignores the guest
//! token entirely, so reversing the order would orphan the guest record.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use wishlist_core::{Email, GuestToken};

use crate::error::AppError;
use crate::middleware::identity::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, session_keys};
use crate::services::users::verify_password;
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Query parameters for error display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
}

/// Display the login page.
#[instrument(skip(query))]
pub async fn login_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    LoginTemplate {
        error: query.error.map(|_| "Invalid email or password.".to_owned()),
    }
}

/// Handle login form submission.
///
/// On success, merges the guest wishlist into the user's record and then
/// writes the user into the session, strictly in that order.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let rejected = || Redirect::to("/auth/login?error=credentials").into_response();

    let Ok(email) = Email::parse(&form.email) else {
        return Ok(rejected());
    };

    let Some(user) = state.users().find_by_email(&email).await? else {
        tracing::debug!(email = %email, "login for unknown email");
        return Ok(rejected());
    };

    let verified = verify_password(&form.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !verified {
        tracing::debug!(user_id = %user.id, "login with wrong password");
        return Ok(rejected());
    }

    // Merge the guest record while the session still carries the token.
    let guest_token = session
        .get::<String>(session_keys::GUEST_TOKEN)
        .await?
        .and_then(|raw| GuestToken::new(raw).ok());
    if let Some(token) = guest_token {
        state.wishlist().merge(user.id, &token).await?;
        session
            .remove::<String>(session_keys::GUEST_TOKEN)
            .await?;
        tracing::info!(user_id = %user.id, "merged guest wishlist at login");
    }

    set_current_user(
        &session,
        &CurrentUser {
            id: user.id,
            email: user.email,
        },
    )
    .await?;

    Ok(Redirect::to("/wishlist").into_response())
}

/// Handle logout.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Response, AppError> {
    clear_current_user(&session).await?;
    Ok(Redirect::to("/").into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use secrecy::SecretString;
    use tower::ServiceExt;

    use wishlist_core::UserId;

    use crate::config::{
        ButtonAction, NoticeTexts, ServerConfig, StorageBackend, WishlistSettings,
    };
    use crate::middleware::memory_session_layer;
    use crate::routes;
    use crate::services::cart::StubCartGateway;
    use crate::services::catalog::StaticCatalog;
    use crate::services::users::MemoryUserStore;
    use crate::state::AppState;
    use crate::store::MemoryWishlistStore;

    fn test_app() -> Router {
        let config = ServerConfig {
            database_url: None,
            storage: StorageBackend::Memory,
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            base_url: "http://localhost:3000".to_owned(),
            session_secret: SecretString::from("kQ8vR2mX5wZ1nB4cF7hJ0pL3sD6gT9yU"),
            cart_service_url: None,
            sentry_dsn: None,
            wishlist: WishlistSettings {
                guest_expiry_days: 30,
                remove_on_second_click: false,
                button_action: ButtonAction::Popup,
                show_icon: true,
                redirect_to_cart: true,
                remove_if_added_to_cart: true,
                texts: NoticeTexts::default(),
            },
        };
        let session_layer = memory_session_layer(&config);
        let users = MemoryUserStore::new()
            .with_user(
                UserId::new(1),
                wishlist_core::Email::parse("shopper@example.com").unwrap(),
                "swordfish123",
            )
            .unwrap();
        let state = AppState::new(
            config,
            Arc::new(MemoryWishlistStore::new(Duration::from_secs(30 * 86_400))),
            Arc::new(StaticCatalog::demo()),
            Arc::new(StubCartGateway::default()),
            Arc::new(users),
        );
        routes::routes().layer(session_layer).with_state(state)
    }

    async fn open_session(app: &Router) -> (String, String) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/wishlist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie")
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_owned();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        let nonce = html
            .split("data-wishlist-nonce=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap()
            .to_owned();
        (cookie, nonce)
    }

    async fn post_form(app: &Router, uri: &str, cookie: &str, body: String) -> StatusCode {
        app.clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::COOKIE, cookie)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    async fn page_html(app: &Router, cookie: &str) -> String {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/wishlist")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn wrong_credentials_bounce_back_to_login() {
        let app = test_app();
        let (cookie, _) = open_session(&app).await;

        let status = post_form(
            &app,
            "/auth/login",
            &cookie,
            "email=shopper%40example.com&password=wrong".to_owned(),
        )
        .await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        // Still anonymous: the guest banner machinery is intact.
        let html = page_html(&app, &cookie).await;
        assert!(html.contains("wishlist-empty"));
    }

    #[tokio::test]
    async fn login_merges_guest_wishlist_into_user_record() {
        let app = test_app();
        let (cookie, nonce) = open_session(&app).await;

        // Collect as a guest
        for id in [1, 2] {
            let status = post_form(
                &app,
                "/wishlist/update",
                &cookie,
                format!("product_id={id}&nonce={nonce}"),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let status = post_form(
            &app,
            "/auth/login",
            &cookie,
            "email=shopper%40example.com&password=swordfish123".to_owned(),
        )
        .await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        // The now-authenticated session sees the merged items, and the guest
        // banner is gone.
        let html = page_html(&app, &cookie).await;
        assert!(html.contains("Canvas Tote"));
        assert!(html.contains("Enamel Mug"));
        assert!(!html.contains("wishlist-guest-notice"));

        // A fresh anonymous session starts empty: the guest record died with
        // the merge.
        let (fresh_cookie, _) = open_session(&app).await;
        let html = page_html(&app, &fresh_cookie).await;
        assert!(html.contains("wishlist-empty"));
    }

    #[tokio::test]
    async fn logout_returns_session_to_guest() {
        let app = test_app();
        let (cookie, nonce) = open_session(&app).await;

        let _ = post_form(
            &app,
            "/wishlist/update",
            &cookie,
            format!("product_id=1&nonce={nonce}"),
        )
        .await;
        let _ = post_form(
            &app,
            "/auth/login",
            &cookie,
            "email=shopper%40example.com&password=swordfish123".to_owned(),
        )
        .await;

        let status = post_form(&app, "/auth/logout", &cookie, String::new()).await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        // Anonymous again with a fresh (empty) guest record; the user's
        // durable record is untouched underneath.
        let html = page_html(&app, &cookie).await;
        assert!(html.contains("wishlist-empty"));
    }
}
