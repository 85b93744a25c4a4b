use askama::Template;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::auth::session;
use crate::error::{AppError, AppResult};
use crate::extractors::MaybeUser;
use crate::routes::home::Html;
use crate::state::AppState;
use crate::users;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub message: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub message: Option<String>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirmation: String,
}

// -- Cookie helpers --

fn session_cookie(cookie_name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        cookie_name, token, max_age_secs
    )
}

fn clear_session_cookie(cookie_name: &str) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
        cookie_name
    )
}

fn get_cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
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

/// Log a user in: create a session and answer with cookie + redirect.
fn login_response(state: &AppState, user_id: &str) -> AppResult<Response> {
    let token = session::create_session(&state.db, user_id, state.config.auth.session_hours)?;
    let cookie = session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

// -- Login handlers --

/// GET /login — render login page
pub async fn login_page(maybe_user: MaybeUser) -> AppResult<Response> {
    if maybe_user.0.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(Html(LoginTemplate { message: None }).into_response())
}

/// POST /login — verify credentials, establish a session.
/// The failure message never says whether the username exists.
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    match users::find_by_username(&state.db, &form.username)? {
        Some(user) if bcrypt::verify(&form.password, &user.password_hash).unwrap_or(false) => {
            login_response(&state, &user.id)
        }
        _ => Ok(Html(LoginTemplate {
            message: Some("Invalid username and/or password.".to_string()),
        })
        .into_response()),
    }
}

/// GET /logout — tear down the session unconditionally.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = get_cookie_value(&headers, &state.config.auth.cookie_name) {
        session::delete_session(&state.db, token)?;
    }
    let cookie = clear_session_cookie(&state.config.auth.cookie_name);
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

// -- Registration handlers --

/// GET /register — render registration page
pub async fn register_page(maybe_user: MaybeUser) -> AppResult<Response> {
    if maybe_user.0.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(Html(RegisterTemplate { message: None }).into_response())
}

/// POST /register — create an account, log the session in.
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    if form.password != form.confirmation {
        return Ok(Html(RegisterTemplate {
            message: Some("Passwords must match.".to_string()),
        })
        .into_response());
    }

    let username = form.username.trim();
    if username.is_empty() {
        return Ok(Html(RegisterTemplate {
            message: Some("Username is required.".to_string()),
        })
        .into_response());
    }

    let password_hash = bcrypt::hash(&form.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    let Some(user) = users::create(&state.db, username, &form.email, &password_hash)? else {
        return Ok(Html(RegisterTemplate {
            message: Some("Username already taken.".to_string()),
        })
        .into_response());
    };

    login_response(&state, &user.id)
}
