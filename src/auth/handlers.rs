use axum::{
    extract::{rejection::FormRejection, State},
    response::Redirect,
    routing::{get, post},
    Form, Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AccountPage, LoginForm, LoginValues, LogoutForm, PasswordUpdateForm, PasswordValues,
            SignupForm, SignupValues,
        },
        extractors::AuthUser,
        services::{renewal_failed, validate_login, validate_password_update, validate_signup},
    },
    error::{AppError, StoreError},
    forms::{normalize_email, FormPage},
    session::{RouteClass, Session},
    state::AppState,
};

pub const LOGIN_REDIRECT: &str = "/snippet/create";

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/signup", get(signup_page).post(signup))
        .route("/user/login", get(login_page).post(login))
        .route("/user/logout", post(logout))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/account/view", get(account_view))
        .route(
            "/account/password/update",
            get(password_update_page).post(password_update),
        )
}

pub async fn signup_page(session: Session) -> Json<FormPage<SignupValues>> {
    let mut session = session.lock().await;
    Json(FormPage::new(session.page(), SignupValues::default()))
}

#[instrument(skip(state, session, form))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(mut form): Form<SignupForm>,
) -> Result<Redirect, AppError> {
    let mut session = session.lock().await;
    state
        .policy
        .check(RouteClass::PublicWrite, &session, form.csrf_token.as_deref())?;

    form.email = normalize_email(&form.email);
    let mut errors = validate_signup(&form);
    if errors.is_valid() {
        match state.users.insert(&form.name, &form.email, &form.password).await {
            Ok(user_id) => {
                info!(user_id, "user signed up");
                session.set_flash("Your signup was successful. Please log in.");
                return Ok(Redirect::to("/user/login"));
            }
            Err(StoreError::DuplicateEmail) => {
                warn!("signup with an email already in use");
                errors.add_field_error("email", "Email address is already in use");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::validation(&FormPage::with_errors(
        session.page(),
        form.values(),
        errors,
    )))
}

pub async fn login_page(session: Session) -> Json<FormPage<LoginValues>> {
    let mut session = session.lock().await;
    Json(FormPage::new(session.page(), LoginValues::default()))
}

#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(mut form): Form<LoginForm>,
) -> Result<Redirect, AppError> {
    let mut session = session.lock().await;
    state
        .policy
        .check(RouteClass::PublicWrite, &session, form.csrf_token.as_deref())?;

    form.email = normalize_email(&form.email);
    let mut errors = validate_login(&form);
    if errors.is_valid() {
        match state.users.authenticate(&form.email, &form.password).await {
            Ok(user_id) => {
                let target = session
                    .take_redirect()
                    .unwrap_or_else(|| LOGIN_REDIRECT.to_string());
                state
                    .sessions
                    .login(&mut session, user_id)
                    .await
                    .map_err(renewal_failed)?;
                info!(user_id, "user logged in");
                return Ok(Redirect::to(&target));
            }
            Err(StoreError::InvalidCredentials) => {
                warn!("login rejected");
                errors.add_non_field_error("Email or password is incorrect");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::validation(&FormPage::with_errors(
        session.page(),
        form.values(),
        errors,
    )))
}

#[instrument(skip(state, session, form))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<LogoutForm>, FormRejection>,
) -> Result<Redirect, AppError> {
    let mut session = session.lock().await;
    // Anonymous submissions go to login before the body is decoded.
    state
        .policy
        .check(RouteClass::AuthenticatedRead, &session, None)?;
    let Form(form) = form?;
    state
        .policy
        .authorize_write(&session, form.csrf_token.as_deref())?;

    state
        .sessions
        .logout(&mut session)
        .await
        .map_err(renewal_failed)?;
    session.set_flash("You've been logged out successfully!");
    Ok(Redirect::to("/"))
}

#[instrument(skip(state, session))]
pub async fn account_view(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    session: Session,
) -> Result<Json<AccountPage>, AppError> {
    let user = match state.users.get(user_id).await {
        Ok(user) => user,
        // Deleted between the session layer's check and now.
        Err(StoreError::NoRecord) => return Err(AppError::AuthRequired),
        Err(e) => return Err(e.into()),
    };
    let mut session = session.lock().await;
    Ok(Json(AccountPage {
        page: session.page(),
        user,
    }))
}

pub async fn password_update_page(
    AuthUser(_): AuthUser,
    session: Session,
) -> Json<FormPage<PasswordValues>> {
    let mut session = session.lock().await;
    Json(FormPage::new(session.page(), PasswordValues::default()))
}

#[instrument(skip(state, session, form))]
pub async fn password_update(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<PasswordUpdateForm>, FormRejection>,
) -> Result<Redirect, AppError> {
    let mut session = session.lock().await;
    // Anonymous submissions go to login before the body is decoded.
    state
        .policy
        .check(RouteClass::AuthenticatedRead, &session, None)?;
    let Form(form) = form?;
    let user_id = state
        .policy
        .authorize_write(&session, form.csrf_token.as_deref())?;

    let mut errors = validate_password_update(&form);
    if errors.is_valid() {
        match state
            .users
            .update_password(user_id, &form.current_password, &form.new_password)
            .await
        {
            Ok(()) => {
                info!(user_id, "password updated");
                session.set_flash("Your password has been updated!");
                return Ok(Redirect::to("/account/view"));
            }
            Err(StoreError::InvalidCredentials) => {
                warn!(user_id, "password update with wrong current password");
                errors.add_field_error("current_password", "Current password is incorrect");
            }
            Err(StoreError::NoRecord) => return Err(AppError::AuthRequired),
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::validation(&FormPage::with_errors(
        session.page(),
        PasswordValues::default(),
        errors,
    )))
}
