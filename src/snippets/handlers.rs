use axum::{
    extract::{rejection::FormRejection, Path, State},
    response::Redirect,
    routing::get,
    Form, Json, Router,
};
use tracing::{debug, info, instrument};

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    forms::FormPage,
    session::{RouteClass, Session},
    snippets::{
        dto::{CreateSnippetForm, HomePage, SnippetPage, SnippetValues},
        services::{parse_id, validate_snippet},
    },
    state::AppState,
};

pub fn snippet_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/snippet/view/:id", get(snippet_view))
        .route("/snippet/create", get(snippet_create_page).post(snippet_create))
}

#[instrument(skip(state, session))]
pub async fn home(State(state): State<AppState>, session: Session) -> Result<Json<HomePage>, AppError> {
    let snippets = state.snippets.latest().await?;
    let mut session = session.lock().await;
    Ok(Json(HomePage {
        page: session.page(),
        snippets,
    }))
}

#[instrument(skip(state, session))]
pub async fn snippet_view(
    State(state): State<AppState>,
    session: Session,
    Path(raw_id): Path<String>,
) -> Result<Json<SnippetPage>, AppError> {
    let Some(id) = parse_id(&raw_id) else {
        debug!(%raw_id, "malformed snippet id");
        return Err(AppError::NotFound);
    };
    let snippet = state.snippets.get(id).await?;
    let mut session = session.lock().await;
    Ok(Json(SnippetPage {
        page: session.page(),
        snippet,
    }))
}

pub async fn snippet_create_page(
    AuthUser(_): AuthUser,
    session: Session,
) -> Json<FormPage<SnippetValues>> {
    let mut session = session.lock().await;
    Json(FormPage::new(session.page(), SnippetValues::default()))
}

#[instrument(skip(state, session, form))]
pub async fn snippet_create(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<CreateSnippetForm>, FormRejection>,
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

    let (errors, expires) = validate_snippet(&form);
    let Some(expires) = expires.filter(|_| errors.is_valid()) else {
        return Err(AppError::validation(&FormPage::with_errors(
            session.page(),
            form.values(),
            errors,
        )));
    };

    let id = state.snippets.insert(&form.title, &form.content, expires).await?;
    info!(user_id, snippet_id = id, "snippet created");
    session.set_flash("Snippet successfully created!");
    Ok(Redirect::to(&format!("/snippet/view/{id}")))
}
