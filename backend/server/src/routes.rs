use std::sync::Arc;

use axum::{
    extract::{self, Query},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use maud::{PreEscaped, html};
use tracing::info;

use crate::{
    error::AppError,
    questions::{QuestionKind, Reply},
    state::State,
    utils::Params,
};

pub const QUESTION_PAGE: &str = include_str!("../html/question_list.html");

const ANSWER_STYLE: &str = "body {background-color:#b0c4de; }";

pub async fn question_page_handler() -> Html<&'static str> {
    Html(QUESTION_PAGE)
}

pub async fn question_handler(
    extract::State(state): extract::State<Arc<State>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let params: Params = pairs.into_iter().collect();

    let q_id = params.required(
        "qID",
        "No question ID was included in the URL",
        "URL cannot be parsed into a question.",
    )?;
    let kind: QuestionKind = q_id.parse()?;

    info!(%kind, "Answering question");

    let response = match state.resolver().answer(kind, &params).await? {
        Reply::Answered(fragment) => envelope(&fragment).into_response(),
        Reply::Empty(message) => (StatusCode::NOT_FOUND, envelope(&message)).into_response(),
    };

    Ok(response)
}

pub async fn invalidate_cache_handler(
    extract::State(state): extract::State<Arc<State>>,
) -> StatusCode {
    let dropped = state.cache.len();
    state.cache.invalidate_all();

    info!(dropped, "Answer cache invalidated");

    StatusCode::NO_CONTENT
}

pub async fn unknown_path_handler() -> AppError {
    AppError::malformed("Server only answers questions.")
}

/// Wraps an answer fragment in the minimal page every answer is served in.
pub fn envelope(fragment: &str) -> Html<String> {
    let page = html! {
        html {
            head {
                title { "Answer" }
                style { (PreEscaped(ANSWER_STYLE)) }
            }
            body {
                p { (PreEscaped(fragment)) }
            }
        }
    };

    Html(page.into_string())
}
