use crate::errors::AppError;
use crate::models::{RenderedView, SubmissionForm, SubmitResponse};
use crate::state::AppState;
use crate::ui::render_index;
use axum::{Json, extract::State, response::Html};

const SUBMITTED: &str = "Your answers were submitted. Thank you!";

/// Every page load fetches the latest rows before rendering.
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let view = state.load().await;
    let page = render_index(&view).map_err(AppError::internal)?;
    Ok(Html(page))
}

pub async fn get_stats(State(state): State<AppState>) -> Json<RenderedView> {
    Json(state.current_view().await)
}

pub async fn submit(
    State(state): State<AppState>,
    Json(form): Json<SubmissionForm>,
) -> Result<Json<SubmitResponse>, AppError> {
    let view = state.submit(&form).await?;
    Ok(Json(SubmitResponse {
        message: SUBMITTED.to_string(),
        view,
    }))
}
