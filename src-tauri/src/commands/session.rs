use crate::error::AppError;
use crate::models::capture_types::CaptureSource;
use crate::models::predict_types::ViewState;
use crate::services::session::SessionController;
use tauri::State;

/// Run one capture-to-prediction flow from the given source and return
/// the settled view state.
#[tauri::command]
pub async fn capture_image(
    session: State<'_, SessionController>,
    source: CaptureSource,
) -> Result<ViewState, AppError> {
    Ok(session.capture(source).await)
}

/// Drop the current preview and outcome.
#[tauri::command]
pub async fn clear_session(session: State<'_, SessionController>) -> Result<ViewState, AppError> {
    Ok(session.clear().await)
}

#[tauri::command]
pub async fn get_view_state(session: State<'_, SessionController>) -> Result<ViewState, AppError> {
    Ok(session.current_state().await)
}

/// Liveness check against the configured prediction endpoint.
#[tauri::command]
pub async fn check_endpoint(session: State<'_, SessionController>) -> Result<bool, AppError> {
    Ok(session.ping().await)
}
