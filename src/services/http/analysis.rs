use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use super::{call, json_body, AppState, AuthSession};
use crate::models::analysis::{AnalyzeForm, ImagePayload, WasteAnalysis};
use crate::services::{analysis::AnalysisRequest, ServiceError};

pub async fn analyze_waste(
    State(state): State<AppState>,
    session: AuthSession,
    body: Result<Json<AnalyzeForm>, JsonRejection>,
) -> Result<Json<WasteAnalysis>, ServiceError> {
    let form = json_body(body)?;
    let image = form
        .image
        .filter(|image| !image.is_empty())
        .ok_or_else(|| ServiceError::Validation("No image provided".to_string()))?;
    let image = ImagePayload::from_data_uri(&image)
        .map_err(|reason| ServiceError::Validation(reason.to_string()))?;

    log::info!("Analyzing waste image for user {}.", session.user.user_id);
    let analysis = call(&state.channels.analysis, "Analysis", |response| {
        AnalysisRequest::Classify { image, response }
    })
    .await??;

    log::info!(
        "Analysis completed: {} {} ({}% confidence, {} points).",
        analysis.quantity,
        analysis.waste_type,
        analysis.confidence,
        analysis.estimated_points
    );
    Ok(Json(analysis))
}
