use rama::http::{
    Response, StatusCode,
    headers::ContentType,
    service::web::response::{Headers, IntoResponse},
};

use crate::engine::SimulationResult;

/// Serialize a simulation result as a plain text response.
pub fn simulation_result_into_response(result: SimulationResult) -> Response {
    let status = StatusCode::from_u16(result.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Headers::single(ContentType::text_utf8()),
        result.message,
    )
        .into_response()
}
