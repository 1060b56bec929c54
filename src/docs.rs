use utoipa::OpenApi;
use crate::common::response::ErrorResponse;
use crate::modules::predict::dto::{PredictRequest, PredictResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::predict::handler::predict,
        crate::modules::output::handler::get_output,
    ),
    components(
        schemas(PredictRequest, PredictResponse, ErrorResponse)
    ),
    tags(
        (name = "Inference", description = "Audio-driven talking-head video synthesis")
    )
)]
pub struct ApiDoc;
