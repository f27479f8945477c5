pub mod json;
pub mod path;
pub mod query;
pub mod validated;

use axum::{async_trait, extract::Request};
use schemars::{schema_for, JsonSchema};

use crate::error::{ApiError, Violation};

pub trait Extractor {
    type Extracted;

    fn extracted(&self) -> &Self::Extracted;
}

/// Extraction that tolerates malformed fields.
///
/// Fields that can not be extracted are left out of the result and reported as violations,
/// so that [`validated::Validated`] can report them next to the validation errors.
#[async_trait]
pub trait PartialFromRequest<S>: Sized {
    async fn from_request_partial(
        req: Request,
        state: &S,
    ) -> Result<(Self, Vec<Violation>), ApiError>;
}

/// Renders the schema of `T` as YAML for error responses.
fn expected_schema<T: JsonSchema>() -> Option<String> {
    serde_yaml::to_string(&schema_for!(T))
        .map_err(|err| tracing::warn!(%err, "Failed to render expected schema"))
        .ok()
}
