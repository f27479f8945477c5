use axum::{
    async_trait,
    extract::{FromRequest, Request},
};
use validator::Validate;

use crate::error::{self, ApiError, BadRequestError, ErrorVerbosityProvider};

use super::{Extractor, PartialFromRequest};

/// An extractor that validates the data extracted by another extractor.
///
/// Rejects with a bad request listing every violated constraint: fields the inner extractor
/// could not extract, followed by the validation errors of everything else.
pub struct Validated<X>(pub X);

#[async_trait]
impl<X, S> FromRequest<S> for Validated<X>
where
    X: PartialFromRequest<S> + Extractor + Send,
    <X as Extractor>::Extracted: Validate,
    S: Send + Sync + ErrorVerbosityProvider,
{
    type Rejection = ApiError;

    #[tracing::instrument(name = "validated_extractor", skip_all)]
    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (inner, mut violations) = X::from_request_partial(req, state).await?;

        if let Err(errors) = inner.extracted().validate() {
            tracing::warn!(?errors, "Validation errors");

            // A dropped field would otherwise also be reported as missing.
            let validation_violations = error::violations(&errors)
                .into_iter()
                .filter(|violation| {
                    !violations.iter().any(|mistyped| {
                        mistyped
                            .field
                            .as_deref()
                            .is_some_and(|field| violation.concerns(field))
                    })
                })
                .collect::<Vec<_>>();

            violations.extend(validation_violations);
        }

        match violations.is_empty() {
            true => {
                tracing::trace!("Validated");

                Ok(Validated(inner))
            }
            false => {
                let verbosity = state.error_verbosity();

                Err(BadRequestError::from_violations(verbosity, violations).into())
            }
        }
    }
}
