use axum::{
    async_trait,
    extract::{FromRequest, Json as AxumJson, Request},
};
use schemars::{
    schema::{InstanceType, Schema, SingleOrVec},
    schema_for, JsonSchema,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;

use crate::error::{ApiError, BadRequestError, ErrorVerbosityProvider, Violation};

use super::{expected_schema, Extractor, PartialFromRequest};

/// A Wrapper around [`axum::extract::Json`] that rejects with an [`ApiError`].
///
/// Extracts the request body as JSON consuming the request. Top level fields whose JSON type
/// does not match the schema of `T` are dropped and reported as violations. Meant to be used
/// through [`super::validated::Validated`].
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> PartialFromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned + JsonSchema + Debug + Send,
    S: Send + Sync + ErrorVerbosityProvider,
{
    #[tracing::instrument(name = "json_extractor", skip_all)]
    async fn from_request_partial(
        req: Request,
        state: &S,
    ) -> Result<(Self, Vec<Violation>), ApiError> {
        let verbosity = state.error_verbosity();

        let mut value = match AxumJson::<Value>::from_request(req, state).await {
            Ok(AxumJson(value)) => value,
            Err(json_rejection) => {
                tracing::warn!(rejection=?json_rejection, "Rejection");

                return Err(BadRequestError::from_rejection(
                    verbosity,
                    json_rejection.body_text(),
                    expected_schema::<T>,
                )
                .into());
            }
        };

        let violations = take_mistyped_fields::<T>(&mut value);

        match serde_json::from_value::<T>(value) {
            Ok(json) => {
                tracing::trace!(?json, ?violations, "Extracted");

                Ok((ApiJson(json), violations))
            }
            Err(err) => {
                tracing::warn!(%err, "Rejection");

                Err(BadRequestError::from_rejection(
                    verbosity,
                    format!("Failed to deserialize the JSON body into the target type: {err}"),
                    expected_schema::<T>,
                )
                .into())
            }
        }
    }
}

impl<T> Extractor for ApiJson<T> {
    type Extracted = T;

    fn extracted(&self) -> &Self::Extracted {
        &self.0
    }
}

/// Removes the top level fields of `value` whose type is not accepted by the schema of `T`.
fn take_mistyped_fields<T: JsonSchema>(value: &mut Value) -> Vec<Violation> {
    let Value::Object(object) = value else {
        return Vec::new();
    };

    let root = schema_for!(T);
    let Some(validation) = root.schema.object.as_ref() else {
        return Vec::new();
    };
    let properties = &validation.properties;

    let mistyped = object
        .iter()
        .filter_map(|(field, value)| {
            let Some(Schema::Object(schema)) = properties.get(field) else {
                return None;
            };

            let accepted = match schema.instance_type.as_ref()? {
                SingleOrVec::Single(instance_type) => std::slice::from_ref(&**instance_type),
                SingleOrVec::Vec(instance_types) => instance_types.as_slice(),
            };

            let format = schema.format.as_deref();
            if accepted
                .iter()
                .any(|instance_type| has_type(value, instance_type, format))
            {
                return None;
            }

            Some(Violation::field(field.as_str(), expected_type(accepted)))
        })
        .collect::<Vec<_>>();

    for violation in &mistyped {
        if let Some(field) = &violation.field {
            object.remove(field);
        }
    }

    mistyped
}

fn has_type(value: &Value, instance_type: &InstanceType, format: Option<&str>) -> bool {
    match instance_type {
        InstanceType::Null => value.is_null(),
        InstanceType::Boolean => value.is_boolean(),
        InstanceType::Object => value.is_object(),
        InstanceType::Array => value.is_array(),
        InstanceType::Number => value.is_number(),
        InstanceType::String => value.is_string(),
        InstanceType::Integer => match format {
            Some("int32") => value
                .as_i64()
                .is_some_and(|integer| i32::try_from(integer).is_ok()),
            _ => value.is_i64() || value.is_u64(),
        },
    }
}

fn expected_type(accepted: &[InstanceType]) -> &'static str {
    let instance_type = accepted
        .iter()
        .find(|instance_type| **instance_type != InstanceType::Null);

    match instance_type {
        Some(InstanceType::Boolean) => "must be a boolean",
        Some(InstanceType::Object) => "must be an object",
        Some(InstanceType::Array) => "must be an array",
        Some(InstanceType::Number) => "must be a number",
        Some(InstanceType::String) => "must be a string",
        Some(InstanceType::Integer) => "must be an integer",
        Some(InstanceType::Null) | None => "must be null",
    }
}
