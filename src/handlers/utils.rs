use axum::{extract::rejection::JsonRejection, Json};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::validation::{translator::substitute, Translator};

/// Unwrap a JSON body that must be an object
pub fn json_object(body: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, ApiError> {
    match body {
        Ok(Json(Value::Object(map))) => Ok(map),
        Ok(Json(_)) => Err(ApiError::invalid_json("Request body must be a JSON object")),
        Err(rejection) => Err(ApiError::invalid_json(rejection.body_text())),
    }
}

/// A translated line with `:name` placeholders filled in; a missing key is a server error
pub fn line(translator: &dyn Translator, key: &str, replacements: &[(&str, String)]) -> Result<String, ApiError> {
    let template = translator.require(key)?;
    Ok(substitute(template, replacements))
}
