use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;

use crate::error::OcrGateError;

/// `axum::Json` whose rejections become validation errors.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(OcrGateError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for OcrGateError {
    fn from(rejection: JsonRejection) -> Self {
        map_json_rejection(rejection)
    }
}

fn map_json_rejection(rejection: JsonRejection) -> OcrGateError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let message = err.body_text();
            if let Some(field) = extract_missing_field(&message) {
                OcrGateError::Validation(format!("Missing required field: {field}"))
            } else {
                OcrGateError::Validation(format!("Invalid JSON: {message}"))
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            OcrGateError::Validation(format!("JSON syntax error: {}", err.body_text()))
        }
        JsonRejection::MissingJsonContentType(_) => OcrGateError::Validation(
            "Missing `Content-Type: application/json` header".to_string(),
        ),
        JsonRejection::BytesRejection(err) => {
            OcrGateError::Validation(format!("Failed to read request body: {}", err.body_text()))
        }
        _ => OcrGateError::Validation(rejection.body_text()),
    }
}

fn extract_missing_field(message: &str) -> Option<&str> {
    let prefix = "missing field `";
    let start = message.find(prefix)? + prefix.len();
    let remaining = message.get(start..)?;
    let end = remaining.find('`')?;
    remaining.get(..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_missing_field() {
        let message =
            "Failed to deserialize the JSON body into the target type: missing field `image` at line 1 column 2";
        assert_eq!(extract_missing_field(message), Some("image"));
        assert_eq!(extract_missing_field("expected value"), None);
    }
}
