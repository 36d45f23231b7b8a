use devis_core::{StoreError, ValidationErrors};
use serde::de::DeserializeOwned;

/// Maps a non-2xx status and its body onto the store taxonomy.
pub(crate) fn error_from_status(
    status: u16,
    body: String,
) -> StoreError {
    match status {
        404 => StoreError::NotFound,
        400 => match ValidationErrors::from_json_body(&body) {
            Some(errors) => StoreError::Validation(errors),
            None => StoreError::Server { status, body },
        },
        _ => StoreError::Server { status, body },
    }
}

pub(crate) fn from_reqwest(err: reqwest::Error) -> StoreError {
    if err.is_decode() {
        StoreError::Decode(err.to_string())
    } else {
        StoreError::Connection(err.to_string())
    }
}

/// Returns the response unchanged on success, or the mapped error carrying
/// the status and body text.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        tracing::warn!(status = status.as_u16(), %body, "proposal API returned an error");
        return Err(error_from_status(status.as_u16(), body));
    }
    Ok(response)
}

/// Parses a successful JSON body into the expected type.
pub(crate) async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, StoreError> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await.map_err(from_reqwest)?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))
}

/// Asserts a success status, discarding the body.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<(), StoreError> {
    ensure_success(response).await?;
    Ok(())
}
