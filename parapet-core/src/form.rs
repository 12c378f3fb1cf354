//! URL-encoded form body parsing

use crate::Error;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Parse URL-encoded form data into a typed value
pub fn parse_form<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    serde_urlencoded::from_bytes(body)
        .map_err(|e| Error::BadRequest(format!("Failed to parse form data: {}", e)))
}

/// Parse URL-encoded form data into a HashMap
pub fn parse_form_map(body: &[u8]) -> Result<HashMap<String, String>, Error> {
    let form_data: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|e| Error::BadRequest(format!("Failed to parse form data: {}", e)))?;

    Ok(form_data.into_iter().collect())
}
