use validator::ValidateEmail;

use crate::app_error::{AppError, AppResult};

const MAX_DEVICE_ID_LEN: usize = 128;
const MAX_PRODUCT_ID_LEN: usize = 100;
const MAX_PURCHASE_TOKEN_LEN: usize = 4096;

/// Validates that the input looks like a valid email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// Device identifiers are opaque, but bounded and free of whitespace and
/// control characters.
pub fn is_valid_device_id(device_id: &str) -> bool {
    !device_id.is_empty()
        && device_id.len() <= MAX_DEVICE_ID_LEN
        && !device_id
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
}

/// Store product identifiers.
/// Rules:
/// - 1-100 characters
/// - Only lowercase ASCII letters, digits, dots and underscores
/// - Must start with a letter or digit
pub fn is_valid_product_id(product_id: &str) -> bool {
    if product_id.is_empty() || product_id.len() > MAX_PRODUCT_ID_LEN {
        return false;
    }

    let Some(first) = product_id.chars().next() else {
        return false;
    };
    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        return false;
    }

    product_id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '_')
}

/// Purchase tokens are opaque printable ASCII without whitespace.
pub fn is_valid_purchase_token(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_PURCHASE_TOKEN_LEN
        && token.chars().all(|c| c.is_ascii_graphic())
}

/// Trims and validates a required device id.
pub fn require_device_id(raw: Option<&str>) -> AppResult<String> {
    let device_id = raw.map(str::trim).unwrap_or_default();
    if device_id.is_empty() {
        return Err(AppError::InvalidInput("deviceId is required".into()));
    }
    if !is_valid_device_id(device_id) {
        return Err(AppError::InvalidInput("deviceId is malformed".into()));
    }
    Ok(device_id.to_string())
}

/// Trims the required purchase fields; only absence is an argument error.
/// Anything else about the product id is decided by the allow-list.
pub fn require_purchase_fields(
    product_id: Option<&str>,
    purchase_token: Option<&str>,
) -> AppResult<(String, String)> {
    let product_id = product_id.map(str::trim).unwrap_or_default();
    let purchase_token = purchase_token.map(str::trim).unwrap_or_default();

    if product_id.is_empty() || purchase_token.is_empty() {
        return Err(AppError::InvalidInput(
            "productId and purchaseToken are required".into(),
        ));
    }
    Ok((product_id.to_string(), purchase_token.to_string()))
}

/// Trims an optional package name; blank counts as absent.
pub fn optional_package_name(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
