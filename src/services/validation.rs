//! Input rules shared by signup, child creation and the task/prize forms.

use crate::error::ApiError;

pub const USERNAME_MAX_LEN: usize = 64;
pub const PASSWORD_MIN_LEN: usize = 8;
/// Largest task or prize value. Leaves room for many completed tasks before
/// a child's points total could overflow.
pub const VALUE_MAX: i64 = i32::MAX as i64;
const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Trims and checks a username. Returns the trimmed form.
pub fn username(raw: Option<&str>) -> Result<String, ApiError> {
    let name = raw.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if name.chars().count() > USERNAME_MAX_LEN {
        return Err(ApiError::validation(format!(
            "Username must be at most {USERNAME_MAX_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

pub fn password(raw: Option<&str>) -> Result<String, ApiError> {
    let pw = raw.unwrap_or_default();
    if pw.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }
    if pw.chars().count() < PASSWORD_MIN_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {PASSWORD_MIN_LEN} characters"
        )));
    }
    if !pw.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ApiError::validation("Password must contain an uppercase letter"));
    }
    if !pw.chars().any(|c| c.is_ascii_digit()) {
        return Err(ApiError::validation("Password must contain a number"));
    }
    if !pw.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err(ApiError::validation("Password must contain a special character"));
    }
    Ok(pw.to_string())
}

/// Display name of a task or prize.
pub fn name(raw: Option<&str>) -> Result<String, ApiError> {
    match raw.map(str::trim) {
        Some(n) if !n.is_empty() => Ok(n.to_string()),
        _ => Err(ApiError::validation("Name is required")),
    }
}

pub fn value(raw: Option<i64>) -> Result<i64, ApiError> {
    match raw {
        None => Err(ApiError::validation("Value is required")),
        Some(v) if v <= 0 => Err(ApiError::validation("Value must be a positive number")),
        Some(v) if v > VALUE_MAX => Err(ApiError::validation(format!(
            "Value must be at most {VALUE_MAX}"
        ))),
        Some(v) => Ok(v),
    }
}

/// Required image: an http(s) URL or a base64 `data:image/...` URL.
pub fn image(raw: Option<&str>, field: &str) -> Result<String, ApiError> {
    let img = raw.map(str::trim).unwrap_or_default();
    if img.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    if !is_image_reference(img) {
        return Err(ApiError::validation(format!(
            "{field} must be an http(s) URL or a base64 image data URL"
        )));
    }
    Ok(img.to_string())
}

/// Like [`image`], but absence yields an empty string.
pub fn optional_image(raw: Option<&str>, field: &str) -> Result<String, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(String::new()),
        Some(img) => image(Some(img), field),
    }
}

fn is_image_reference(s: &str) -> bool {
    if s.starts_with("http://") || s.starts_with("https://") {
        return s.len() > s.find("://").map_or(0, |i| i + 3);
    }

    let Some(rest) = s.strip_prefix("data:") else {
        return false;
    };
    let Some((media_type, payload)) = rest.split_once(";base64,") else {
        return false;
    };
    if payload.is_empty() {
        return false;
    }
    match media_type.parse::<mime::Mime>() {
        Ok(m) => m.type_() == mime::IMAGE,
        Err(_) => false,
    }
}
