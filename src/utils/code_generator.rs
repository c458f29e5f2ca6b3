//! Short code rendering and custom alias validation.
//!
//! Minted codes are the base-62 rendering (alphabet `0-9a-zA-Z`) of a
//! [`crate::utils::snowflake::SnowflakeId`], left-padded with `'0'` to
//! [`CODE_WIDTH`] characters. Every `u64` fits in 11 base-62 digits, so all
//! minted codes have exactly that width. Custom aliases are barred from that
//! shape, which keeps the two namespaces disjoint.

use crate::error::AppError;
use serde_json::json;

/// Width of every minted short code.
pub const CODE_WIDTH: usize = 11;

/// Bounds for user-provided aliases.
pub const ALIAS_MIN_LEN: usize = 3;
pub const ALIAS_MAX_LEN: usize = 32;

/// Reserved codes that cannot be used as short links.
///
/// These codes are reserved for system endpoints to prevent routing conflicts.
const RESERVED_CODES: &[&str] = &["api", "health", "admin", "static", "analytics"];

/// Errors produced when decoding a short code back into an integer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    #[error("code is empty")]
    Empty,

    #[error("invalid character {character:?} at position {index}")]
    InvalidCharacter { character: char, index: usize },

    #[error("code does not fit in 64 bits")]
    Overflow,
}

/// Encodes `value` as a base-62 short code of at least [`CODE_WIDTH`] characters.
///
/// # Examples
///
/// ```
/// use snowlink::utils::code_generator::encode_code;
///
/// assert_eq!(encode_code(0), "00000000000");
/// assert_eq!(encode_code(61), "0000000000Z");
/// ```
pub fn encode_code(value: u64) -> String {
    format!(
        "{:0>width$}",
        base62::encode_alternative(value),
        width = CODE_WIDTH
    )
}

/// Decodes a short code produced by [`encode_code`].
///
/// Leading `'0'` padding is accepted, so `decode_code(&encode_code(x)) == x`
/// for every `u64`.
///
/// # Errors
///
/// Returns [`CodeError`] for empty input, characters outside the alphabet,
/// or values larger than `u64::MAX`.
pub fn decode_code(code: &str) -> Result<u64, CodeError> {
    let value = base62::decode_alternative(code).map_err(|e| match e {
        base62::DecodeError::EmptyInput => CodeError::Empty,
        base62::DecodeError::InvalidBase62Byte(byte, index) => CodeError::InvalidCharacter {
            character: char::from(byte),
            index,
        },
        base62::DecodeError::ArithmeticOverflow => CodeError::Overflow,
    })?;

    u64::try_from(value).map_err(|_| CodeError::Overflow)
}

/// Returns true if `code` has the shape of a minted code.
pub fn is_minted_code_shape(code: &str) -> bool {
    code.len() == CODE_WIDTH && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Validates a user-provided custom alias.
///
/// # Rules
///
/// - Length: 3-32 characters
/// - Allowed characters: ASCII letters, digits, `-` and `_`
/// - Cannot start or end with `-` or `_`
/// - Cannot be a reserved system code
/// - Cannot have the minted-code shape (11 alphanumeric characters)
///
/// # Errors
///
/// Returns [`AppError::Validation`] if any validation rule is violated.
///
/// # Examples
///
/// ```ignore
/// assert!(validate_custom_alias("spring-sale").is_ok());
/// assert!(validate_custom_alias("ab").is_err());          // Too short
/// assert!(validate_custom_alias("-promo").is_err());      // Leading hyphen
/// assert!(validate_custom_alias("health").is_err());      // Reserved
/// assert!(validate_custom_alias("abcdefghijk").is_err()); // Minted-code shape
/// ```
pub fn validate_custom_alias(alias: &str) -> Result<(), AppError> {
    if alias.len() < ALIAS_MIN_LEN || alias.len() > ALIAS_MAX_LEN {
        return Err(AppError::bad_request(
            format!("Custom alias must be {ALIAS_MIN_LEN}-{ALIAS_MAX_LEN} characters"),
            json!({ "provided_length": alias.len() }),
        ));
    }

    if !alias
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(AppError::bad_request(
            "Custom alias can only contain letters, digits, hyphens, and underscores",
            json!({ "alias": alias }),
        ));
    }

    if alias.starts_with(['-', '_']) || alias.ends_with(['-', '_']) {
        return Err(AppError::bad_request(
            "Custom alias cannot start or end with a hyphen or underscore",
            json!({ "alias": alias }),
        ));
    }

    if RESERVED_CODES.contains(&alias.to_ascii_lowercase().as_str()) {
        return Err(AppError::bad_request(
            "This alias is reserved",
            json!({ "alias": alias }),
        ));
    }

    if is_minted_code_shape(alias) {
        return Err(AppError::bad_request(
            format!(
                "Custom alias cannot be exactly {CODE_WIDTH} letters and digits; add a hyphen or underscore"
            ),
            json!({ "alias": alias }),
        ));
    }

    Ok(())
}
