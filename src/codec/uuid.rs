//! UUID codec
//!
//! The store tags UUIDs as binary subtype 4 with a 16-byte payload. Scripts
//! see them as 36-character dashed hex strings.

use crate::document::{Binary, UUID_SUBTYPE};
use crate::error::{Error, Result};
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

/// Either fully dashed 8-4-4-4-12 or 32 bare hex digits
static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}|[0-9a-fA-F]{32})$",
    )
    .expect("UUID pattern is a valid regex")
});

/// Generate a random UUID from the OS entropy source
pub fn generate_uuid() -> Result<Binary> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::RandomSource(e.to_string()))?;

    Ok(Binary::uuid(bytes.to_vec()))
}

/// Parse a dashed or undashed hex string into a binary UUID
pub fn convert_string_to_uuid(input: &str) -> Result<Binary> {
    if !UUID_PATTERN.is_match(input) {
        return Err(Error::Format(format!("invalid UUID format: {}", input)));
    }

    let clean: String = input.chars().filter(|c| *c != '-').collect();

    let id = Uuid::try_parse(&clean).map_err(|e| Error::Decode(e.to_string()))?;
    Ok(Binary::uuid(id.as_bytes().to_vec()))
}

/// Render a binary UUID as lower-case 8-4-4-4-12 hex
pub fn convert_uuid_to_string(binary: &Binary) -> Result<String> {
    Ok(uuid_from_binary(binary)?.hyphenated().to_string())
}

/// Validate subtype and length, then view the payload as a `Uuid`
pub fn uuid_from_binary(binary: &Binary) -> Result<Uuid> {
    if binary.subtype != UUID_SUBTYPE {
        return Err(Error::UnsupportedSubtype(binary.subtype));
    }
    Uuid::from_slice(&binary.bytes).map_err(|_| Error::InvalidLength(binary.bytes.len()))
}
