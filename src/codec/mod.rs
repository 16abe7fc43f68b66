//! Value codecs for types scripts cannot express natively
//!
//! - `uuid`: binary subtype-4 UUIDs <-> dashed hex strings
//! - `date`: current instant and RFC3339 parsing into BSON datetimes

pub mod date;
pub mod uuid;

pub use self::date::{convert_string_to_iso_date, generate_iso_date};
pub use self::uuid::{convert_string_to_uuid, convert_uuid_to_string, generate_uuid};
