pub mod address_detector;
pub mod chain_normalizer;
pub mod string_utils;

pub use address_detector::{detect, eip55_checksum_ok};
pub use string_utils::short_address;
