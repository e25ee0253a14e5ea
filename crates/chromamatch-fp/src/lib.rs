//! Chromamatch fingerprint file formats

pub mod format;
pub mod json_format;
pub mod reader;
pub mod writer;

pub use format::{FingerprintFormat, FormatError, LoadedFingerprint, FINGERPRINT_EXTENSIONS, FORMAT_VERSION};
pub use json_format::{FpJsonFile, FpJsonMetadata};
pub use reader::{read_fingerprint, FpReader};
pub use writer::FpWriter;
