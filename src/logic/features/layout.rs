//! Feature layout contract.
//!
//! A normalization profile fit against one layout must never be applied to
//! vectors from another. The layout hash makes that mismatch detectable on
//! persisted artifacts; in-process column-count mismatches are programming
//! errors and panic.

/// Feature layout version
pub const FEATURE_VERSION: u8 = 1;

/// Number of features per encoded log record
pub const FEATURE_COUNT: usize = 3;

/// Feature names in encoding order
pub const FEATURE_LAYOUT: [&str; FEATURE_COUNT] = ["level", "source", "message_length"];

/// CRC32 hash of the layout (version + ordered names)
pub fn layout_hash() -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&[FEATURE_VERSION]);
    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(b"|");
    }
    hasher.finalize()
}

pub fn feature_name(index: usize) -> Option<&'static str> {
    FEATURE_LAYOUT.get(index).copied()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

impl std::fmt::Display for LayoutMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Feature Layout Mismatch: Expected v{} ({:x}), Got v{} ({:x})",
            self.expected_version, self.expected_hash, self.actual_version, self.actual_hash
        )
    }
}

impl std::error::Error for LayoutMismatchError {}

pub fn validate_layout(version: u8, hash: u32) -> Result<(), LayoutMismatchError> {
    if version == FEATURE_VERSION && hash == layout_hash() {
        Ok(())
    } else {
        Err(LayoutMismatchError {
            expected_version: FEATURE_VERSION,
            expected_hash: layout_hash(),
            actual_version: version,
            actual_hash: hash,
        })
    }
}
