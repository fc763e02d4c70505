//! FileHeader parsing for HWP 5.0 documents.

use crate::error::{Error, Result};

/// HWP 5.0 file header signature.
const HWP_SIGNATURE: &[u8] = b"HWP Document File";

/// Length of the NUL-padded signature field.
const SIGNATURE_SIZE: usize = 32;

/// FileHeader size is always 256 bytes.
const FILE_HEADER_SIZE: usize = 256;

/// Property flags bit positions.
pub mod flags {
    /// Document is compressed
    pub const COMPRESSED: u32 = 1 << 0;
    /// Document is password protected
    pub const PASSWORD: u32 = 1 << 1;
    /// Document is a distribution document
    pub const DISTRIBUTABLE: u32 = 1 << 2;
    /// Script present
    pub const SCRIPT: u32 = 1 << 3;
    /// DRM protected
    pub const DRM: u32 = 1 << 4;
    /// XML template storage
    pub const XML_TEMPLATE: u32 = 1 << 5;
    /// Document history present
    pub const HISTORY: u32 = 1 << 6;
    /// Digital signature present
    pub const SIGNATURE: u32 = 1 << 7;
    /// Public key encryption
    pub const PUBLIC_KEY_ENCRYPT: u32 = 1 << 8;
    /// Reserved space to store digital signature
    pub const SIGNATURE_RESERVED: u32 = 1 << 9;
    /// Certificate DRM
    pub const CERTIFICATE_DRM: u32 = 1 << 10;
    /// CCL document
    pub const CCL: u32 = 1 << 11;
    /// Mobile optimized
    pub const MOBILE: u32 = 1 << 12;
    /// Privacy protection
    pub const PRIVACY: u32 = 1 << 13;
    /// Change tracking enabled
    pub const TRACK_CHANGES: u32 = 1 << 14;
    /// KOGL copyright
    pub const KOGL: u32 = 1 << 15;
    /// Video control present
    pub const VIDEO_CONTROL: u32 = 1 << 16;
    /// Order field control present
    pub const ORDER_FIELD: u32 = 1 << 17;
}

/// HWP 5.0 FileHeader structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Raw 32-byte signature field
    pub signature: [u8; SIGNATURE_SIZE],
    /// Document version (major.minor.build.revision)
    pub version: Version,
    /// Property flags
    pub properties: u32,
    /// License flags (CCL / copy and print restrictions)
    pub license_flags: u32,
    /// Encryption version used for password protected documents
    pub encrypt_version: u32,
}

impl FileHeader {
    /// Parses a FileHeader from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < FILE_HEADER_SIZE {
            return Err(Error::InvalidData(format!(
                "FileHeader too small: {} bytes, expected {}",
                data.len(),
                FILE_HEADER_SIZE
            )));
        }

        // Verify signature (first 32 bytes, null-padded)
        if !data[..HWP_SIGNATURE.len()].eq(HWP_SIGNATURE) {
            return Err(Error::InvalidData("Invalid HWP signature".into()));
        }
        let mut signature = [0u8; SIGNATURE_SIZE];
        signature.copy_from_slice(&data[..SIGNATURE_SIZE]);

        // Version at offset 0x20 (32), 4 bytes little-endian
        // Format: [revision, build, minor, major]
        let version = Version {
            major: data[35],
            minor: data[34],
            build: data[33],
            revision: data[32],
        };
        if version.major != 5 {
            return Err(Error::UnsupportedFormat(format!("HWP version {}", version)));
        }

        let read_u32 = |at: usize| u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);

        Ok(Self {
            signature,
            version,
            // Properties at offset 0x24 (36)
            properties: read_u32(36),
            // License at 0x28 (40), encryption version at 0x2C (44)
            license_flags: read_u32(40),
            encrypt_version: read_u32(44),
        })
    }

    /// Returns the version as a string (e.g., "5.1.0.1").
    pub fn version_string(&self) -> String {
        self.version.to_string()
    }

    /// Returns true if the document is compressed.
    pub fn is_compressed(&self) -> bool {
        self.properties & flags::COMPRESSED != 0
    }

    /// Returns true if the document is password protected.
    pub fn is_encrypted(&self) -> bool {
        self.properties & flags::PASSWORD != 0
    }

    /// Returns true if the document is a distribution document.
    pub fn is_distribution(&self) -> bool {
        self.properties & flags::DISTRIBUTABLE != 0
    }

    /// Returns true if the document has DRM protection.
    pub fn is_drm_protected(&self) -> bool {
        self.properties & flags::DRM != 0
    }

    /// Returns true if scripts are present.
    pub fn has_scripts(&self) -> bool {
        self.properties & flags::SCRIPT != 0
    }

    /// Returns true if change tracking is enabled.
    pub fn has_track_changes(&self) -> bool {
        self.properties & flags::TRACK_CHANGES != 0
    }

    /// Storage holding the body sections: `ViewText` for distribution
    /// documents, `BodyText` otherwise.
    pub fn body_storage(&self) -> &'static str {
        if self.is_distribution() {
            "ViewText"
        } else {
            "BodyText"
        }
    }
}

/// HWP document version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub build: u8,
    pub revision: u8,
}

impl Version {
    /// Creates a new version.
    pub const fn new(major: u8, minor: u8, build: u8, revision: u8) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Returns true if this version is at least the specified version.
    pub fn at_least(&self, major: u8, minor: u8, build: u8, revision: u8) -> bool {
        *self >= Version::new(major, minor, build, revision)
    }
}

impl Default for Version {
    /// The newest 5.x layout known to this crate.
    fn default() -> Self {
        Version::new(5, 1, 1, 0)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}
