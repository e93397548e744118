use serde::{Deserialize, Serialize};

/// Where the image comes from: the device camera or the media library.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CaptureSource {
    Camera,
    Library,
}

/// The only media kind the upload contract accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaKind {
    Photo,
}

/// Constraints handed to the acquirer: still photos, normalized to the
/// classifier's input box, encoded at full quality.
#[derive(Debug, Clone)]
pub struct CaptureConstraints {
    pub media: MediaKind,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        CaptureConstraints {
            media: MediaKind::Photo,
            width: 256,
            height: 256,
            quality: 100,
        }
    }
}

/// A picked or captured image, normalized across host platforms.
/// Consumed exactly once by the prediction client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcquiredImage {
    pub uri: String,
    pub name: String,
    pub mime_type: String,
}

/// Single-resolution outcome of one acquirer invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionResult {
    Cancelled,
    Failed(String),
    Acquired(AcquiredImage),
}

/// Recomputed on every capture attempt; never cached by the core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PermissionDecision {
    Granted,
    Denied,
}
