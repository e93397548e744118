use crate::models::capture_types::PermissionDecision;
use async_trait::async_trait;

/// Camera capability check, asked again on every capture attempt.
/// Implementations may put the host's native consent dialog in front of
/// the user. This never errors: a failure to query status is `Denied`.
#[async_trait]
pub trait CameraPermissions: Send + Sync {
    async fn check_camera_access(&self) -> PermissionDecision;
}

/// Desktop hosts expose camera and library access without dynamic
/// negotiation, so the decision is always `Granted`.
pub struct HostPermissions;

#[async_trait]
impl CameraPermissions for HostPermissions {
    async fn check_camera_access(&self) -> PermissionDecision {
        PermissionDecision::Granted
    }
}
