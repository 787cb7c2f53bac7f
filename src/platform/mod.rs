// ABOUTME: Container platform detection for OrbStack, Colima, Docker Desktop,
// ABOUTME: Podman and native Linux Docker. Read-only socket probing.

mod detect;
mod types;

pub use detect::{DetectError, Detector, PLATFORM_ENV, colima_profile};
pub use types::{Platform, PlatformKind};
