//! Host capability checks.

use async_trait::async_trait;

/// Answers whether Apple's on-device model can be used on this machine.
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    async fn check_apple_intelligence_available(&self) -> bool;
}

/// Probe based on the compile target: Apple Intelligence only ships on
/// Apple-silicon macOS.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformProbe;

#[async_trait]
impl CapabilityProbe for PlatformProbe {
    async fn check_apple_intelligence_available(&self) -> bool {
        let available = cfg!(all(target_os = "macos", target_arch = "aarch64"));
        tracing::debug!(available, "Apple Intelligence availability checked");
        available
    }
}
