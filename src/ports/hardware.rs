use crate::domain::HardwareProfile;

/// Port for hardware detection operations.
///
/// Implementations inspect the host and report which device tiers are usable.
/// Detection never fails: a query that errors is left out of the profile.
pub trait HardwareDetector: Send + Sync {
    /// Probe the host and build a fresh profile.
    fn detect(&self) -> HardwareProfile;
}
