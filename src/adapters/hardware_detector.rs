use tracing::{debug, info, warn};

use crate::domain::{DomainError, HardwareProfile, ProbeReadings, SimdCapabilities};
use crate::ports::HardwareDetector;

/// Result of querying the OpenVINO runtime.
///
/// The outer error means the runtime could not be loaded; the inner one means
/// it loaded but device enumeration failed.
type OpenvinoQuery = Result<Result<Vec<String>, DomainError>, DomainError>;

/// Probe for the accelerators and CPU features of this host.
///
/// Every call runs the queries again; nothing is cached. A failing query is
/// logged and its tiers are left out of the profile.
#[derive(Debug, Default)]
pub struct SystemHardwareDetector;

impl SystemHardwareDetector {
    /// Create a new hardware detector.
    pub fn new() -> Self {
        Self
    }

    /// Query for a usable CUDA device.
    #[cfg(feature = "cuda")]
    fn query_cuda() -> Result<bool, DomainError> {
        match candle_core::Device::new_cuda(0) {
            Ok(_) => Ok(true),
            Err(e) => Err(DomainError::Hardware(format!("CUDA device 0: {}", e))),
        }
    }

    /// Query for a usable CUDA device.
    #[cfg(not(feature = "cuda"))]
    fn query_cuda() -> Result<bool, DomainError> {
        debug!("CUDA support not compiled in");
        Ok(false)
    }

    /// Load the OpenVINO runtime and list its devices.
    #[cfg(feature = "openvino")]
    fn query_openvino() -> OpenvinoQuery {
        let core = openvino::Core::new().map_err(|e| DomainError::DependencyMissing {
            backend: "openvino".to_string(),
            reason: e.to_string(),
        })?;

        Ok(core
            .available_devices()
            .map(|devices| devices.iter().map(|d| format!("{:?}", d)).collect())
            .map_err(|e| DomainError::Hardware(format!("OpenVINO device enumeration: {}", e))))
    }

    /// Load the OpenVINO runtime and list its devices.
    #[cfg(not(feature = "openvino"))]
    fn query_openvino() -> OpenvinoQuery {
        Err(DomainError::not_compiled("openvino", "openvino"))
    }

    /// Fold the raw query outcomes into readings, logging every failure.
    fn collect_readings(
        cuda: Result<bool, DomainError>,
        openvino: OpenvinoQuery,
        simd: SimdCapabilities,
    ) -> ProbeReadings {
        let cuda = cuda.unwrap_or_else(|e| {
            warn!(error = %e, "CUDA query failed, skipping tier");
            false
        });

        let openvino_devices = match openvino {
            Ok(Ok(devices)) => Some(devices),
            Ok(Err(e)) => {
                warn!(error = %e, "OpenVINO loaded but device enumeration failed");
                Some(Vec::new())
            }
            Err(e) => {
                debug!(error = %e, "OpenVINO runtime unavailable");
                None
            }
        };

        ProbeReadings {
            cuda,
            openvino_devices,
            simd,
        }
    }
}

impl HardwareDetector for SystemHardwareDetector {
    fn detect(&self) -> HardwareProfile {
        let readings = Self::collect_readings(
            Self::query_cuda(),
            Self::query_openvino(),
            SimdCapabilities::detect(),
        );
        let profile = HardwareProfile::from_readings(&readings);

        info!(
            arch = %profile.arch(),
            threads = profile.threads(),
            avx2 = readings.simd.avx2,
            neon = readings.simd.neon,
            tiers = ?profile.priority(),
            "Hardware profile detected"
        );

        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeviceTier;

    #[test]
    fn test_hardware_detection() {
        let detector = SystemHardwareDetector::new();
        let profile = detector.detect();

        assert!(profile.threads() >= 1);
        let last = profile.priority().last().copied();
        assert!(matches!(
            last,
            Some(DeviceTier::CpuAvx2) | Some(DeviceTier::CpuLegacy)
        ));
    }

    #[test]
    fn test_fresh_profile_each_call() {
        let detector = SystemHardwareDetector::new();

        let first = detector.detect();
        let second = detector.detect();

        assert_eq!(first.priority(), second.priority());
    }

    #[test]
    fn test_failing_queries_are_skipped() {
        let readings = SystemHardwareDetector::collect_readings(
            Err(DomainError::Hardware("driver crashed".into())),
            Err(DomainError::not_compiled("openvino", "openvino")),
            SimdCapabilities::default(),
        );
        let profile = HardwareProfile::from_readings(&readings);

        assert_eq!(profile.priority(), &[DeviceTier::CpuLegacy]);
    }

    #[test]
    fn test_enumeration_failure_keeps_openvino_cpu() {
        let readings = SystemHardwareDetector::collect_readings(
            Ok(false),
            Ok(Err(DomainError::Hardware("no devices".into()))),
            SimdCapabilities {
                avx2: true,
                ..Default::default()
            },
        );
        let profile = HardwareProfile::from_readings(&readings);

        assert_eq!(
            profile.priority(),
            &[DeviceTier::OpenvinoCpu, DeviceTier::CpuAvx2]
        );
    }

    #[test]
    fn test_device_debug_names_match() {
        let readings = SystemHardwareDetector::collect_readings(
            Ok(true),
            Ok(Ok(vec!["CPU".into(), "GPU".into()])),
            SimdCapabilities::default(),
        );
        let profile = HardwareProfile::from_readings(&readings);

        assert_eq!(
            profile.priority(),
            &[
                DeviceTier::Cuda,
                DeviceTier::OpenvinoGpu,
                DeviceTier::OpenvinoCpu,
                DeviceTier::CpuLegacy,
            ]
        );
    }
}
