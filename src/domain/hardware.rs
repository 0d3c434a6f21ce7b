use serde::{Deserialize, Serialize};

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuArch {
    /// x86-64 (AMD64/Intel 64).
    X86_64,
    /// ARM64 (AArch64, Apple Silicon).
    Arm64,
    /// Unknown or unsupported architecture.
    Unknown,
}

impl CpuArch {
    /// Detect the current CPU architecture.
    pub fn detect() -> Self {
        match std::env::consts::ARCH {
            "x86_64" => CpuArch::X86_64,
            "aarch64" => CpuArch::Arm64,
            _ => CpuArch::Unknown,
        }
    }
}

impl std::fmt::Display for CpuArch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CpuArch::X86_64 => write!(f, "x86_64"),
            CpuArch::Arm64 => write!(f, "arm64"),
            CpuArch::Unknown => write!(f, "unknown"),
        }
    }
}

/// SIMD capabilities of the CPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimdCapabilities {
    /// x86: AVX support.
    pub avx: bool,
    /// x86: AVX2 support.
    pub avx2: bool,
    /// x86: AVX-512 support.
    pub avx512: bool,
    /// ARM: NEON support.
    pub neon: bool,
}

impl SimdCapabilities {
    /// Detect SIMD capabilities for the current CPU.
    #[cfg(target_arch = "x86_64")]
    pub fn detect() -> Self {
        Self {
            avx: std::arch::is_x86_feature_detected!("avx"),
            avx2: std::arch::is_x86_feature_detected!("avx2"),
            avx512: std::arch::is_x86_feature_detected!("avx512f"),
            neon: false,
        }
    }

    /// Detect SIMD capabilities for the current CPU.
    #[cfg(target_arch = "aarch64")]
    pub fn detect() -> Self {
        // NEON is mandatory on AArch64
        Self {
            avx: false,
            avx2: false,
            avx512: false,
            neon: true,
        }
    }

    /// Detect SIMD capabilities for the current CPU.
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    pub fn detect() -> Self {
        Self::default()
    }

    /// Whether this CPU has wide vector units (AVX2 or NEON).
    ///
    /// CPUs without them run the legacy code paths.
    pub fn has_wide_vectors(&self) -> bool {
        self.avx2 || self.neon
    }
}

/// One entry of the probe's priority list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceTier {
    /// NVIDIA GPU reachable through CUDA.
    Cuda,
    /// GPU device enumerated by the OpenVINO runtime.
    OpenvinoGpu,
    /// NPU device enumerated by the OpenVINO runtime.
    OpenvinoNpu,
    /// OpenVINO CPU plugin, present whenever the runtime loads.
    OpenvinoCpu,
    /// CPU with wide vector units (AVX2 or NEON).
    CpuAvx2,
    /// CPU without wide vector units.
    CpuLegacy,
}

impl DeviceTier {
    /// Stable identifier used in config files and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceTier::Cuda => "cuda",
            DeviceTier::OpenvinoGpu => "openvino_gpu",
            DeviceTier::OpenvinoNpu => "openvino_npu",
            DeviceTier::OpenvinoCpu => "openvino_cpu",
            DeviceTier::CpuAvx2 => "cpu_avx2",
            DeviceTier::CpuLegacy => "cpu_legacy",
        }
    }
}

impl std::fmt::Display for DeviceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw results of the individual host queries.
///
/// A query that failed is reported as absent; the probe never aborts on one.
#[derive(Debug, Clone, Default)]
pub struct ProbeReadings {
    /// A CUDA device could be opened.
    pub cuda: bool,
    /// OpenVINO device names, or `None` when the runtime could not be loaded.
    /// An empty list means the runtime loaded but enumeration yielded nothing.
    pub openvino_devices: Option<Vec<String>>,
    /// CPU vector extensions.
    pub simd: SimdCapabilities,
}

/// Hardware profile of the system.
///
/// Built once by the probe and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareProfile {
    priority: Vec<DeviceTier>,
    wide_vectors: bool,
    openvino_available: bool,
    arch: CpuArch,
    threads: u32,
}

impl HardwareProfile {
    /// Assemble a profile from probe readings.
    ///
    /// Order: CUDA, OpenVINO GPU, OpenVINO NPU, OpenVINO CPU, then exactly one
    /// of `cpu_avx2` / `cpu_legacy`.
    pub fn from_readings(readings: &ProbeReadings) -> Self {
        let mut priority = Vec::with_capacity(5);

        if readings.cuda {
            priority.push(DeviceTier::Cuda);
        }

        if let Some(devices) = &readings.openvino_devices {
            let has = |kind: &str| devices.iter().any(|d| d.to_uppercase().contains(kind));
            if has("GPU") {
                priority.push(DeviceTier::OpenvinoGpu);
            }
            if has("NPU") {
                priority.push(DeviceTier::OpenvinoNpu);
            }
            priority.push(DeviceTier::OpenvinoCpu);
        }

        let wide_vectors = readings.simd.has_wide_vectors();
        priority.push(if wide_vectors {
            DeviceTier::CpuAvx2
        } else {
            DeviceTier::CpuLegacy
        });

        Self {
            priority,
            wide_vectors,
            openvino_available: readings.openvino_devices.is_some(),
            arch: CpuArch::detect(),
            threads: std::thread::available_parallelism()
                .map(|p| p.get() as u32)
                .unwrap_or(1),
        }
    }

    /// Build a profile from an explicit tier list.
    ///
    /// Duplicates are dropped, keeping the first occurrence. Useful when the
    /// tiers come from somewhere other than a live probe (tests, overrides).
    pub fn with_priority(tiers: impl IntoIterator<Item = DeviceTier>) -> Self {
        let mut priority: Vec<DeviceTier> = Vec::new();
        for tier in tiers {
            if !priority.contains(&tier) {
                priority.push(tier);
            }
        }

        let wide_vectors = priority.contains(&DeviceTier::CpuAvx2);
        let openvino_available = priority.iter().any(|t| {
            matches!(
                t,
                DeviceTier::OpenvinoGpu | DeviceTier::OpenvinoNpu | DeviceTier::OpenvinoCpu
            )
        });

        Self {
            priority,
            wide_vectors,
            openvino_available,
            arch: CpuArch::detect(),
            threads: 1,
        }
    }

    /// Tiers in detection order.
    pub fn priority(&self) -> &[DeviceTier] {
        &self.priority
    }

    pub fn contains(&self, tier: DeviceTier) -> bool {
        self.priority.contains(&tier)
    }

    /// AVX2 (or NEON) support.
    pub fn wide_vectors(&self) -> bool {
        self.wide_vectors
    }

    /// Whether the OpenVINO runtime could be loaded at all.
    pub fn openvino_available(&self) -> bool {
        self.openvino_available
    }

    pub fn arch(&self) -> CpuArch {
        self.arch
    }

    /// Number of logical threads.
    pub fn threads(&self) -> u32 {
        self.threads
    }

    /// Get recommended thread count for inference.
    /// Uses threads - 1 to leave one core for the system, minimum 1.
    pub fn recommended_threads(&self) -> u32 {
        std::cmp::max(1, self.threads.saturating_sub(1))
    }

    /// OpenVINO device name for the providers: GPU, then NPU, then CPU.
    pub fn openvino_device(&self) -> &'static str {
        if self.contains(DeviceTier::OpenvinoGpu) {
            "GPU"
        } else if self.contains(DeviceTier::OpenvinoNpu) {
            "NPU"
        } else {
            "CPU"
        }
    }
}
