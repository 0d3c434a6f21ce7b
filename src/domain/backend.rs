use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::hardware::{DeviceTier, HardwareProfile};
use super::model::ModelFamily;

/// Preference value that asks the selector to decide.
pub const AUTO: &str = "auto";

/// Headline inference backend for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// CUDA accelerator.
    Cuda,
    /// OpenVINO runtime with IR models.
    Openvino,
    /// CPU without wide vector units, GGUF models.
    CpuLegacy,
    /// Generic CPU, GGUF models.
    Cpu,
    /// OpenAI cloud API.
    Openai,
}

impl Backend {
    /// Stable identifier, as accepted by the factories.
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Cuda => "cuda",
            Backend::Openvino => "openvino",
            Backend::CpuLegacy => "cpu_legacy",
            Backend::Cpu => "cpu",
            Backend::Openai => "openai",
        }
    }

    /// Reduce a profile to one backend.
    ///
    /// Precedence is fixed: CUDA, OpenVINO GPU, legacy CPU, generic CPU. The
    /// NPU, OpenVINO CPU and AVX2 tiers never win on their own.
    pub fn select(profile: &HardwareProfile) -> Backend {
        if profile.contains(DeviceTier::Cuda) {
            Backend::Cuda
        } else if profile.contains(DeviceTier::OpenvinoGpu) {
            Backend::Openvino
        } else if profile.contains(DeviceTier::CpuLegacy) {
            Backend::CpuLegacy
        } else {
            Backend::Cpu
        }
    }

    /// Artifact family the resolver should search for.
    pub fn model_family(&self) -> ModelFamily {
        match self {
            Backend::Openvino => ModelFamily::OpenvinoIr,
            Backend::CpuLegacy | Backend::Cpu => ModelFamily::Gguf,
            Backend::Cuda | Backend::Openai => ModelFamily::Remote,
        }
    }

    /// Backend used for text generation when this one is active.
    ///
    /// CUDA hosts talk to the cloud model; every CPU flavour runs GGUF.
    pub fn for_text_generation(&self) -> Backend {
        match self {
            Backend::Cuda | Backend::Openai => Backend::Openai,
            Backend::Openvino => Backend::Openvino,
            Backend::CpuLegacy | Backend::Cpu => Backend::CpuLegacy,
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = DomainError;

    /// Parse a backend identifier. Device tier names map to the backend that
    /// serves them.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cuda" => Ok(Backend::Cuda),
            "openvino" | "openvino_gpu" | "openvino_npu" | "openvino_cpu" => Ok(Backend::Openvino),
            "cpu_legacy" => Ok(Backend::CpuLegacy),
            "cpu" | "cpu_avx2" => Ok(Backend::Cpu),
            "openai" => Ok(Backend::Openai),
            other => Err(DomainError::Config(format!("Unknown backend: {}", other))),
        }
    }
}

/// Identifier of the active backend for this process.
///
/// `"auto"` runs the selector; anything else is used verbatim (trimmed and
/// lowercased), so an unknown override reaches the factories unchanged.
pub fn active_backend(preference: &str, profile: &HardwareProfile) -> String {
    let preference = preference.trim().to_lowercase();
    if preference.is_empty() || preference == AUTO {
        Backend::select(profile).as_str().to_string()
    } else {
        preference
    }
}

/// Text-generation backend for an active identifier.
///
/// Identifiers that do not parse fall back to the GGUF path.
pub fn text_generation_backend(active: &str) -> Backend {
    active
        .parse::<Backend>()
        .map(|b| b.for_text_generation())
        .unwrap_or(Backend::CpuLegacy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(tiers: &[DeviceTier]) -> HardwareProfile {
        HardwareProfile::with_priority(tiers.iter().copied())
    }

    #[test]
    fn test_select_precedence() {
        let cases: &[(&[DeviceTier], Backend)] = &[
            (&[DeviceTier::CpuLegacy, DeviceTier::Cuda], Backend::Cuda),
            (
                &[DeviceTier::OpenvinoGpu, DeviceTier::OpenvinoCpu, DeviceTier::CpuLegacy],
                Backend::Openvino,
            ),
            (&[DeviceTier::OpenvinoCpu, DeviceTier::CpuLegacy], Backend::CpuLegacy),
            (&[DeviceTier::OpenvinoNpu, DeviceTier::OpenvinoCpu, DeviceTier::CpuAvx2], Backend::Cpu),
            (&[DeviceTier::CpuAvx2], Backend::Cpu),
            (&[DeviceTier::CpuLegacy], Backend::CpuLegacy),
        ];

        for (tiers, expected) in cases {
            assert_eq!(Backend::select(&profile(tiers)), *expected, "tiers: {:?}", tiers);
        }
    }

    #[test]
    fn test_select_ignores_detection_order() {
        let a = profile(&[DeviceTier::CpuLegacy, DeviceTier::OpenvinoGpu]);
        let b = profile(&[DeviceTier::OpenvinoGpu, DeviceTier::CpuLegacy]);
        assert_eq!(Backend::select(&a), Backend::select(&b));
    }

    #[test]
    fn test_select_empty_profile_defaults_to_cpu() {
        assert_eq!(Backend::select(&profile(&[])), Backend::Cpu);
    }

    #[test]
    fn test_parse_identifiers() {
        assert_eq!("cuda".parse::<Backend>().unwrap(), Backend::Cuda);
        assert_eq!(" OpenVINO ".parse::<Backend>().unwrap(), Backend::Openvino);
        assert_eq!("openvino_npu".parse::<Backend>().unwrap(), Backend::Openvino);
        assert_eq!("cpu_avx2".parse::<Backend>().unwrap(), Backend::Cpu);
        assert!("tpu".parse::<Backend>().is_err());

        for backend in [
            Backend::Cuda,
            Backend::Openvino,
            Backend::CpuLegacy,
            Backend::Cpu,
            Backend::Openai,
        ] {
            assert_eq!(backend.as_str().parse::<Backend>().unwrap(), backend);
        }
    }

    #[test]
    fn test_active_backend_override_short_circuits() {
        let p = profile(&[DeviceTier::Cuda]);
        assert_eq!(active_backend("auto", &p), "cuda");
        assert_eq!(active_backend("", &p), "cuda");
        assert_eq!(active_backend("CPU_LEGACY", &p), "cpu_legacy");
        assert_eq!(active_backend("whisper_cpp", &p), "whisper_cpp");
    }

    #[test]
    fn test_text_generation_routing() {
        assert_eq!(text_generation_backend("cuda"), Backend::Openai);
        assert_eq!(text_generation_backend("openai"), Backend::Openai);
        assert_eq!(text_generation_backend("openvino"), Backend::Openvino);
        assert_eq!(text_generation_backend("cpu"), Backend::CpuLegacy);
        assert_eq!(text_generation_backend("cpu_legacy"), Backend::CpuLegacy);
        assert_eq!(text_generation_backend("something"), Backend::CpuLegacy);
    }

    #[test]
    fn test_model_family() {
        assert_eq!(Backend::Openvino.model_family(), ModelFamily::OpenvinoIr);
        assert_eq!(Backend::CpuLegacy.model_family(), ModelFamily::Gguf);
        assert_eq!(Backend::Cpu.model_family(), ModelFamily::Gguf);
        assert_eq!(Backend::Cuda.model_family(), ModelFamily::Remote);
        assert_eq!(Backend::Openai.model_family(), ModelFamily::Remote);
    }
}
