use serde::{Deserialize, Serialize};

/// Precision tier of a local model artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quantization {
    /// OpenVINO IR compressed to 4-bit weights.
    Int4,
    /// OpenVINO IR compressed to 8-bit weights.
    Int8,
    /// OpenVINO IR at half precision.
    Fp16,
    /// Uncompressed OpenVINO IR.
    Fp32,
    /// GGUF 4-bit, k-quant medium.
    Q4KM,
    /// GGUF 8-bit.
    Q8_0,
    /// GGUF file without a quantization tag in its name.
    Untagged,
}

impl Quantization {
    /// Get the file-name tag for this quantization level.
    pub fn suffix(&self) -> &'static str {
        match self {
            Quantization::Int4 => "int4",
            Quantization::Int8 => "int8",
            Quantization::Fp16 => "fp16",
            Quantization::Fp32 => "fp32",
            Quantization::Q4KM => "q4_k_m",
            Quantization::Q8_0 => "q8_0",
            Quantization::Untagged => "",
        }
    }

    /// Concrete file name for a base model name at this tier.
    pub fn artifact_name(&self, base: &str) -> String {
        match self {
            Quantization::Int4 | Quantization::Int8 | Quantization::Fp16 => {
                format!("{}_{}.xml", base, self.suffix())
            }
            Quantization::Fp32 => format!("{}.xml", base),
            Quantization::Q4KM | Quantization::Q8_0 => format!("{}.{}.gguf", base, self.suffix()),
            Quantization::Untagged => format!("{}.gguf", base),
        }
    }
}

impl std::fmt::Display for Quantization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quantization::Untagged => write!(f, "untagged"),
            other => write!(f, "{}", other.suffix()),
        }
    }
}

/// Kind of artifact a backend loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelFamily {
    /// OpenVINO intermediate representation (`.xml` + `.bin`).
    OpenvinoIr,
    /// Quantized GGUF file for CPU engines.
    Gguf,
    /// Model identifier of a remote service; nothing to resolve on disk.
    Remote,
}

impl ModelFamily {
    /// Candidate tiers, best first.
    pub fn preference(&self) -> &'static [Quantization] {
        match self {
            ModelFamily::OpenvinoIr => &[
                Quantization::Int4,
                Quantization::Int8,
                Quantization::Fp16,
                Quantization::Fp32,
            ],
            ModelFamily::Gguf => &[
                Quantization::Q4KM,
                Quantization::Q8_0,
                Quantization::Untagged,
            ],
            ModelFamily::Remote => &[],
        }
    }
}

/// Whether a GGUF file name carries a 4-bit marker.
pub fn has_4bit_marker(file_name: &str) -> bool {
    file_name.to_lowercase().contains("q4")
}
