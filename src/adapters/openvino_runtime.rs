//! Thin helpers over the OpenVINO runtime shared by its providers.

use std::path::{Path, PathBuf};

use openvino::{CompiledModel, Core, DeviceType, ElementType, InferRequest, Shape, Tensor};
use tracing::{debug, info};

use crate::domain::DomainError;

pub(crate) fn ov_err(context: &str) -> impl Fn(openvino::InferenceError) -> DomainError + '_ {
    move |e| DomainError::Inference(format!("{}: {}", context, e))
}

/// Load the runtime library. Failure means the backend is unusable here.
pub(crate) fn load_core() -> Result<Core, DomainError> {
    Core::new().map_err(|e| DomainError::DependencyMissing {
        backend: "openvino".to_string(),
        reason: e.to_string(),
    })
}

/// `.bin` weights sitting next to an IR `.xml`.
pub(crate) fn weights_path(xml: &Path) -> PathBuf {
    xml.with_extension("bin")
}

/// A compiled IR model plus one reusable inference request.
pub(crate) struct IrModel {
    request: InferRequest,
    inputs: Vec<String>,
    _compiled: CompiledModel,
}

impl IrModel {
    /// Read `xml` (+ `.bin`) and compile it for `device` ("GPU", "NPU", "CPU").
    pub(crate) fn compile(core: &mut Core, xml: &Path, device: &str) -> Result<Self, DomainError> {
        let bin = weights_path(xml);
        if !xml.is_file() || !bin.is_file() {
            return Err(DomainError::ModelNotFound(format!(
                "{} (with {})",
                xml.display(),
                bin.display()
            )));
        }

        let model = core
            .read_model_from_file(&xml.to_string_lossy(), &bin.to_string_lossy())
            .map_err(|e| DomainError::ModelLoad(format!("Failed to read IR: {}", e)))?;

        let count = model
            .get_inputs_len()
            .map_err(|e| DomainError::ModelLoad(format!("Failed to inspect IR inputs: {}", e)))?;
        let mut inputs = Vec::with_capacity(count);
        for index in 0..count {
            let name = model
                .get_input_by_index(index)
                .and_then(|node| node.get_name())
                .map_err(|e| DomainError::ModelLoad(format!("Failed to inspect IR inputs: {}", e)))?;
            inputs.push(name);
        }

        let mut compiled = core
            .compile_model(&model, DeviceType::from(device))
            .map_err(|e| DomainError::ModelLoad(format!("Failed to compile for {}: {}", device, e)))?;
        let request = compiled
            .create_infer_request()
            .map_err(|e| DomainError::ModelLoad(format!("Failed to create request: {}", e)))?;

        info!(path = ?xml, device, inputs = ?inputs, "IR model compiled");

        Ok(Self {
            request,
            inputs,
            _compiled: compiled,
        })
    }

    pub(crate) fn has_input(&self, name: &str) -> bool {
        self.inputs.iter().any(|i| i == name)
    }

    pub(crate) fn set(&mut self, name: &str, tensor: &Tensor) -> Result<(), DomainError> {
        self.request
            .set_tensor(name, tensor)
            .map_err(ov_err("Failed to set input"))
    }

    pub(crate) fn infer(&mut self) -> Result<(), DomainError> {
        debug!("Running IR inference");
        self.request.infer().map_err(ov_err("Inference failed"))
    }

    pub(crate) fn output(&self, name: &str) -> Result<Tensor, DomainError> {
        self.request
            .get_tensor(name)
            .map_err(ov_err("Failed to read output"))
    }
}

/// Build an i64 tensor of the given shape.
pub(crate) fn i64_tensor(dims: &[i64], data: &[i64]) -> Result<Tensor, DomainError> {
    let shape = Shape::new(dims).map_err(ov_err("Bad tensor shape"))?;
    let mut tensor = Tensor::new(ElementType::I64, &shape).map_err(ov_err("Failed to allocate tensor"))?;
    tensor
        .get_data_mut::<i64>()
        .map_err(ov_err("Failed to fill tensor"))?
        .copy_from_slice(data);
    Ok(tensor)
}

/// Build an f32 tensor of the given shape.
pub(crate) fn f32_tensor(dims: &[i64], data: &[f32]) -> Result<Tensor, DomainError> {
    let shape = Shape::new(dims).map_err(ov_err("Bad tensor shape"))?;
    let mut tensor = Tensor::new(ElementType::F32, &shape).map_err(ov_err("Failed to allocate tensor"))?;
    tensor
        .get_data_mut::<f32>()
        .map_err(ov_err("Failed to fill tensor"))?
        .copy_from_slice(data);
    Ok(tensor)
}

/// Logits of the last sequence position from a `[1, seq, vocab]` output.
pub(crate) fn last_logits(tensor: &Tensor) -> Result<Vec<f32>, DomainError> {
    let shape = tensor.get_shape().map_err(ov_err("Failed to read output shape"))?;
    let dims = shape.get_dimensions();
    let vocab = match dims.last() {
        Some(&v) if v > 0 => v as usize,
        _ => {
            return Err(DomainError::Inference(format!(
                "Unexpected logits shape {:?}",
                dims
            )))
        }
    };

    let data = tensor.get_data::<f32>().map_err(ov_err("Failed to read logits"))?;
    if data.len() < vocab {
        return Err(DomainError::Inference("Empty logits".to_string()));
    }
    Ok(data[data.len() - vocab..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_path() {
        assert_eq!(
            weights_path(Path::new("/m/chat_int4.xml")),
            PathBuf::from("/m/chat_int4.bin")
        );
    }
}
