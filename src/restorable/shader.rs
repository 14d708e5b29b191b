use std::collections::BTreeMap;
use std::sync::Arc;

use crate::foundation::core::{ImageId, ShaderId};
use crate::foundation::error::{RestoreError, RestoreResult};
use crate::graphics::program::{CompiledProgram, UniformKind};

/// Registered compiled program. Cheap to clone; carries no mutable state.
#[derive(Clone, Debug)]
pub struct Shader {
    id: ShaderId,
    program: Arc<CompiledProgram>,
}

impl Shader {
    pub(crate) fn new(id: ShaderId, program: CompiledProgram) -> Self {
        Self {
            id,
            program: Arc::new(program),
        }
    }

    /// Registry handle.
    pub fn id(&self) -> ShaderId {
        self.id
    }

    /// The compiled program and its slot schema.
    pub fn program(&self) -> &CompiledProgram {
        &self.program
    }
}

/// Value supplied for one uniform slot at draw time.
#[derive(Clone, Debug, PartialEq)]
pub enum UniformValue {
    /// Literal floats.
    Floats(Vec<f32>),
    /// An image; becomes a dependency of the draw.
    Image(ImageId),
}

impl From<Vec<f32>> for UniformValue {
    fn from(v: Vec<f32>) -> Self {
        Self::Floats(v)
    }
}

impl From<ImageId> for UniformValue {
    fn from(id: ImageId) -> Self {
        Self::Image(id)
    }
}

/// Uniform values keyed by slot index.
pub type Uniforms = BTreeMap<usize, UniformValue>;

/// Check `uniforms` against the program's slot schema.
pub(crate) fn check_uniforms(program: &CompiledProgram, uniforms: &Uniforms) -> RestoreResult<()> {
    let schema = program.uniforms();
    if let Some((&slot, _)) = uniforms.range(schema.len()..).next() {
        return Err(RestoreError::uniform(format!(
            "{}: slot {slot} is not declared (schema has {} slots)",
            program.label(),
            schema.len()
        )));
    }
    for (slot, kind) in schema.iter().enumerate() {
        match (kind, uniforms.get(&slot)) {
            (_, None) => {
                return Err(RestoreError::uniform(format!(
                    "{}: slot {slot} ({kind:?}) has no value",
                    program.label()
                )));
            }
            (UniformKind::Floats(n), Some(UniformValue::Floats(v))) if v.len() == *n => {}
            (UniformKind::Image, Some(UniformValue::Image(_))) => {}
            (kind, Some(value)) => {
                return Err(RestoreError::uniform(format!(
                    "{}: slot {slot} expects {kind:?}, got {value:?}",
                    program.label()
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/restorable/shader.rs"]
mod tests;
