use std::sync::Arc;

use crate::foundation::core::TextureId;

/// Expected value kind of one uniform slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniformKind {
    /// A vector of exactly this many floats.
    Floats(usize),
    /// An image, sampled by the program and tracked as a draw dependency.
    Image,
}

/// Uniform value as handed to the backend for one submission.
#[derive(Clone, Debug, PartialEq)]
pub enum BoundUniform {
    /// Literal floats.
    Floats(Vec<f32>),
    /// Live texture of an image-valued uniform.
    Texture(TextureId),
}

/// Texel access available to a [`FragmentKernel`] during one draw.
pub trait TexelSource {
    /// Sample the texture bound at uniform `slot`. Transparent if the slot holds no texture.
    fn sample_uniform(&self, slot: usize, texcoord: [f32; 2]) -> [f32; 4];

    /// Sample the `index`-th direct source of the draw. Transparent if there is none.
    fn sample_source(&self, index: usize, texcoord: [f32; 2]) -> [f32; 4];
}

/// Inputs of a single fragment invocation.
pub struct Fragment<'a> {
    /// Pixel center in target space.
    pub position: [f32; 2],
    /// Interpolated source texel position.
    pub texcoord: [f32; 2],
    /// Interpolated vertex color scale.
    pub color: [f32; 4],
    uniforms: &'a [BoundUniform],
    texels: &'a dyn TexelSource,
}

impl<'a> Fragment<'a> {
    pub(crate) fn new(
        position: [f32; 2],
        texcoord: [f32; 2],
        color: [f32; 4],
        uniforms: &'a [BoundUniform],
        texels: &'a dyn TexelSource,
    ) -> Self {
        Self {
            position,
            texcoord,
            color,
            uniforms,
            texels,
        }
    }

    /// Float uniform at `slot`; empty when the slot is absent or image-valued.
    pub fn floats(&self, slot: usize) -> &[f32] {
        match self.uniforms.get(slot) {
            Some(BoundUniform::Floats(v)) => v,
            _ => &[],
        }
    }

    /// Sample the image uniform at `slot`.
    pub fn sample_uniform(&self, slot: usize, texcoord: [f32; 2]) -> [f32; 4] {
        self.texels.sample_uniform(slot, texcoord)
    }

    /// Sample the `index`-th direct source.
    pub fn sample_source(&self, index: usize, texcoord: [f32; 2]) -> [f32; 4] {
        self.texels.sample_source(index, texcoord)
    }
}

/// Executable body of a compiled program. Returns premultiplied RGBA in `[0, 1]`.
pub trait FragmentKernel: Send + Sync {
    /// Shade one fragment.
    fn shade(&self, frag: &Fragment<'_>) -> [f32; 4];
}

impl<F> FragmentKernel for F
where
    F: Fn(&Fragment<'_>) -> [f32; 4] + Send + Sync,
{
    fn shade(&self, frag: &Fragment<'_>) -> [f32; 4] {
        self(frag)
    }
}

/// Opaque compiled program plus its uniform slot schema.
///
/// Shader source compilation happens elsewhere; this crate only consumes the result.
#[derive(Clone)]
pub struct CompiledProgram {
    label: String,
    uniforms: Vec<UniformKind>,
    kernel: Arc<dyn FragmentKernel>,
}

impl std::fmt::Debug for CompiledProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledProgram")
            .field("label", &self.label)
            .field("uniforms", &self.uniforms)
            .finish_non_exhaustive()
    }
}

impl CompiledProgram {
    /// Wrap a kernel with its uniform schema.
    pub fn new(
        label: impl Into<String>,
        uniforms: Vec<UniformKind>,
        kernel: impl FragmentKernel + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            uniforms,
            kernel: Arc::new(kernel),
        }
    }

    /// Wrap a closure kernel with its uniform schema.
    pub fn from_fn<F>(label: impl Into<String>, uniforms: Vec<UniformKind>, f: F) -> Self
    where
        F: Fn(&Fragment<'_>) -> [f32; 4] + Send + Sync + 'static,
    {
        Self::new(label, uniforms, f)
    }

    /// Human-readable name, used in logs and errors.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Uniform slot schema, indexed by slot.
    pub fn uniforms(&self) -> &[UniformKind] {
        &self.uniforms
    }

    /// Kernel executed per fragment.
    pub fn kernel(&self) -> &dyn FragmentKernel {
        self.kernel.as_ref()
    }
}

/// Stock programs, handy for diagnostics and tests.
pub mod programs {
    use super::{CompiledProgram, UniformKind};
    use crate::foundation::core::Rgba8Premul;
    use crate::foundation::math::unorm_from_u8;

    /// Fill every covered pixel with `color`.
    ///
    /// Slot 0 holds the target size as two floats.
    pub fn fill(color: Rgba8Premul) -> CompiledProgram {
        let out = color.to_array().map(unorm_from_u8);
        CompiledProgram::from_fn(
            format!("fill({},{},{},{})", color.r, color.g, color.b, color.a),
            vec![UniformKind::Floats(2)],
            move |_| out,
        )
    }

    /// Sum of `count` image uniforms sampled at the fragment's texcoord.
    ///
    /// Slot 0 holds the target size as two floats; slots `1..=count` hold images.
    pub fn sum_images(count: usize) -> CompiledProgram {
        let mut uniforms = vec![UniformKind::Floats(2)];
        uniforms.extend(std::iter::repeat_n(UniformKind::Image, count));
        CompiledProgram::from_fn(
            format!("sum_images({count})"),
            uniforms,
            move |frag| {
                let mut acc = [0.0f32; 4];
                for slot in 1..=count {
                    let s = frag.sample_uniform(slot, frag.texcoord);
                    for (a, c) in acc.iter_mut().zip(s) {
                        *a += c;
                    }
                }
                acc.map(|c| c.clamp(0.0, 1.0))
            },
        )
    }
}
