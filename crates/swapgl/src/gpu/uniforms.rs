use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A typed uniform value. The array length is fixed by the variant, so a
/// value can never disagree with its declared GLSL type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Uniform {
    /// Uploaded as a float (`1.0` / `0.0`).
    #[serde(rename = "boolean")]
    Bool(bool),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Column-major, never transposed.
    Mat2([f32; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

impl Uniform {
    pub fn type_name(&self) -> &'static str {
        match self {
            Uniform::Bool(_) => "boolean",
            Uniform::Float(_) => "float",
            Uniform::Vec2(_) => "vec2",
            Uniform::Vec3(_) => "vec3",
            Uniform::Vec4(_) => "vec4",
            Uniform::Mat2(_) => "mat2",
            Uniform::Mat3(_) => "mat3",
            Uniform::Mat4(_) => "mat4",
        }
    }

    /// Flattened float payload in upload order.
    pub fn as_floats(&self) -> Vec<f32> {
        match self {
            Uniform::Bool(value) => vec![if *value { 1.0 } else { 0.0 }],
            Uniform::Float(value) => vec![*value],
            Uniform::Vec2(value) => value.to_vec(),
            Uniform::Vec3(value) => value.to_vec(),
            Uniform::Vec4(value) => value.to_vec(),
            Uniform::Mat2(value) => value.to_vec(),
            Uniform::Mat3(value) => value.to_vec(),
            Uniform::Mat4(value) => value.to_vec(),
        }
    }
}

impl From<bool> for Uniform {
    fn from(value: bool) -> Self {
        Uniform::Bool(value)
    }
}

impl From<f32> for Uniform {
    fn from(value: f32) -> Self {
        Uniform::Float(value)
    }
}

impl From<[f32; 2]> for Uniform {
    fn from(value: [f32; 2]) -> Self {
        Uniform::Vec2(value)
    }
}

impl From<[f32; 3]> for Uniform {
    fn from(value: [f32; 3]) -> Self {
        Uniform::Vec3(value)
    }
}

impl From<[f32; 4]> for Uniform {
    fn from(value: [f32; 4]) -> Self {
        Uniform::Vec4(value)
    }
}

impl From<[f32; 9]> for Uniform {
    fn from(value: [f32; 9]) -> Self {
        Uniform::Mat3(value)
    }
}

impl From<[f32; 16]> for Uniform {
    fn from(value: [f32; 16]) -> Self {
        Uniform::Mat4(value)
    }
}

/// Per-call inputs of one offscreen pass: named textures, named uniforms,
/// and whether the previous frame is bound implicitly as `uTexture`.
///
/// Names are unique by construction; supplying a name twice keeps the last
/// value. Nothing here outlives the `update` call it is passed to.
#[derive(Debug, Clone)]
pub struct PassInputs<T> {
    textures: BTreeMap<String, T>,
    uniforms: BTreeMap<String, Uniform>,
    include_previous: bool,
}

impl<T> Default for PassInputs<T> {
    fn default() -> Self {
        Self {
            textures: BTreeMap::new(),
            uniforms: BTreeMap::new(),
            include_previous: true,
        }
    }
}

impl<T: Copy> PassInputs<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `texture` to the sampler uniform `name`.
    pub fn texture(mut self, name: impl Into<String>, texture: T) -> Self {
        self.textures.insert(name.into(), texture);
        self
    }

    pub fn uniform(mut self, name: impl Into<String>, value: impl Into<Uniform>) -> Self {
        self.uniforms.insert(name.into(), value.into());
        self
    }

    /// Controls the implicit `uTexture` binding of the read buffer.
    pub fn include_previous(mut self, include: bool) -> Self {
        self.include_previous = include;
        self
    }

    pub fn insert_texture(&mut self, name: impl Into<String>, texture: T) {
        self.textures.insert(name.into(), texture);
    }

    pub fn insert_uniform(&mut self, name: impl Into<String>, value: impl Into<Uniform>) {
        self.uniforms.insert(name.into(), value.into());
    }

    pub fn textures(&self) -> impl Iterator<Item = (&str, T)> + '_ {
        self.textures
            .iter()
            .map(|(name, texture)| (name.as_str(), *texture))
    }

    pub fn uniforms(&self) -> impl Iterator<Item = (&str, &Uniform)> + '_ {
        self.uniforms.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn includes_previous(&self) -> bool {
        self.include_previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_descriptor_round_trips_through_json() {
        let value: Uniform =
            serde_json::from_str(r#"{"type":"vec3","value":[1.0,2.0,3.0]}"#).expect("vec3");
        assert_eq!(value, Uniform::Vec3([1.0, 2.0, 3.0]));

        let flag: Uniform = serde_json::from_str(r#"{"type":"boolean","value":true}"#)
            .expect("boolean");
        assert_eq!(flag, Uniform::Bool(true));
        assert_eq!(flag.as_floats(), vec![1.0]);
    }

    #[test]
    fn mismatched_arity_is_rejected_when_parsing() {
        let parsed: Result<Uniform, _> =
            serde_json::from_str(r#"{"type":"vec2","value":[1.0,2.0,3.0]}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn pass_inputs_keep_last_value_per_name() {
        let inputs = PassInputs::new()
            .texture("uVelocity", 1_u32)
            .texture("uVelocity", 7_u32)
            .uniform("uTime", 0.5_f32)
            .include_previous(false);
        let textures: Vec<_> = inputs.textures().collect();
        assert_eq!(textures, vec![("uVelocity", 7)]);
        assert_eq!(inputs.uniforms().count(), 1);
        assert!(!inputs.includes_previous());
    }

    #[test]
    fn type_names_follow_glsl() {
        assert_eq!(Uniform::Mat4([0.0; 16]).type_name(), "mat4");
        assert_eq!(Uniform::from([0.0_f32; 2]).type_name(), "vec2");
    }
}
