use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{GpgpuError, Result};
use crate::gpu::context::GraphicsContext;
use crate::gpu::uniforms::Uniform;

/// Vertex attribute every hosted program must consume.
pub const POSITION_ATTRIBUTE: &str = "position";

/// A linked vertex + fragment program with cached uniform lookups and a
/// stable texture unit per sampler name.
pub struct ShaderProgram<C: GraphicsContext> {
    context: Rc<C>,
    program: C::Program,
    position: u32,
    locations: HashMap<String, Option<C::UniformLocation>>,
    texture_units: HashMap<String, u32>,
}

impl<C: GraphicsContext> ShaderProgram<C> {
    pub fn new(context: Rc<C>, vertex: &str, fragment: &str) -> Result<Self> {
        let program = context.compile_program(vertex, fragment)?;
        let Some(position) = context.attrib_location(program, POSITION_ATTRIBUTE) else {
            context.delete_program(program);
            return Err(GpgpuError::MissingAttribute(POSITION_ATTRIBUTE));
        };

        Ok(Self {
            context,
            program,
            position,
            locations: HashMap::new(),
            texture_units: HashMap::new(),
        })
    }

    /// Makes this the program used by subsequent draws and uniform uploads.
    pub fn bind(&self) -> &Self {
        self.context.use_program(Some(self.program));
        self
    }

    pub fn handle(&self) -> C::Program {
        self.program
    }

    pub fn position_location(&self) -> u32 {
        self.position
    }

    /// Resolves `name`, remembering misses so undeclared names are reported
    /// once rather than every frame.
    pub fn uniform_location(&mut self, name: &str) -> Option<C::UniformLocation> {
        if let Some(cached) = self.locations.get(name) {
            return cached.clone();
        }
        let location = self.context.uniform_location(self.program, name);
        if location.is_none() {
            tracing::warn!(
                uniform = name,
                program = ?self.program,
                "uniform is not declared by the program; ignoring it"
            );
        }
        self.locations.insert(name.to_string(), location.clone());
        location
    }

    /// Uploads `value` into the uniform `name`. The program must be bound.
    pub fn set_uniform(&mut self, name: &str, value: &Uniform) {
        if let Some(location) = self.uniform_location(name) {
            self.context.set_uniform(&location, value);
        }
    }

    /// Binds `texture` to its unit and points the sampler `name` at it. The
    /// program must be bound.
    pub fn set_uniform_texture(&mut self, texture: C::Texture, name: &str) -> Result<()> {
        let Some(location) = self.uniform_location(name) else {
            return Ok(());
        };

        let next = self.texture_units.len() as u32;
        let unit = *self.texture_units.entry(name.to_string()).or_insert(next);
        let max = self.context.capabilities().max_texture_units;
        if unit >= max {
            self.texture_units.remove(name);
            return Err(GpgpuError::TextureUnitsExhausted {
                name: name.to_string(),
                unit,
                max,
            });
        }

        self.context.bind_texture_unit(unit, texture);
        self.context.set_sampler(&location, unit);
        Ok(())
    }

    pub fn texture_unit(&self, name: &str) -> Option<u32> {
        self.texture_units.get(name).copied()
    }
}

impl<C: GraphicsContext> Drop for ShaderProgram<C> {
    fn drop(&mut self) {
        self.context.delete_program(self.program);
    }
}

impl<C: GraphicsContext> std::fmt::Debug for ShaderProgram<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("program", &self.program)
            .field("texture_units", &self.texture_units)
            .finish()
    }
}

/// Named programs plus the key of the one `update` draws with.
pub struct ProgramRegistry<C: GraphicsContext> {
    programs: HashMap<String, ShaderProgram<C>>,
    current: Option<String>,
}

impl<C: GraphicsContext> Default for ProgramRegistry<C> {
    fn default() -> Self {
        Self {
            programs: HashMap::new(),
            current: None,
        }
    }
}

impl<C: GraphicsContext> ProgramRegistry<C> {
    /// Registers `program` under `name`, replacing (and releasing) any
    /// program already stored there. The current selection is unchanged.
    pub fn insert(&mut self, name: impl Into<String>, program: ShaderProgram<C>) {
        let name = name.into();
        if self.programs.insert(name.clone(), program).is_some() {
            tracing::debug!(program = %name, "replaced registered program");
        }
    }

    /// Switches the current program. Unknown names are reported and leave
    /// the selection as it was.
    pub fn activate(&mut self, name: &str) -> bool {
        if !self.programs.contains_key(name) {
            tracing::warn!(
                program = name,
                current = ?self.current,
                "no program registered under this name; keeping the current one"
            );
            return false;
        }
        self.current = Some(name.to_string());
        true
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_mut(&mut self) -> Option<&mut ShaderProgram<C>> {
        let name = self.current.as_deref()?;
        self.programs.get_mut(name)
    }

    pub fn get(&self, name: &str) -> Option<&ShaderProgram<C>> {
        self.programs.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ShaderProgram<C>> {
        self.programs.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.programs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::vertex_shader;
    use crate::gpu::headless::{Command, HeadlessContext, TextureId};
    use crate::types::{GlslDialect, UvOrientation};

    const FRAGMENT: &str = r"precision mediump float;
uniform sampler2D uTexture;
uniform sampler2D uVelocity;
uniform float uTime;
varying vec2 vUv;
void main() { gl_FragColor = texture2D(uTexture, vUv) + texture2D(uVelocity, vUv) * uTime; }
";

    fn program(context: &Rc<HeadlessContext>) -> ShaderProgram<HeadlessContext> {
        let vertex = vertex_shader(GlslDialect::Gles100, UvOrientation::BottomUp);
        ShaderProgram::new(Rc::clone(context), &vertex, FRAGMENT).expect("program")
    }

    #[test]
    fn samplers_get_stable_units_in_first_use_order() {
        let context = Rc::new(HeadlessContext::new());
        let mut program = program(&context);
        program.bind();
        program
            .set_uniform_texture(TextureId(10), "uVelocity")
            .expect("velocity");
        program
            .set_uniform_texture(TextureId(11), "uTexture")
            .expect("texture");
        program
            .set_uniform_texture(TextureId(12), "uVelocity")
            .expect("velocity again");
        assert_eq!(program.texture_unit("uVelocity"), Some(0));
        assert_eq!(program.texture_unit("uTexture"), Some(1));
        assert!(context.commands().contains(&Command::BindTexture {
            unit: 0,
            texture: TextureId(12)
        }));
    }

    #[test]
    fn undeclared_uniforms_are_skipped() {
        let context = Rc::new(HeadlessContext::new());
        let mut program = program(&context);
        program.bind();
        context.take_commands();
        program.set_uniform("uMissing", &Uniform::Float(1.0));
        program
            .set_uniform_texture(TextureId(3), "uMissingTexture")
            .expect("missing sampler is not an error");
        assert!(context.take_commands().is_empty());
        assert_eq!(program.texture_unit("uMissingTexture"), None);
    }

    #[test]
    fn running_out_of_texture_units_is_an_error() {
        let context = Rc::new(HeadlessContext::with_capabilities(
            crate::gpu::Capabilities {
                max_texture_units: 1,
                ..Default::default()
            },
        ));
        let mut program = program(&context);
        program.bind();
        program
            .set_uniform_texture(TextureId(1), "uTexture")
            .expect("first unit");
        let err = program
            .set_uniform_texture(TextureId(2), "uVelocity")
            .unwrap_err();
        assert!(matches!(
            err,
            GpgpuError::TextureUnitsExhausted { unit: 1, max: 1, .. }
        ));
    }

    #[test]
    fn programs_without_position_attribute_are_rejected() {
        let context = Rc::new(HeadlessContext::new());
        let result = ShaderProgram::new(
            Rc::clone(&context),
            "void main() { gl_Position = vec4(0.0); }",
            FRAGMENT,
        );
        assert!(matches!(
            result,
            Err(GpgpuError::MissingAttribute("position"))
        ));
        assert_eq!(context.live_programs(), 0);
    }

    #[test]
    fn registry_keeps_current_on_unknown_name() {
        let context = Rc::new(HeadlessContext::new());
        let mut registry = ProgramRegistry::default();
        registry.insert("main", program(&context));
        registry.insert("alt", program(&context));
        assert!(registry.activate("main"));
        assert!(!registry.activate("nonexistent"));
        assert_eq!(registry.current_name(), Some("main"));
        assert_eq!(registry.names(), vec!["alt", "main"]);
    }

    #[test]
    fn replacing_a_program_releases_the_old_one() {
        let context = Rc::new(HeadlessContext::new());
        let mut registry = ProgramRegistry::default();
        registry.insert("main", program(&context));
        registry.insert("main", program(&context));
        assert_eq!(registry.len(), 1);
        assert_eq!(context.live_programs(), 1);
    }
}
