//! Scene files: a chain of GPGPU passes described as TOML.
//!
//! A scene names its passes, the order they run in each frame, and how their
//! outputs feed each other's samplers. Fragment sources are inline strings or
//! files resolved relative to the scene file.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use swapgl::{GlslDialect, RendererConfig, TextureFilter, Uniform, UvOrientation};

/// Uniform carrying elapsed scene time in seconds, set on every pass.
pub const TIME_UNIFORM: &str = "uTime";

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("failed to parse scene: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scene: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PassKind {
    /// Ping-pong pair; the previous frame is sampled as `uTexture`.
    #[default]
    Swap,
    /// One target, no feedback.
    Single,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneConfig {
    pub version: u32,
    #[serde(default = "default_frames")]
    pub frames: u32,
    #[serde(
        default = "default_frame_interval",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub frame_interval: Duration,
    #[serde(default)]
    pub order: Vec<String>,
    #[serde(default)]
    pub passes: BTreeMap<String, PassConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PassConfig {
    #[serde(default)]
    pub kind: PassKind,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_true")]
    pub float_textures: bool,
    #[serde(default)]
    pub filter: TextureFilter,
    #[serde(default)]
    pub uv_orientation: UvOrientation,
    #[serde(default)]
    pub dialect: GlslDialect,
    #[serde(default)]
    pub fragment: Option<String>,
    #[serde(default)]
    pub fragment_path: Option<PathBuf>,
    /// Registry name of the program built from `fragment`.
    #[serde(default)]
    pub program_name: Option<String>,
    /// Extra programs, activated through `schedule`.
    #[serde(default)]
    pub programs: BTreeMap<String, ShaderSource>,
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
    /// Sampler name -> pass whose current texture is bound to it.
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
    #[serde(default)]
    pub uniforms: BTreeMap<String, Uniform>,
    #[serde(default = "default_true")]
    pub include_previous: bool,
    /// RGBA value every texel of both targets starts with.
    #[serde(default)]
    pub initial_fill: Option<[f32; 4]>,
}

/// Fragment source given inline or as `{ path = "..." }`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ShaderSource {
    Inline(String),
    File { path: PathBuf },
}

/// Switches a pass to `program` at the start of `frame`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScheduleEntry {
    pub frame: u32,
    pub program: String,
}

fn default_frames() -> u32 {
    1
}

fn default_frame_interval() -> Duration {
    Duration::from_millis(16)
}

fn default_true() -> bool {
    true
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

impl SceneConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, SceneError> {
        let raw: SceneConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Parses the scene at `path` and inlines every shader file it refers to.
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let input = read(path)?;
        let mut scene = Self::from_toml_str(&input)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        scene.resolve_sources(base)?;
        tracing::debug!(
            path = %path.display(),
            passes = scene.passes.len(),
            frames = scene.frames,
            "loaded scene"
        );
        Ok(scene)
    }

    /// Replaces `fragment_path` and file-backed programs with their contents,
    /// reading relative paths from `base`.
    pub fn resolve_sources(&mut self, base: &Path) -> Result<(), SceneError> {
        for pass in self.passes.values_mut() {
            if let Some(path) = pass.fragment_path.take() {
                pass.fragment = Some(read(&base.join(path))?);
            }
            for source in pass.programs.values_mut() {
                if let ShaderSource::File { path } = source {
                    *source = ShaderSource::Inline(read(&base.join(path.as_path()))?);
                }
            }
        }
        Ok(())
    }

    pub fn pass(&self, name: &str) -> Option<&PassConfig> {
        self.passes.get(name)
    }

    /// Passes in execution order.
    pub fn ordered_passes(&self) -> impl Iterator<Item = (&str, &PassConfig)> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.passes.get(name).map(|pass| (name.as_str(), pass)))
    }

    /// Scene time at the start of `frame`, in seconds.
    pub fn frame_time(&self, frame: u32) -> f32 {
        self.frame_interval.as_secs_f32() * frame as f32
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        if self.version != 1 {
            return Err(SceneError::Invalid(format!(
                "unsupported scene version {}; expected 1",
                self.version
            )));
        }

        if self.passes.is_empty() {
            return Err(SceneError::Invalid(
                "scene must define at least one pass".into(),
            ));
        }

        if self.frames == 0 {
            return Err(SceneError::Invalid("frames must be at least 1".into()));
        }

        let mut seen = BTreeSet::new();
        for name in &self.order {
            if !self.passes.contains_key(name) {
                return Err(SceneError::Invalid(format!(
                    "order references unknown pass '{name}'"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(SceneError::Invalid(format!(
                    "pass '{name}' appears more than once in order"
                )));
            }
        }
        if let Some(missing) = self.passes.keys().find(|name| !seen.contains(name.as_str())) {
            return Err(SceneError::Invalid(format!(
                "pass '{missing}' is missing from order"
            )));
        }

        for (name, pass) in &self.passes {
            pass.validate(name, &self.passes)?;
        }

        Ok(())
    }
}

impl PassConfig {
    fn validate(
        &self,
        name: &str,
        passes: &BTreeMap<String, PassConfig>,
    ) -> Result<(), SceneError> {
        match (&self.fragment, &self.fragment_path) {
            (None, None) => {
                return Err(SceneError::Invalid(format!(
                    "pass '{name}' needs a fragment or fragment_path"
                )))
            }
            (Some(_), Some(_)) => {
                return Err(SceneError::Invalid(format!(
                    "pass '{name}' sets both fragment and fragment_path"
                )))
            }
            _ => {}
        }

        if self.width == Some(0) || self.height == Some(0) {
            return Err(SceneError::Invalid(format!(
                "pass '{name}' width and height must be greater than zero"
            )));
        }

        let initial = self.initial_program_name();
        if self.programs.contains_key(initial) {
            return Err(SceneError::Invalid(format!(
                "pass '{name}' program '{initial}' is defined twice"
            )));
        }

        for entry in &self.schedule {
            if entry.program != initial && !self.programs.contains_key(&entry.program) {
                return Err(SceneError::Invalid(format!(
                    "pass '{name}' schedules unknown program '{}' at frame {}",
                    entry.program, entry.frame
                )));
            }
        }

        for (sampler, source) in &self.inputs {
            if sampler.trim().is_empty() {
                return Err(SceneError::Invalid(format!(
                    "pass '{name}' has an input with an empty sampler name"
                )));
            }
            if source == name {
                return Err(SceneError::Invalid(format!(
                    "pass '{name}' cannot read its own output through '{sampler}'; use include_previous"
                )));
            }
            if !passes.contains_key(source) {
                return Err(SceneError::Invalid(format!(
                    "pass '{name}' input '{sampler}' references unknown pass '{source}'"
                )));
            }
        }

        Ok(())
    }

    pub fn initial_program_name(&self) -> &str {
        self.program_name
            .as_deref()
            .unwrap_or(swapgl::DEFAULT_PROGRAM_NAME)
    }

    /// Program the schedule switches to at `frame`, if any. The last entry
    /// wins when several name the same frame.
    pub fn scheduled_program(&self, frame: u32) -> Option<&str> {
        self.schedule
            .iter()
            .rev()
            .find(|entry| entry.frame == frame)
            .map(|entry| entry.program.as_str())
    }

    /// Inline sources of the extra programs. File-backed programs appear
    /// only after [`SceneConfig::resolve_sources`].
    pub fn program_sources(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.programs
            .iter()
            .filter_map(|(name, source)| match source {
                ShaderSource::Inline(code) => Some((name.as_str(), code.as_str())),
                ShaderSource::File { .. } => None,
            })
    }

    /// Builds the renderer configuration for this pass.
    pub fn renderer_config(&self) -> RendererConfig {
        let mut config = RendererConfig {
            fragment_shader: self.fragment.clone(),
            debug: self.debug,
            float_textures: self.float_textures,
            program_name: self.program_name.clone(),
            filter: self.filter,
            uv_orientation: self.uv_orientation,
            dialect: self.dialect,
            ..RendererConfig::default()
        };
        config.width = self.width.unwrap_or(config.width);
        config.height = self.height.unwrap_or(config.height);
        if let Some(fill) = self.initial_fill {
            let texels = config.width as usize * config.height as usize;
            config.initial_data = Some(fill.repeat(texels));
        }
        config
    }
}

fn read(path: &Path) -> Result<String, SceneError> {
    fs::read_to_string(path).map_err(|source| SceneError::Io {
        path: path.to_path_buf(),
        source,
    })
}
