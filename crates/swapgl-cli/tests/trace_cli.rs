use std::fs;
use std::process::Command;

use tempfile::TempDir;

const VELOCITY: &str = r"precision highp float;
uniform sampler2D uTexture;
uniform sampler2D positionTexture;
uniform float uTime;
varying vec2 vUv;
void main() { gl_FragColor = texture2D(uTexture, vUv) - texture2D(positionTexture, vUv) * uTime; }
";

fn write_scene(root: &std::path::Path) -> std::path::PathBuf {
    fs::write(root.join("velocity.frag"), VELOCITY).unwrap();
    let scene = root.join("particles.toml");
    fs::write(
        &scene,
        r#"
version = 1
frames = 2
frame_interval = "10ms"
order = ["velocity", "position"]

[passes.velocity]
width = 16
height = 16
debug = true
fragment_path = "velocity.frag"
inputs = { positionTexture = "position" }

[passes.position]
width = 16
height = 16
float_textures = false
program_name = "init"
fragment = "void main() { gl_FragColor = vec4(0.0); }"
programs = { normal = "uniform sampler2D uTexture; varying vec2 vUv; void main() { gl_FragColor = texture2D(uTexture, vUv); }" }
schedule = [{ frame = 1, program = "normal" }]
inputs = { velocityTexture = "velocity" }
"#,
    )
    .unwrap();
    scene
}

#[test]
fn check_prints_built_passes() {
    let root = TempDir::new().unwrap();
    let scene = write_scene(root.path());

    let output = Command::new(env!("CARGO_BIN_EXE_swapgl"))
        .arg("check")
        .arg(&scene)
        .output()
        .expect("failed to run swapgl check");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("velocity (swap) 16x16 targets [float, float]"));
    assert!(stdout.contains("position (swap) 16x16 targets [float, half-float]"));
    assert!(stdout.contains("programs [init, normal] current init"));
}

#[test]
fn trace_writes_json_per_frame() {
    let root = TempDir::new().unwrap();
    let scene = write_scene(root.path());
    let trace_path = root.path().join("trace.json");

    let status = Command::new(env!("CARGO_BIN_EXE_swapgl"))
        .arg("trace")
        .arg(&scene)
        .args(["--frames", "3", "--format", "json", "--debug-view", "--output"])
        .arg(&trace_path)
        .status()
        .expect("failed to run swapgl trace");
    assert!(status.success());

    let trace: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&trace_path).unwrap()).unwrap();
    let frames = trace["frames"].as_array().unwrap();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0]["passes"][1]["program"], "init");
    assert_eq!(frames[1]["passes"][1]["program"], "normal");
    assert_eq!(frames[0]["passes"][0]["debug_view"], true);

    let draws = frames[0]["commands"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|command| command["op"] == "draw_triangles")
        .count();
    assert_eq!(draws, 3);
}

#[test]
fn invalid_scene_fails_with_message() {
    let root = TempDir::new().unwrap();
    let scene = root.path().join("broken.toml");
    fs::write(
        &scene,
        "version = 1\norder = [\"a\"]\n[passes.a]\nfragment = \"void main() {}\"\ninputs = { uX = \"ghost\" }\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_swapgl"))
        .arg("trace")
        .arg(&scene)
        .output()
        .expect("failed to run swapgl trace");

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("ghost"));
}
