//! Fixed shader sources shared by every renderer.
//!
//! All programs a renderer hosts reuse one vertex stage: a single triangle
//! whose unit-square `position` attribute is stretched by `uWindowRate`
//! (`height / width`) so that it covers the whole target, handing a `vUv`
//! varying to the fragment stage. The debug program pairs that vertex stage
//! with a pass-through fragment shader sampling `uTexture`.

use crate::types::{GlslDialect, UvOrientation};

/// Builds the full-screen vertex shader for the given GLSL flavour.
///
/// The clip-space mapping is `(mix(-1, 1 + 2r, x), mix(-1, 1 + 2/r, y))` with
/// `r = uWindowRate`; the varying is derived from
/// `uvX = x + r * x` and `uvY = 1 - y - y / r`, flipped according to
/// `orientation`.
pub fn vertex_shader(dialect: GlslDialect, orientation: UvOrientation) -> String {
    let (input, output) = match dialect {
        GlslDialect::Gles100 => ("attribute", "varying"),
        GlslDialect::Gles300 | GlslDialect::Glsl330 => ("in", "out"),
    };
    let uv = match orientation {
        UvOrientation::BottomUp => "vec2(uvX, 1.0 - uvY)",
        UvOrientation::TopDown => "vec2(uvX, uvY)",
    };

    format!(
        r"{header}
{input} vec4 position;

uniform float uWindowRate;

{output} vec2 vUv;

void main() {{
    float x = mix(-1.0, 1.0 + uWindowRate * 2.0, position.x);
    float y = mix(-1.0, 1.0 + 1.0 / uWindowRate * 2.0, position.y);

    float uvX = position.x + uWindowRate * position.x;
    float uvY = 1.0 - position.y - position.y / uWindowRate;

    gl_Position = vec4(x, y, position.z, 1.0);
    vUv = {uv};
}}
",
        header = header(dialect),
    )
}

/// Builds the pass-through fragment shader used by the debug preview.
pub fn debug_fragment_shader(dialect: GlslDialect) -> String {
    match dialect {
        GlslDialect::Gles100 => format!(
            r"{header}
varying vec2 vUv;

uniform sampler2D uTexture;

void main() {{
    gl_FragColor = vec4(texture2D(uTexture, vUv).rgb, 1.0);
}}
",
            header = header(dialect)
        ),
        GlslDialect::Gles300 | GlslDialect::Glsl330 => format!(
            r"{header}
in vec2 vUv;

uniform sampler2D uTexture;

out vec4 fragColor;

void main() {{
    fragColor = vec4(texture(uTexture, vUv).rgb, 1.0);
}}
",
            header = header(dialect)
        ),
    }
}

fn header(dialect: GlslDialect) -> &'static str {
    match dialect {
        GlslDialect::Gles100 => "precision mediump float;\n",
        GlslDialect::Gles300 => "#version 300 es\nprecision mediump float;\n",
        GlslDialect::Glsl330 => "#version 330 core\n",
    }
}

/// Evaluates the fixed vertex stage on the CPU: returns the clip-space
/// position and `vUv` of a unit-square vertex.
pub fn project_vertex(
    position: [f32; 2],
    window_rate: f32,
    orientation: UvOrientation,
) -> ([f32; 2], [f32; 2]) {
    let [px, py] = position;
    let mix = |a: f32, b: f32, t: f32| a * (1.0 - t) + b * t;
    let x = mix(-1.0, 1.0 + window_rate * 2.0, px);
    let y = mix(-1.0, 1.0 + 1.0 / window_rate * 2.0, py);
    let uv_x = px + window_rate * px;
    let uv_y = 1.0 - py - py / window_rate;
    let uv = match orientation {
        UvOrientation::BottomUp => [uv_x, 1.0 - uv_y],
        UvOrientation::TopDown => [uv_x, uv_y],
    };
    ([x, y], uv)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 2], b: [f32; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-5 && (a[1] - b[1]).abs() < 1e-5
    }

    #[test]
    fn gles100_vertex_uses_attribute_and_varying() {
        let source = vertex_shader(GlslDialect::Gles100, UvOrientation::BottomUp);
        assert!(source.starts_with("precision mediump float;"));
        assert!(source.contains("attribute vec4 position;"));
        assert!(source.contains("varying vec2 vUv;"));
        assert!(source.contains("vUv = vec2(uvX, 1.0 - uvY);"));
    }

    #[test]
    fn top_down_orientation_skips_the_flip() {
        let source = vertex_shader(GlslDialect::Gles300, UvOrientation::TopDown);
        assert!(source.starts_with("#version 300 es"));
        assert!(source.contains("in vec4 position;"));
        assert!(source.contains("vUv = vec2(uvX, uvY);"));
    }

    #[test]
    fn debug_fragment_matches_dialect() {
        let legacy = debug_fragment_shader(GlslDialect::Gles100);
        assert!(legacy.contains("gl_FragColor"));
        assert!(legacy.contains("uniform sampler2D uTexture;"));

        let core = debug_fragment_shader(GlslDialect::Glsl330);
        assert!(core.starts_with("#version 330 core"));
        assert!(core.contains("out vec4 fragColor;"));
        assert!(!core.contains("gl_FragColor"));
    }

    #[test]
    fn square_target_triangle_covers_clip_space() {
        let rate = 1.0;
        let (origin, origin_uv) = project_vertex([0.0, 0.0], rate, UvOrientation::BottomUp);
        let (right, right_uv) = project_vertex([1.0, 0.0], rate, UvOrientation::BottomUp);
        let (top, top_uv) = project_vertex([0.0, 1.0], rate, UvOrientation::BottomUp);

        assert!(close(origin, [-1.0, -1.0]));
        assert!(close(right, [3.0, -1.0]));
        assert!(close(top, [-1.0, 3.0]));
        assert!(close(origin_uv, [0.0, 0.0]));
        assert!(close(right_uv, [2.0, 0.0]));
        assert!(close(top_uv, [0.0, 2.0]));
    }

    #[test]
    fn bottom_up_uv_reaches_one_at_the_top_edge() {
        let rate = 0.5;
        // Vertical position where the clip-space y crosses the top edge.
        let edge = 2.0 / (2.0 + 2.0 / rate);
        let (clip, uv) = project_vertex([0.0, edge], rate, UvOrientation::BottomUp);
        assert!((clip[1] - 1.0).abs() < 1e-5);
        assert!((uv[1] - 1.0).abs() < 1e-5);

        let (_, flipped) = project_vertex([0.0, edge], rate, UvOrientation::TopDown);
        assert!(flipped[1].abs() < 1e-5);
    }
}
