use std::rc::Rc;

use swapgl::gpu::headless::{Command, HeadlessContext, ProgramId, TextureId};
use swapgl::{
    DebugViewport, GpgpuError, PassInputs, RendererConfig, Slot, SwapRenderer, TexelFormat,
};

const FEEDBACK: &str = r"precision highp float;
uniform sampler2D uTexture;
varying vec2 vUv;
void main() { gl_FragColor = texture2D(uTexture, vUv); }
";

const VELOCITY: &str = r"precision highp float;
uniform sampler2D uTexture;
uniform sampler2D positionTexture;
uniform float uTime;
varying vec2 vUv;
void main() {
    vec4 v = texture2D(uTexture, vUv);
    vec4 p = texture2D(positionTexture, vUv);
    gl_FragColor = v - p * uTime;
}
";

const POSITION: &str = r"precision highp float;
uniform sampler2D uTexture;
uniform sampler2D velocityTexture;
varying vec2 vUv;
void main() { gl_FragColor = texture2D(uTexture, vUv) + texture2D(velocityTexture, vUv); }
";

const ALT: &str = r"precision highp float;
varying vec2 vUv;
void main() { gl_FragColor = vec4(vUv, 0.0, 1.0); }
";

fn swap_renderer(context: &Rc<HeadlessContext>, config: RendererConfig) -> SwapRenderer<HeadlessContext> {
    SwapRenderer::new(Rc::clone(context), config).unwrap()
}

fn draw_programs(context: &HeadlessContext) -> Vec<Option<ProgramId>> {
    context
        .draw_calls()
        .into_iter()
        .filter_map(|command| match command {
            Command::DrawTriangles { program, .. } => Some(program),
            _ => None,
        })
        .collect()
}

#[test]
fn even_swaps_restore_roles_and_odd_swaps_exchange_them() {
    let context = Rc::new(HeadlessContext::new());
    let mut renderer = swap_renderer(&context, RendererConfig::new(FEEDBACK));
    let front = renderer.front().texture();
    let back = renderer.back().texture();

    for n in 0..7 {
        if n % 2 == 0 {
            assert_eq!(renderer.read_slot(), Slot::Front, "after {n} swaps");
            assert_eq!((renderer.read_texture(), renderer.write_texture()), (front, back));
        } else {
            assert_eq!(renderer.read_slot(), Slot::Back, "after {n} swaps");
            assert_eq!((renderer.read_texture(), renderer.write_texture()), (back, front));
        }
        renderer.swap();
    }
    // Front and back never move.
    assert_eq!(renderer.front().texture(), front);
    assert_eq!(renderer.back().texture(), back);
}

#[test]
fn swap_issues_no_gpu_work() {
    let context = Rc::new(HeadlessContext::new());
    let mut renderer = swap_renderer(&context, RendererConfig::new(FEEDBACK));
    context.take_commands();
    renderer.swap().swap().swap();
    assert!(context.take_commands().is_empty());
}

#[test]
fn current_texture_always_equals_write_texture() {
    let context = Rc::new(HeadlessContext::new());
    let mut renderer = swap_renderer(&context, RendererConfig::new(FEEDBACK));
    for _ in 0..4 {
        assert_eq!(renderer.current_texture(), renderer.write_texture());
        renderer.update(&PassInputs::new()).unwrap();
        assert_eq!(renderer.current_texture(), renderer.write_texture());
        renderer.swap();
    }
}

#[test]
fn written_texture_becomes_read_texture_after_swap() {
    let context = Rc::new(HeadlessContext::new());
    let mut renderer = swap_renderer(&context, RendererConfig::new(FEEDBACK));
    let written = renderer.write_texture();
    renderer.update(&PassInputs::new()).unwrap().swap();
    assert_eq!(renderer.read_texture(), written);
}

#[test]
fn debug_viewport_partial_update_keeps_unspecified_fields() {
    let context = Rc::new(HeadlessContext::new());
    let mut renderer = swap_renderer(&context, RendererConfig::new(FEEDBACK).with_debug(true));
    assert_eq!(
        renderer.debug_viewport(),
        DebugViewport {
            x: 30,
            y: 30,
            width: 64,
            height: 64
        }
    );

    renderer.set_debug_viewport(Some(0), None, Some(50), None);
    assert_eq!(
        renderer.debug_viewport(),
        DebugViewport {
            x: 0,
            y: 30,
            width: 50,
            height: 64
        }
    );
}

#[test]
fn unknown_program_keeps_the_current_one() {
    let context = Rc::new(HeadlessContext::new());
    let mut renderer = swap_renderer(&context, RendererConfig::new(FEEDBACK));
    renderer.update(&PassInputs::new()).unwrap();
    assert!(!renderer.activate_program("nonexistent"));
    assert_eq!(renderer.current_program_name(), Some("main"));
    renderer.update(&PassInputs::new()).unwrap();

    let programs = draw_programs(&context);
    assert_eq!(programs.len(), 2);
    assert_eq!(programs[0], programs[1]);
}

#[test]
fn half_float_back_target_when_float_is_unavailable() {
    let context = Rc::new(HeadlessContext::new());
    let renderer = swap_renderer(
        &context,
        RendererConfig::new(FEEDBACK)
            .with_size(32, 32)
            .with_float_textures(false),
    );
    assert_eq!(renderer.back().format(), TexelFormat::HalfFloat);
    assert_eq!(renderer.front().format(), TexelFormat::Float);
    assert_eq!((renderer.back().width(), renderer.back().height()), (32, 32));
}

#[test]
fn chained_renderers_feed_each_other() {
    let context = Rc::new(HeadlessContext::new());
    let mut velocity = swap_renderer(&context, RendererConfig::new(VELOCITY).with_size(16, 16));
    let mut position = swap_renderer(&context, RendererConfig::new(POSITION).with_size(16, 16));
    let velocity_before = velocity.current_texture();
    let position_before = position.current_texture();

    velocity
        .update(
            &PassInputs::new()
                .texture("positionTexture", position.current_texture())
                .uniform("uTime", 0.5_f32),
        )
        .unwrap();
    position
        .update(&PassInputs::new().texture("velocityTexture", velocity.current_texture()))
        .unwrap();
    velocity.swap();
    position.swap();

    assert_ne!(velocity.current_texture(), velocity_before);
    assert_ne!(position.current_texture(), position_before);
    assert_eq!(context.draw_calls().len(), 2);

    // The position pass sampled the velocity pass output.
    assert!(context.commands().contains(&Command::BindTexture {
        unit: 1,
        texture: velocity_before
    }));
}

#[test]
fn activated_alt_program_is_the_one_drawn() {
    let context = Rc::new(HeadlessContext::new());
    let mut renderer = swap_renderer(&context, RendererConfig::new(FEEDBACK));
    renderer.add_program(ALT, "alt").unwrap();
    assert_eq!(renderer.current_program_name(), Some("main"));

    assert!(renderer.activate_program("alt"));
    renderer.update(&PassInputs::new()).unwrap();

    let alt = renderer.programs().get("alt").unwrap().handle();
    let main = renderer.programs().get("main").unwrap().handle();
    assert_ne!(alt, main);
    assert_eq!(draw_programs(&context), vec![Some(alt)]);
}

#[test]
fn added_programs_receive_the_window_rate() {
    let context = Rc::new(HeadlessContext::new());
    let mut renderer = swap_renderer(&context, RendererConfig::new(FEEDBACK).with_size(40, 20));
    renderer.resize(20, 40);
    renderer.add_program(ALT, "alt").unwrap();
    let alt = renderer.programs().get("alt").unwrap().handle();

    let rates: Vec<f32> = context
        .commands()
        .into_iter()
        .filter_map(|command| match command {
            Command::SetUniform {
                program: Some(program),
                name,
                value: swapgl::Uniform::Float(rate),
            } if program == alt && name == "uWindowRate" => Some(rate),
            _ => None,
        })
        .collect();
    assert_eq!(rates, vec![2.0]);
    // Resize only stores the dimensions.
    assert_eq!(renderer.front().width(), 40);
}

#[test]
fn debug_view_samples_the_write_target() {
    let context = Rc::new(HeadlessContext::new());
    let mut renderer = swap_renderer(&context, RendererConfig::new(FEEDBACK).with_debug(true));
    renderer.set_debug_viewport(Some(10), Some(20), Some(100), Some(80));
    renderer.update(&PassInputs::new()).unwrap();
    context.take_commands();

    renderer.render_debug_view().unwrap();
    let commands = context.take_commands();
    assert_eq!(
        commands.first(),
        Some(&Command::Viewport {
            x: 10,
            y: 20,
            width: 100,
            height: 80
        })
    );
    assert!(commands.contains(&Command::BindTexture {
        unit: 0,
        texture: renderer.write_texture()
    }));
    assert!(commands.contains(&Command::SetBlend { enabled: false }));
    assert!(matches!(
        commands.last(),
        Some(Command::DrawTriangles {
            framebuffer: None,
            count: 3,
            ..
        })
    ));
}

#[test]
fn debug_view_without_debug_mode_is_an_error() {
    let context = Rc::new(HeadlessContext::new());
    let mut renderer = swap_renderer(&context, RendererConfig::new(FEEDBACK));
    assert!(!renderer.has_debug_view());
    assert!(matches!(
        renderer.render_debug_view(),
        Err(GpgpuError::DebugViewDisabled)
    ));
    assert!(context.draw_calls().is_empty());
}

#[test]
fn compile_failure_surfaces_stage_and_log() {
    let context = Rc::new(HeadlessContext::new());
    context.fail_next_compile(swapgl::ShaderStage::Fragment, "0:3: 'foo' undeclared");
    let result = SwapRenderer::new(Rc::clone(&context), RendererConfig::new(FEEDBACK));
    match result {
        Err(GpgpuError::ShaderCompile { stage, log }) => {
            assert_eq!(stage, swapgl::ShaderStage::Fragment);
            assert!(log.contains("undeclared"));
        }
        other => panic!("unexpected result: {:?}", other.err()),
    }
    assert_eq!(context.live_textures(), 0);
    assert_eq!(context.live_buffers(), 0);
}

#[test]
fn swapped_out_texture_belongs_to_the_caller() {
    let context = Rc::new(HeadlessContext::new());
    let mut renderer = swap_renderer(&context, RendererConfig::new(FEEDBACK));
    let snapshot: TextureId = renderer.update_texture(swapgl::Role::Read).unwrap();
    drop(renderer);
    assert_eq!(context.live_textures(), 1);
    assert!(context.texture_descriptor(snapshot).is_some());
}
