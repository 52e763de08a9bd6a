use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use scene::{PassKind, SceneConfig};
use serde::Serialize;
use swapgl::gpu::headless::{Command as GpuCommand, HeadlessContext};
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, CheckArgs, Command, OutputFormat, TraceArgs};
use crate::driver::{PassStep, PassSummary, SceneDriver};

pub fn run(args: Args) -> Result<()> {
    initialise_tracing();

    match args.command {
        Command::Check(check_args) => check(check_args),
        Command::Trace(trace_args) => trace(trace_args),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_scene(path: &Path) -> Result<SceneConfig> {
    SceneConfig::load(path).with_context(|| format!("failed to load scene {}", path.display()))
}

fn check(args: CheckArgs) -> Result<()> {
    let scene = load_scene(&args.scene)?;
    let context = Rc::new(HeadlessContext::new());
    let driver = SceneDriver::new(Rc::clone(&context), scene)?;
    let summaries = driver.summaries();
    tracing::info!(
        scene = %args.scene.display(),
        passes = summaries.len(),
        "scene is valid"
    );

    let body = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&summaries)?,
        OutputFormat::Text => render_summaries(&summaries),
    };
    emit(None, &body)
}

#[derive(Debug, Serialize)]
struct Trace {
    setup: Vec<GpuCommand>,
    frames: Vec<FrameTrace>,
}

#[derive(Debug, Serialize)]
struct FrameTrace {
    frame: u32,
    time: f32,
    passes: Vec<PassStep>,
    commands: Vec<GpuCommand>,
}

fn trace(args: TraceArgs) -> Result<()> {
    let scene = load_scene(&args.scene)?;
    let frames = args.frames.unwrap_or(scene.frames);
    let context = Rc::new(HeadlessContext::new());
    let mut driver = SceneDriver::new(Rc::clone(&context), scene)?;

    let mut trace = Trace {
        setup: context.take_commands(),
        frames: Vec::new(),
    };
    for _ in 0..frames {
        let frame = driver.frame();
        let time = driver.scene().frame_time(frame);
        let passes = driver.step(args.debug_view)?;
        trace.frames.push(FrameTrace {
            frame,
            time,
            passes,
            commands: context.take_commands(),
        });
    }
    tracing::info!(
        frames,
        draws = trace
            .frames
            .iter()
            .flat_map(|frame| &frame.commands)
            .filter(|command| matches!(command, GpuCommand::DrawTriangles { .. }))
            .count(),
        "trace complete"
    );

    let body = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&trace)?,
        OutputFormat::Text => render_trace(&trace)?,
    };
    emit(args.output.as_deref(), &body)
}

fn kind_name(kind: PassKind) -> &'static str {
    match kind {
        PassKind::Swap => "swap",
        PassKind::Single => "single",
    }
}

fn render_summaries(summaries: &[PassSummary]) -> String {
    let mut out = String::new();
    for summary in summaries {
        let formats: Vec<String> = summary.formats.iter().map(ToString::to_string).collect();
        let _ = writeln!(
            out,
            "{} ({}) {}x{} targets [{}] programs [{}] current {} debug {}",
            summary.name,
            kind_name(summary.kind),
            summary.width,
            summary.height,
            formats.join(", "),
            summary.programs.join(", "),
            summary.current_program.as_deref().unwrap_or("-"),
            if summary.debug_view { "on" } else { "off" },
        );
    }
    out
}

fn render_trace(trace: &Trace) -> Result<String> {
    let mut out = String::new();
    let _ = writeln!(out, "setup: {} commands", trace.setup.len());
    for frame in &trace.frames {
        let _ = writeln!(out, "frame {} t={:.3}s", frame.frame, frame.time);
        for pass in &frame.passes {
            let _ = writeln!(
                out,
                "  pass {} program={}{}",
                pass.name,
                pass.program.as_deref().unwrap_or("-"),
                if pass.debug_view { " +debug" } else { "" },
            );
        }
        for command in &frame.commands {
            let _ = writeln!(out, "    {}", serde_json::to_string(command)?);
        }
    }
    Ok(out)
}

fn emit(output: Option<&Path>, body: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, body)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(body.as_bytes())?;
            if !body.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
            Ok(())
        }
    }
}
