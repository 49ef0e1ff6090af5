use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "camtrack", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary of an animation.
    Inspect(InspectArgs),
    /// Print the camera pose at one frame as JSON.
    Sample(SampleArgs),
    /// Write the pose of every frame in the animation's range to a JSON file.
    Bake(BakeArgs),
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Input animation JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct SampleArgs {
    /// Input animation JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Timeline frame; fractional values blend between frames.
    #[arg(long, allow_negative_numbers = true)]
    frame: f64,
}

#[derive(Parser, Debug)]
struct BakeArgs {
    /// Input animation JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output JSON path.
    #[arg(long)]
    out: PathBuf,

    /// Evaluate frames on a rayon thread pool.
    #[arg(long)]
    parallel: bool,

    /// Worker threads for `--parallel`.
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Inspect(args) => cmd_inspect(args),
        Command::Sample(args) => cmd_sample(args),
        Command::Bake(args) => cmd_bake(args),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_animation(path: &Path) -> anyhow::Result<camtrack::Animation> {
    camtrack::Animation::from_path(path)
        .with_context(|| format!("load animation '{}'", path.display()))
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let anim = read_animation(&args.in_path)?;
    let s = anim.settings();

    println!("name:       {}", anim.name());
    println!("fps:        {}", s.fps.0);
    println!(
        "range:      [{}, {}) ({} frames, {:.3}s)",
        s.range.start,
        s.range.end,
        s.range.len_frames(),
        s.end_secs() - s.start_secs()
    );
    println!(
        "resolution: {}x{}",
        s.resolution.width, s.resolution.height
    );
    println!(
        "sensor:     {}x{} mm",
        s.sensor.width, s.sensor.height
    );
    println!("cinematic:  {}", s.cinematic);
    println!("bullet:     {}", s.bullet_time);
    println!("channels:");
    for ch in camtrack::Channel::ALL {
        let curve = anim.curve(ch);
        let span = match (curve.first(), curve.last()) {
            (Some(a), Some(b)) => format!("{}..={}", a.frame, b.frame),
            _ => "-".to_string(),
        };
        let lock = if curve.is_locked() { " locked" } else { "" };
        println!("  {:<15} {:>4} keys  {span}{lock}", ch.name(), curve.len());
    }
    Ok(())
}

fn cmd_sample(args: SampleArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.frame.is_finite(), "--frame must be finite");
    let anim = read_animation(&args.in_path)?;
    let pose = camtrack::CameraPose::sample(&anim, args.frame);
    let json = serde_json::to_string_pretty(&pose).context("serialize pose")?;
    println!("{json}");
    Ok(())
}

fn cmd_bake(args: BakeArgs) -> anyhow::Result<()> {
    let anim = read_animation(&args.in_path)?;
    let opts = camtrack::BakeOpts {
        parallel: args.parallel,
        threads: args.threads,
    };
    let poses = camtrack::bake_poses(&anim, &opts)?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let f = File::create(&args.out)
        .with_context(|| format!("create '{}'", args.out.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(f), &poses)
        .with_context(|| format!("write poses '{}'", args.out.display()))?;

    tracing::info!(frames = poses.len(), "baked animation");
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
