use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use rigkit::{InMemoryScene, ModuleType, RigConfig, Scaffold, ScaffoldOptions, SceneGraph};

#[derive(Parser, Debug)]
#[command(name = "rigkit", version)]
struct Cli {
    /// Rig config JSON; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a scaffold joint chain to a scene file (created if missing).
    Scaffold(ScaffoldArgs),
    /// List the scaffolds found in a scene file.
    List(ListArgs),
    /// Build every scaffold of a scene file into rig modules.
    Build(BuildArgs),
}

#[derive(Parser, Debug)]
struct ScaffoldArgs {
    /// Scene JSON, read and rewritten in place.
    #[arg(long)]
    scene: PathBuf,

    /// Module name prefix.
    #[arg(long)]
    name: String,

    /// Number of joints.
    #[arg(long, default_value_t = 3)]
    length: usize,

    /// Module type tag (simple_fk, space_switch_chain, two_bone_ik, unassigned).
    #[arg(long, default_value = "unassigned")]
    module_type: ModuleType,

    /// Name of the joint to attach to; the skeleton root when omitted.
    #[arg(long)]
    socket: Option<String>,

    /// Leave the end joint without a controller.
    #[arg(long)]
    no_include_end: bool,
}

#[derive(Parser, Debug)]
struct ListArgs {
    /// Scene JSON.
    #[arg(long)]
    scene: PathBuf,
}

#[derive(Parser, Debug)]
struct BuildArgs {
    /// Scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Output scene JSON; defaults to rewriting the input.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = read_config(cli.config.as_deref())?;
    match cli.cmd {
        Command::Scaffold(args) => cmd_scaffold(args, &config),
        Command::List(args) => cmd_list(args, &config),
        Command::Build(args) => cmd_build(args, &config),
    }
}

fn read_config(path: Option<&Path>) -> anyhow::Result<RigConfig> {
    let Some(path) = path else {
        return Ok(RigConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config '{}'", path.display()))?;
    RigConfig::from_json_str(&text).with_context(|| format!("parse config '{}'", path.display()))
}

fn read_scene(path: &Path) -> anyhow::Result<InMemoryScene> {
    if !path.exists() {
        return Ok(InMemoryScene::new());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read scene '{}'", path.display()))?;
    InMemoryScene::from_json(&text).with_context(|| format!("parse scene '{}'", path.display()))
}

fn write_scene(scene: &InMemoryScene, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, scene.to_json()?)
        .with_context(|| format!("write scene '{}'", path.display()))?;
    Ok(())
}

fn cmd_scaffold(args: ScaffoldArgs, config: &RigConfig) -> anyhow::Result<()> {
    let mut scene = read_scene(&args.scene)?;
    let socket = args
        .socket
        .as_deref()
        .map(|name| {
            scene
                .find_node(name)
                .with_context(|| format!("socket joint '{name}' not found"))
        })
        .transpose()?;

    let opts = ScaffoldOptions {
        name: args.name,
        length: args.length,
        socket,
        module_type: args.module_type,
        include_end_joint: !args.no_include_end,
    };
    let scaffold = Scaffold::make(&mut scene, config, &opts)?;
    let name = scaffold.name(&scene, config)?;

    write_scene(&scene, &args.scene)?;
    eprintln!("wrote scaffold '{name}' to {}", args.scene.display());
    Ok(())
}

fn cmd_list(args: ListArgs, config: &RigConfig) -> anyhow::Result<()> {
    let scene = read_scene(&args.scene)?;
    for scaffold in rigkit::discover_scaffolds(&scene, config)? {
        let info = scaffold.info(&scene, config)?;
        let socket = match info.socket {
            Some(s) => scene.node_name(s)?,
            None => "-".to_string(),
        };
        println!(
            "{}\t{}\tjoints={}\tsocket={}",
            info.name,
            info.module_type,
            info.chain.len(),
            socket
        );
    }
    Ok(())
}

fn cmd_build(args: BuildArgs, config: &RigConfig) -> anyhow::Result<()> {
    let mut scene = read_scene(&args.scene)?;
    let report = rigkit::batch_build(&mut scene, config).context("build rig")?;

    for (name, reason) in report.skipped() {
        eprintln!("skipped '{name}': {reason}");
    }
    let out = args.out.unwrap_or(args.scene);
    write_scene(&scene, &out)?;
    eprintln!(
        "built {} module(s), wrote {}",
        report.built().len(),
        out.display()
    );
    Ok(())
}
