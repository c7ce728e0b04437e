//! wix-tree CLI - compile project manifests to WiX source
//!
//! Usage:
//!   wix-tree compile app.yaml -o app.wxs   # Write the WiX source
//!   wix-tree validate app.yaml             # Compile in memory and summarize
//!   wix-tree plan app.yaml                 # Show the candle/light commands
//!   wix-tree guid Component.MyApp.exe --seed <GUID>

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;
use wix_tree::guid::{format_guid, GuidFormat, GuidGenerator};
use wix_tree::{manifest, BuildPlan, Compiler, CompilerOptions, OutputType, Toolchain};

#[derive(Parser)]
#[command(name = "wix-tree")]
#[command(author, version, about = "Declarative project tree to WiX source compiler")]
struct Cli {
    /// Log pipeline details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a manifest and write the WiX source
    Compile {
        /// YAML or JSON project manifest
        manifest: PathBuf,

        /// Output file (defaults to the project name next to the manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compiler options file (searched upward from the manifest if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Produce a merge module instead of a product
        #[arg(long)]
        msm: bool,

        /// Keep the written source as a build artifact
        #[arg(short, long)]
        keep: bool,
    },

    /// Compile a manifest in memory and report what it produces
    Validate {
        manifest: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the toolchain commands that would build the package
    Plan {
        manifest: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        msm: bool,
    },

    /// Derive a component GUID from an id, or generate a random one
    Guid {
        /// Component id
        id: Option<String>,

        /// Product seed GUID
        #[arg(short, long)]
        seed: Option<Uuid>,

        /// Generate a random GUID
        #[arg(short, long)]
        random: bool,

        /// Output format: hyphens, braces, plain
        #[arg(short, long, default_value = "hyphens")]
        format: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Compile { manifest, output, config, msm, keep } => {
            cmd_compile(&manifest, output, config.as_deref(), msm, keep)
        }
        Commands::Validate { manifest, config } => cmd_validate(&manifest, config.as_deref()),
        Commands::Plan { manifest, config, msm } => cmd_plan(&manifest, config.as_deref(), msm),
        Commands::Guid { id, seed, random, format } => cmd_guid(id, seed, random, &format),
    }
}

fn load_options(manifest: &Path, config: Option<&Path>, msm: bool) -> anyhow::Result<CompilerOptions> {
    let mut options = match config {
        Some(path) => CompilerOptions::load(path)?,
        None => {
            let start = manifest.parent().unwrap_or(Path::new("."));
            CompilerOptions::find_and_load(start).unwrap_or_default()
        }
    };
    if msm {
        options.output_type = OutputType::Msm;
    }
    Ok(options)
}

fn default_output(manifest: &Path, name: &str) -> PathBuf {
    let dir = manifest.parent().unwrap_or(Path::new("."));
    dir.join(format!("{}.wxs", name))
}

fn cmd_compile(
    manifest_path: &Path,
    output: Option<PathBuf>,
    config: Option<&Path>,
    msm: bool,
    keep: bool,
) -> anyhow::Result<()> {
    let mut options = load_options(manifest_path, config, msm)?;
    if keep {
        options.preserve_temp_files = true;
    }

    let project = manifest::load(manifest_path)
        .with_context(|| format!("Failed to load {}", manifest_path.display()))?;
    let output = output
        .unwrap_or_else(|| default_output(manifest_path, project.out_file_name.as_deref().unwrap_or(&project.name)));

    let compiler = Compiler::new(options);
    let artifact = compiler.build_wxs(&project, &output)?;
    let result = &artifact.output;

    println!("Generated: {}", artifact.wxs_path.display());
    println!();
    println!("  Name:        {}", project.name);
    println!("  Version:     {}", project.version);
    println!("  ProductId:   {}", format_guid(&result.product_id, GuidFormat::Braces));
    println!("  UpgradeCode: {}", format_guid(&result.upgrade_code, GuidFormat::Braces));
    if let Some(path) = &result.auto_assigned_install_dir {
        println!();
        println!("  Auto-generated InstallDir ID:");
        println!("    {}={}", compiler.options().install_dir_default_id, path);
    }
    for request in &result.packaging_requests {
        println!("  Package {} -> {}", request.assembly, request.output);
    }

    Ok(())
}

fn cmd_validate(manifest_path: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let options = load_options(manifest_path, config, false)?;
    let project = manifest::load(manifest_path)
        .with_context(|| format!("Failed to load {}", manifest_path.display()))?;

    let output = Compiler::new(options).compile(&project)?;
    let document = &output.document;

    let count = |name: &str| document.root.descendants_named(name).len();

    println!("Project is valid");
    println!();
    println!("  Name:        {}", project.name);
    println!("  Version:     {}", project.version);
    println!("  Directories: {}", count("Directory"));
    println!("  Components:  {}", count("Component"));
    println!("  Files:       {}", count("File"));
    println!("  Features:    {}", count("Feature"));
    println!("  Actions:     {}", count("CustomAction"));
    if !output.extensions.is_empty() {
        let names: Vec<&str> = output.extensions.iter().map(|e| e.dll()).collect();
        println!("  Extensions:  {}", names.join(", "));
    }

    Ok(())
}

fn cmd_plan(manifest_path: &Path, config: Option<&Path>, msm: bool) -> anyhow::Result<()> {
    let options = load_options(manifest_path, config, msm)?;
    let project = manifest::load(manifest_path)
        .with_context(|| format!("Failed to load {}", manifest_path.display()))?;

    let compiler = Compiler::new(options);
    let output = compiler.compile(&project)?;

    let toolchain = match Toolchain::locate(compiler.options()) {
        Ok(toolchain) => toolchain,
        Err(e) => {
            tracing::warn!("{}", e);
            Toolchain::unresolved()
        }
    };

    let wxs = default_output(manifest_path, project.out_file_name.as_deref().unwrap_or(&project.name));
    let plan = BuildPlan::new(&toolchain, compiler.options(), &wxs, &output.extensions, &project.language);

    println!("{}", plan.compile);
    println!("{}", plan.link);

    Ok(())
}

fn cmd_guid(id: Option<String>, seed: Option<Uuid>, random: bool, format: &str) -> anyhow::Result<()> {
    let format = GuidFormat::from_str(format).with_context(|| format!("Unknown GUID format: {}", format))?;

    let guid = if random {
        Uuid::new_v4()
    } else {
        let id = id.context("Either an id or --random is required")?;
        let seed = seed.context("--seed is required to derive a GUID from an id")?;
        GuidGenerator::new(seed).component_guid(&id)
    };

    println!("{}", format_guid(&guid, format));
    Ok(())
}
