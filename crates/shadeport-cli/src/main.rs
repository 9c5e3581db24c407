use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use shadeport_glsl::{
    Approximation, DeclaredResource, ExpandOptions, ExpansionCache, ProfileClass, ProfileConfig,
    TargetProfile,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ClassArg {
    Mobile,
    Desktop,
}

impl From<ClassArg> for ProfileClass {
    fn from(arg: ClassArg) -> Self {
        match arg {
            ClassArg::Mobile => ProfileClass::Mobile,
            ClassArg::Desktop => ProfileClass::Desktop,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "shadeport")]
#[command(about = "Expand portable shader vocabulary into profile-specific GLSL")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Expand shader sources for a target profile.
    Expand(ExpandArgs),
    /// List the target profiles and the capabilities each one supports.
    Profiles,
}

#[derive(Debug, Args)]
struct ExpandArgs {
    /// Shader sources written against the portable vocabulary.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Graphics profile class (overrides the config file).
    #[arg(long, value_enum)]
    profile: Option<ClassArg>,

    /// Emit explicit binding points (`layout(binding = slot + TEXTURE_OFFSET)`).
    #[arg(long, action = clap::ArgAction::SetTrue, conflicts_with = "no_binding_points")]
    binding_points: bool,

    /// Let the linker assign binding points, even if the config file asks for explicit ones.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    no_binding_points: bool,

    /// TEXTURE_OFFSET added to every explicit binding index.
    #[arg(long, value_name = "N")]
    texture_offset: Option<u32>,

    /// JSON profile configuration, e.g. {"class": "desktop", "explicit_binding": true, "texture_offset": 4}
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the expanded source here instead of stdout (single input only).
    #[arg(short, long, value_name = "PATH", conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Write each expanded source into this directory under its input file name.
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Do not insert the profile's default precision declarations.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    no_precision: bool,

    /// Write a JSON report of emitted bindings and approximations to this path (single input only).
    #[arg(long, value_name = "PATH")]
    bindings_out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct BindingReport<'a> {
    profile: TargetProfile,
    texture_offset: Option<u32>,
    bindings: &'a [DeclaredResource],
    approximations: &'a [Approximation],
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Expand(args) => expand(args),
        Commands::Profiles => profiles(),
    }
}

fn load_config(args: &ExpandArgs) -> Result<ProfileConfig> {
    let mut config: ProfileConfig = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parse config {}", path.display()))?
        }
        None => ProfileConfig::default(),
    };

    if let Some(class) = args.profile {
        config.class = class.into();
    }
    if args.binding_points {
        config.explicit_binding = true;
    } else if args.no_binding_points {
        config.explicit_binding = false;
    }
    if let Some(offset) = args.texture_offset {
        config.texture_offset = Some(offset);
    }
    Ok(config)
}

fn expand(args: ExpandArgs) -> Result<()> {
    if args.inputs.len() > 1 {
        if args.output.is_some() {
            bail!("--output takes a single input; use --out-dir for several");
        }
        if args.bindings_out.is_some() {
            bail!("--bindings-out takes a single input");
        }
    }

    let config = load_config(&args)?
        .resolve()
        .context("invalid profile configuration")?;
    let options = ExpandOptions {
        emit_precision: !args.no_precision,
    };
    let mut cache = ExpansionCache::new(config, options);
    if let Some(dir) = &args.out_dir {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }

    let mut stdout = io::stdout().lock();
    for input in &args.inputs {
        let source =
            fs::read_to_string(input).with_context(|| format!("read {}", input.display()))?;
        let cached = cache.contains(&source);
        let expanded = cache
            .expand(&source)
            .with_context(|| format!("expand {}", input.display()))?;

        info!(
            input = %input.display(),
            profile = %expanded.profile,
            bindings = expanded.bindings.len(),
            approximations = expanded.approximations.len(),
            cached,
            "expanded shader"
        );

        if let Some(path) = &args.output {
            write_file(path, expanded.glsl.as_bytes())?;
        } else if let Some(dir) = &args.out_dir {
            let name = input
                .file_name()
                .with_context(|| format!("{} has no file name", input.display()))?;
            write_file(&dir.join(name), expanded.glsl.as_bytes())?;
        } else {
            stdout
                .write_all(expanded.glsl.as_bytes())
                .context("write expanded source to stdout")?;
        }

        if let Some(path) = &args.bindings_out {
            let report = BindingReport {
                profile: expanded.profile,
                texture_offset: config.texture_offset(),
                bindings: &expanded.bindings,
                approximations: &expanded.approximations,
            };
            let mut json =
                serde_json::to_string_pretty(&report).context("serialize binding report")?;
            json.push('\n');
            write_file(path, json.as_bytes())?;
        }
    }

    let stats = cache.stats();
    info!(hits = stats.hits, misses = stats.misses, "expansion cache");
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

fn profiles() -> Result<()> {
    let mut stdout = io::stdout().lock();
    for profile in TargetProfile::ALL {
        let capabilities: Vec<&str> = profile
            .capabilities()
            .iter()
            .map(|flag| flag.describe())
            .collect();
        writeln!(stdout, "{profile}: {}", capabilities.join(", "))?;
    }
    Ok(())
}
