use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use backend::{BackendConfig, FfprobeProbe, HttpBackend};
use clap::{Parser, Subcommand, ValueEnum};
use studio::Studio;
use timeline::Track;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use workflow::{listed_operations, Category, GenerationForm};

mod notifier;
mod render;

use notifier::TerminalNotifier;

const DEFAULT_FILTER: &str = "studio=info,backend=info,studio_cli=info";
const VERBOSE_FILTER: &str = "studio=debug,backend=debug,workflow=debug,studio_cli=debug";

#[derive(Parser)]
#[command(name = "studio-cli")]
#[command(about = "Headless front end for the generation tree and stitch timeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend API base URL
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Media server base URL
    #[arg(long, global = true)]
    media_base: Option<String>,

    #[arg(long, global = true)]
    tree_id: Option<i64>,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the visible tree
    Tree {
        #[arg(long, value_enum, default_value = "text")]
        format: Format,

        /// Nodes to collapse before printing
        #[arg(long)]
        collapse: Vec<String>,
    },

    /// Create a node with an operation
    Generate {
        /// Operation id (see `modules`)
        #[arg(short, long)]
        module: String,

        /// Parent node, at most twice
        #[arg(short, long)]
        parent: Vec<String>,

        /// Parameter as key=value
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Upload a file as a new node
    Upload {
        file: PathBuf,

        /// Parent node (defaults to the root)
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Delete a node and its subtree
    Delete {
        node_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Stitch node media into one video
    Stitch {
        /// nodeId, or nodeId:start:end to trim a video
        #[arg(long = "clip", required = true, value_parser = parse_clip)]
        clips: Vec<ClipArg>,

        /// Node whose audio goes on the audio track
        #[arg(long)]
        audio: Vec<String>,
    },

    /// Ask the planning agent about a node
    Agent {
        node_id: String,

        text: String,

        /// Image path to send along
        #[arg(long)]
        image: Option<String>,

        /// Create the recommended node under `node_id`
        #[arg(long)]
        create: bool,
    },

    /// List the known operations
    Modules {
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,

        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct ClipArg {
    node_id: String,
    trim: Option<(f64, f64)>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_clip(raw: &str) -> Result<ClipArg, String> {
    let mut parts = raw.split(':');
    let node_id = parts.next().unwrap_or_default().trim().to_string();
    if node_id.is_empty() {
        return Err(format!("missing node id in `{raw}`"));
    }
    let rest: Vec<&str> = parts.collect();
    let trim = match rest.as_slice() {
        [] => None,
        [start, end] => {
            let start: f64 = start.parse().map_err(|_| format!("bad start time in `{raw}`"))?;
            let end: f64 = end.parse().map_err(|_| format!("bad end time in `{raw}`"))?;
            Some((start, end))
        }
        _ => return Err(format!("expected nodeId or nodeId:start:end, got `{raw}`")),
    };
    Ok(ClipArg { node_id, trim })
}

fn parse_category(raw: &str) -> Result<Category, String> {
    Category::parse(raw).ok_or_else(|| format!("unknown category `{raw}`"))
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<BackendConfig> {
    load_config_with(cli, |key| std::env::var(key).ok())
}

/// File, then environment, then flags; later layers win.
fn load_config_with(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> Result<BackendConfig> {
    let config = match &cli.config {
        Some(path) => BackendConfig::load(path).with_context(|| format!("reading config {}", path.display()))?,
        None => BackendConfig::new(),
    };
    let mut config = config.apply_env_with(env);
    if let Some(api_base) = &cli.api_base {
        config = config.with_api_base(api_base);
    }
    if let Some(media_base) = &cli.media_base {
        config = config.with_media_base(media_base);
    }
    if let Some(tree_id) = cli.tree_id {
        config = config.with_tree_id(tree_id);
    }
    Ok(config)
}

fn build_studio(config: BackendConfig, assume_yes: bool) -> Result<Studio> {
    let backend = HttpBackend::new(config.clone()).context("building HTTP client")?;
    let probe = FfprobeProbe::new(config.ffprobe_path.clone());
    Ok(Studio::new(
        config,
        Arc::new(backend),
        Arc::new(probe),
        Arc::new(TerminalNotifier::new(assume_yes)),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Modules { category, format } = &cli.command {
        return modules_command(*category, *format);
    }

    let config = load_config(&cli)?;
    debug!(api_base = %config.api_base, tree_id = config.tree_id, "config");
    let assume_yes = matches!(cli.command, Commands::Delete { yes: true, .. });
    let studio = build_studio(config, assume_yes)?;

    studio.load_tree().await.context("loading tree")?;

    match cli.command {
        Commands::Tree { format, collapse } => tree_command(&studio, format, &collapse),
        Commands::Generate { module, parent, params } => generate_command(&studio, &module, &parent, params).await,
        Commands::Upload { file, parent } => upload_command(&studio, file, parent).await,
        Commands::Delete { node_id, .. } => {
            studio.delete(&node_id).await.context("deleting node")?;
            println!("{}", studio.status());
            Ok(())
        }
        Commands::Stitch { clips, audio } => stitch_command(&studio, clips, audio).await,
        Commands::Agent {
            node_id,
            text,
            image,
            create,
        } => agent_command(&studio, &node_id, &text, image.as_deref(), create).await,
        Commands::Modules { .. } => Ok(()),
    }
}

fn tree_command(studio: &Studio, format: Format, collapse: &[String]) -> Result<()> {
    for id in collapse {
        if studio.toggle_collapse(id).is_none() {
            bail!("unknown node {id}");
        }
    }
    let view = studio.view();
    match format {
        Format::Text => print!("{}", render::tree_text(&view)),
        Format::Json => println!("{}", serde_json::to_string_pretty(&view)?),
    }
    Ok(())
}

fn select_parents(studio: &Studio, parents: &[String]) -> Result<()> {
    if parents.len() > 2 {
        bail!("at most two parents can be selected, got {}", parents.len());
    }
    studio.clear_selection();
    for id in parents {
        if !studio.toggle_select(id) {
            bail!("unknown or duplicate parent {id}");
        }
    }
    Ok(())
}

async fn generate_command(
    studio: &Studio,
    module: &str,
    parents: &[String],
    params: Vec<(String, String)>,
) -> Result<()> {
    if workflow::operation(module).is_none() {
        warn!(module, "operation not in the local catalog, sending as is");
    }
    select_parents(studio, parents)?;
    let mut form = GenerationForm::open(None, Some(module), None);
    for (key, value) in &params {
        form.set_from_str(key, value)?;
    }
    let (module_id, parameters) = form.submit();
    info!(%module_id, ?parents, "generating");
    studio
        .generate(&module_id, parameters)
        .await
        .with_context(|| format!("generating {module_id}"))?;
    println!("{}", studio.status());
    Ok(())
}

async fn upload_command(studio: &Studio, file: PathBuf, parent: Option<String>) -> Result<()> {
    select_parents(studio, parent.as_slice())?;
    studio
        .upload(&file)
        .await
        .with_context(|| format!("uploading {}", file.display()))?;
    println!("{}", studio.status());
    Ok(())
}

async fn stitch_command(studio: &Studio, clips: Vec<ClipArg>, audio: Vec<String>) -> Result<()> {
    for clip in &clips {
        expect_track(studio, &clip.node_id, Track::Video)?;
        let (track, index) = studio
            .add_clip(&clip.node_id, None)
            .await
            .with_context(|| format!("adding clip {}", clip.node_id))?;
        if let Some((start, end)) = clip.trim {
            studio
                .trim_clip(track, index, start, end)
                .with_context(|| format!("trimming clip {}", clip.node_id))?;
        }
    }
    for node_id in &audio {
        expect_track(studio, node_id, Track::Audio)?;
        studio
            .add_clip(node_id, None)
            .await
            .with_context(|| format!("adding audio clip {node_id}"))?;
    }
    let url = studio.request_stitch().await.context("stitching")?;
    println!("{url}");
    Ok(())
}

fn expect_track(studio: &Studio, node_id: &str, expected: Track) -> Result<()> {
    match studio.clip_track(node_id) {
        Some(track) if track == expected => Ok(()),
        Some(track) => bail!("node {node_id} holds {track} media, not {expected}"),
        None => bail!("node {node_id} has no media to stitch"),
    }
}

async fn agent_command(studio: &Studio, node_id: &str, text: &str, image: Option<&str>, create: bool) -> Result<()> {
    let context = studio
        .invoke_agent(node_id, text, image)
        .await
        .context("asking the agent")?;
    println!("{}", serde_json::to_string_pretty(&context.result)?);
    if create {
        studio
            .create_from_agent(node_id)
            .await
            .context("creating node from the agent suggestion")?;
        println!("{}", studio.status());
    }
    Ok(())
}

fn modules_command(category: Option<Category>, format: Format) -> Result<()> {
    let ops: Vec<_> = listed_operations(category).collect();
    if ops.is_empty() {
        return Err(anyhow!("no operations listed for this category"));
    }
    match format {
        Format::Text => print!("{}", render::modules_text(ops)),
        Format::Json => println!("{}", serde_json::to_string_pretty(&ops)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param("seed=42").unwrap(), ("seed".to_string(), "42".to_string()));
        assert_eq!(
            parse_param("positive_prompt=a=b").unwrap(),
            ("positive_prompt".to_string(), "a=b".to_string())
        );
        assert!(parse_param("seed").is_err());
        assert!(parse_param("=1").is_err());
    }

    #[test]
    fn test_parse_clip() {
        assert_eq!(
            parse_clip("n1").unwrap(),
            ClipArg {
                node_id: "n1".into(),
                trim: None
            }
        );
        assert_eq!(parse_clip("n2:2:5.5").unwrap().trim, Some((2.0, 5.5)));
        assert!(parse_clip("n2:2").is_err());
        assert!(parse_clip(":1:2").is_err());
        assert!(parse_clip("n2:a:b").is_err());
    }

    #[test]
    fn test_flags_override_env_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backend.json");
        BackendConfig::new().with_tree_id(7).save(&path).unwrap();
        let path = path.to_str().unwrap();

        let no_env = |_: &str| None;
        let cli = Cli::parse_from(["studio-cli", "--config", path, "--api-base", "http://api:9000", "tree"]);
        let config = load_config_with(&cli, no_env).unwrap();
        assert_eq!(config.api_base, "http://api:9000");
        assert_eq!(config.tree_id, 7);

        let env = |key: &str| (key == backend::ENV_TREE_ID).then(|| "9".to_string());
        let cli = Cli::parse_from(["studio-cli", "--config", path, "tree"]);
        assert_eq!(load_config_with(&cli, env).unwrap().tree_id, 9);

        let cli = Cli::parse_from(["studio-cli", "--config", path, "--tree-id", "11", "tree"]);
        assert_eq!(load_config_with(&cli, env).unwrap().tree_id, 11);
    }
}
