use anyhow::{anyhow, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use isaac_core::{ContentConfig, ContentManager, ContentVersionController};
use isaac_model::{VersionId, VersionSelector};
use isaac_search::MemorySearchBackend;
use isaac_store::DirectoryVersionStore;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn version_arg() -> Arg {
    Arg::new("version")
        .long("version")
        .short('v')
        .help("Content version (defaults to the newest)")
}

fn cli() -> Command {
    Command::new("isaac-content")
        .version(isaac_core::VERSION)
        .about("Versioned Isaac content: sync, lookup, search and integrity checks")
        .disable_version_flag(true)
        .subcommand_required(true)
        .arg(
            Arg::new("root")
                .long("root")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .default_value(".")
                .help("Directory holding one subdirectory per content version"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(Command::new("versions").about("List versions, newest first"))
        .subcommand(
            Command::new("sync")
                .about("Build cache and search index for a version")
                .arg(version_arg()),
        )
        .subcommand(
            Command::new("get")
                .about("Print one content node as JSON")
                .arg(Arg::new("id").required(true).help("Content id"))
                .arg(version_arg()),
        )
        .subcommand(
            Command::new("search")
                .about("Free-text search")
                .arg(Arg::new("query").required(true).help("Search terms"))
                .arg(version_arg())
                .arg(
                    Arg::new("start")
                        .long("start")
                        .default_value("0")
                        .value_parser(value_parser!(usize))
                        .help("Index of the first result"),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize))
                        .help("Maximum number of results"),
                ),
        )
        .subcommand(
            Command::new("tags")
                .about("List every tag used in a version")
                .arg(version_arg()),
        )
        .subcommand(
            Command::new("validate")
                .about("Check related ids and figure assets")
                .arg(version_arg()),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<ContentConfig> {
    let Some(path) = matches.get_one::<PathBuf>("config") else {
        return Ok(ContentConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    Ok(ContentConfig::from_toml_str(&raw)?)
}

fn build_manager(matches: &ArgMatches) -> anyhow::Result<ContentManager> {
    let root = matches
        .get_one::<PathBuf>("root")
        .ok_or_else(|| anyhow!("--root is required"))?;
    let config = load_config(matches)?;
    let store = Arc::new(DirectoryVersionStore::new(root));
    Ok(ContentManager::with_config(
        store,
        Arc::new(MemorySearchBackend::new()),
        config,
    )?)
}

fn selector(args: &ArgMatches) -> anyhow::Result<VersionSelector> {
    Ok(match args.get_one::<String>("version") {
        Some(raw) => VersionSelector::Pinned(VersionId::new(raw)?),
        None => VersionSelector::Latest,
    })
}

async fn target_version(manager: &ContentManager, args: &ArgMatches) -> anyhow::Result<VersionId> {
    let selector = selector(args)?;
    let version = manager.resolve_selector(&selector).await?;
    if !manager.ensure_cache(&version).await {
        tracing::warn!("Version {} is not fully indexed; search results may be empty", version);
    }
    Ok(version)
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a String> {
    args.get_one::<String>(name)
        .ok_or_else(|| anyhow!("missing argument <{name}>"))
}

/// Run one command; `Ok(false)` means it ran but did not succeed
async fn execute(matches: &ArgMatches, out: &mut impl Write) -> anyhow::Result<bool> {
    let manager = build_manager(matches)?;

    match matches.subcommand() {
        Some(("versions", _)) => {
            for version in manager.list_versions().await? {
                writeln!(out, "{version}")?;
            }
            Ok(true)
        }
        Some(("sync", args)) => {
            let controller = ContentVersionController::new(manager);
            let outcome = controller.trigger_sync(selector(args)?).await?;
            match (&outcome.version, outcome.success) {
                (Some(version), true) => writeln!(out, "{version} READY (job {})", outcome.job.id)?,
                (Some(version), false) => writeln!(
                    out,
                    "{version} {} (job {})",
                    controller.manager().version_state(version).await,
                    outcome.job.id
                )?,
                (None, _) => writeln!(out, "{} not found (job {})", outcome.job.selector, outcome.job.id)?,
            }
            Ok(outcome.success)
        }
        Some(("get", args)) => {
            let id = required(args, "id")?;
            let version = target_version(&manager, args).await?;
            match manager.get_by_id(id, &version).await? {
                Some(node) => {
                    writeln!(out, "{}", serde_json::to_string_pretty(node.as_ref())?)?;
                    Ok(true)
                }
                None => {
                    writeln!(out, "{id} not found in {version}")?;
                    Ok(false)
                }
            }
        }
        Some(("search", args)) => {
            let query = required(args, "query")?;
            let start = args.get_one::<usize>("start").copied().unwrap_or(0);
            let limit = args.get_one::<usize>("limit").copied();
            let version = target_version(&manager, args).await?;
            let page = manager.search_for_content(&version, query, start, limit).await?;
            writeln!(out, "{}", serde_json::to_string_pretty(&page)?)?;
            Ok(true)
        }
        Some(("tags", args)) => {
            let version = target_version(&manager, args).await?;
            for tag in manager.get_tags_list(&version).await? {
                writeln!(out, "{tag}")?;
            }
            Ok(true)
        }
        Some(("validate", args)) => {
            let version = target_version(&manager, args).await?;
            let valid = manager.validate(&version).await;
            let problems = manager.problem_map(&version).await?.unwrap_or_default();
            writeln!(out, "{}", serde_json::to_string_pretty(&problems)?)?;
            writeln!(out, "{version}: {}", if valid { "valid" } else { "INVALID" })?;
            Ok(valid)
        }
        Some((other, _)) => Err(anyhow!("unknown command {other}")),
        None => Err(anyhow!("no command given")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let mut stdout = std::io::stdout().lock();
    let success = execute(&matches, &mut stdout).await?;
    stdout.flush()?;
    std::process::exit(if success { 0 } else { 1 });
}
