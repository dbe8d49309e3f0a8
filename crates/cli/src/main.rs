mod prompt;
mod skill_commands;
mod target;

use {
    clap::{Parser, Subcommand},
    skm_skills::JsonRegistryStore,
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::skill_commands::{LinkArgs, Manager};

#[derive(Parser)]
#[command(
    name = "skm",
    version,
    about = "Install agent skills from git and deploy them into coding assistants"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom config directory (holds skm.toml).
    #[arg(long, global = true, env = "SKM_CONFIG_DIR")]
    config_dir: Option<std::path::PathBuf>,
    /// Custom data directory (default ~/.skills-manager).
    #[arg(long, global = true, env = "SKM_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone a skill repository and deploy skills from it.
    #[command(visible_alias = "i")]
    Install {
        /// Git URL of the repository.
        url: String,
        /// Name to register it under (default: repository name).
        name: Option<String>,
        /// Only clone and register; deploy later with `skm link`.
        #[arg(long)]
        no_link: bool,
        #[command(flatten)]
        link: LinkArgs,
    },
    /// Deploy skills from an installed source.
    Link {
        /// Source name (prompted when omitted).
        name: Option<String>,
        #[command(flatten)]
        link: LinkArgs,
    },
    /// List installed sources and their deployed copies.
    #[command(visible_alias = "ls")]
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Remove deployed copies or a whole source.
    #[command(visible_aliases = ["rm", "uninstall"])]
    Remove {
        /// Source name.
        name: String,
        /// Remove only this deployed copy (repeatable).
        #[arg(long = "instance")]
        instances: Vec<std::path::PathBuf>,
        /// Skip confirmation prompts.
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Pull git sources and refresh deployed copies.
    Update {
        /// Only update this source.
        name: Option<String>,
    },
    /// Create a new local skill.
    Create {
        /// Skill name (prompted when omitted).
        name: Option<String>,
        /// Do not open the new skill folder.
        #[arg(long)]
        no_open: bool,
    },
    /// Show paths and the registry contents.
    Config,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn open_manager() -> anyhow::Result<Manager> {
    let store = JsonRegistryStore::open_default()?;
    if let Some(warning) = store.load_warning() {
        eprintln!("warning: {warning}; starting with an empty registry");
    }
    Ok(Manager::new(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    debug!(version = env!("CARGO_PKG_VERSION"), "skm starting");

    // Apply directory overrides before loading anything
    if let Some(ref dir) = cli.config_dir {
        skm_config::set_config_dir(dir.clone());
    }
    if let Some(ref dir) = cli.data_dir {
        skm_config::set_data_dir(dir.clone());
    }

    let config = skm_config::discover_and_load();
    let mut manager = open_manager()?;

    match cli.command {
        Commands::Install {
            url,
            name,
            no_link,
            link,
        } => {
            skill_commands::handle_install(
                &mut manager,
                &config,
                &url,
                name.as_deref(),
                no_link,
                &link,
            )
            .await
        },
        Commands::Link { name, link } => {
            skill_commands::handle_link(&mut manager, &config, name.as_deref(), &link)
        },
        Commands::List { json } => skill_commands::handle_list(&manager, json),
        Commands::Remove {
            name,
            instances,
            yes,
        } => skill_commands::handle_remove(&mut manager, &name, &instances, yes),
        Commands::Update { name } => skill_commands::handle_update(&manager, name.as_deref()).await,
        Commands::Create { name, no_open } => {
            skill_commands::handle_create(&mut manager, name.as_deref(), no_open)
        },
        Commands::Config => skill_commands::handle_config(&manager),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, clap::CommandFactory, skm_skills::DeployStrategy};

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn link_flags_parse() {
        let cli = Cli::try_parse_from([
            "skm", "link", "alpha", "--skill", "one", "-s", "two", "--tool", "claude", "--scope",
            "project", "--mode", "symlink", "--yes",
        ])
        .unwrap();
        let Commands::Link { name, link } = cli.command else {
            panic!("expected link");
        };
        assert_eq!(name.as_deref(), Some("alpha"));
        assert_eq!(link.skills, vec!["one", "two"]);
        assert_eq!(link.target.tool.as_deref(), Some("claude"));
        assert_eq!(link.target.scope, Some(skm_skills::Scope::Project));
        assert_eq!(link.mode, Some(DeployStrategy::Link));
        assert!(link.yes);
    }

    #[test]
    fn target_conflicts_with_tool() {
        let err = Cli::try_parse_from([
            "skm", "link", "alpha", "--target", "/tmp/x", "--tool", "claude",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn aliases_resolve() {
        assert!(matches!(
            Cli::try_parse_from(["skm", "rm", "alpha", "--instance", "/tmp/a"])
                .unwrap()
                .command,
            Commands::Remove { .. }
        ));
        assert!(matches!(
            Cli::try_parse_from(["skm", "ls", "--json"]).unwrap().command,
            Commands::List { json: true }
        ));
        assert!(matches!(
            Cli::try_parse_from(["skm", "i", "https://example.com/a.git", "--no-link"])
                .unwrap()
                .command,
            Commands::Install { no_link: true, .. }
        ));
    }
}
