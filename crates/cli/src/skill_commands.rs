//! Handlers for the skill lifecycle commands.

use std::path::PathBuf;

use {
    anyhow::{Result, bail},
    skm_config::SkmConfig,
    skm_skills::{
        Candidate, DeployRequest, DeployStrategy, JsonRegistryStore, RegistryStore, SkillManager,
        acquire::{self, GitFetcher},
        author::{self, LOCAL_SOURCE},
        lifecycle::RemovalOutcome,
    },
    tracing::warn,
};

use crate::{
    prompt,
    target::{self, Bases, TargetArgs},
};

pub type Manager = SkillManager<JsonRegistryStore>;

/// Selection and placement flags shared by `install` and `link`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct LinkArgs {
    /// Deploy only this skill (repeatable).
    #[arg(long = "skill", short = 's')]
    pub skills: Vec<String>,
    /// Deploy every skill of the source.
    #[arg(long, conflicts_with = "skills")]
    pub all: bool,
    #[command(flatten)]
    pub target: TargetArgs,
    /// copy (independent snapshot) or link (symbolic link to the source).
    #[arg(long)]
    pub mode: Option<DeployStrategy>,
    /// Create a missing target directory without asking.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

// ── install ─────────────────────────────────────────────────────────────────

pub async fn handle_install(
    manager: &mut Manager,
    config: &SkmConfig,
    url: &str,
    name: Option<&str>,
    no_link: bool,
    link: &LinkArgs,
) -> Result<()> {
    let fetcher = GitFetcher::detect()?;
    println!("Cloning {url}...");
    let name = acquire::acquire_source(manager, &fetcher, url, name).await?;
    println!(
        "✓ Installed '{name}' into {}",
        manager.source_path(&name).display()
    );

    if no_link {
        println!("Deploy it later with: skm link {name}");
        return Ok(());
    }
    link_source(manager, config, &name, link)
}

// ── link ────────────────────────────────────────────────────────────────────

pub fn handle_link(
    manager: &mut Manager,
    config: &SkmConfig,
    name: Option<&str>,
    link: &LinkArgs,
) -> Result<()> {
    let name = match name {
        Some(name) => name.to_string(),
        None => {
            let names: Vec<String> = manager.list_sources().keys().cloned().collect();
            if names.is_empty() {
                println!("No sources installed. Use `skm install` first.");
                return Ok(());
            }
            prompt::ensure_interactive("pass the source name")?;
            let picked = prompt::choose_one("Select a source to deploy from:", &names, 0)?;
            names[picked].clone()
        },
    };
    link_source(manager, config, &name, link)
}

fn link_source(manager: &mut Manager, config: &SkmConfig, name: &str, link: &LinkArgs) -> Result<()> {
    let candidates = manager.discover_candidates(name)?;
    let selected = select_candidates(name, candidates, link)?;
    if selected.is_empty() {
        println!("No skills selected.");
        return Ok(());
    }

    let bases = Bases::current()?;
    let target_parent = match target::resolve_from_flags(&link.target, config, &bases)? {
        Some(path) => path,
        None => target::prompt_target(config, &bases)?,
    };
    target::check_target_is_dir(&target_parent)?;
    println!("Target: {}", target_parent.display());

    let create_target_root = if target_parent.is_dir() || link.yes {
        true
    } else {
        prompt::ensure_interactive("pass --yes to create the target directory")?;
        prompt::prompt_yes_no(
            &format!(
                "Directory {} does not exist. Create it?",
                target_parent.display()
            ),
            true,
        )?
    };
    if !create_target_root {
        println!("Aborted.");
        return Ok(());
    }

    let strategy = target::resolve_mode(link.mode, config)?;
    let report = manager.deploy(DeployRequest {
        source: name.to_string(),
        candidates: selected,
        target_parent,
        strategy,
        create_target_root,
    })?;

    for item in &report.items {
        match &item.result {
            Ok(()) => println!(
                "✓ {} {} -> {}",
                match strategy {
                    DeployStrategy::Copy => "Copied",
                    DeployStrategy::Link => "Linked",
                },
                item.candidate.display_name,
                item.target_path.display()
            ),
            Err(e) => eprintln!("✗ Failed to deploy {}: {e}", item.candidate.display_name),
        }
        if let Some(e) = &item.persist_error {
            eprintln!("  warning: deployment not recorded: {e}");
        }
    }

    if report.failed() > 0 {
        bail!(
            "{} of {} skills failed to deploy",
            report.failed(),
            report.items.len()
        );
    }
    Ok(())
}

fn select_candidates(
    source: &str,
    candidates: Vec<Candidate>,
    link: &LinkArgs,
) -> Result<Vec<Candidate>> {
    if let [only] = candidates.as_slice()
        && only.is_whole_source()
    {
        println!("No sub-skills found in '{source}'. Deploying the entire source.");
        return Ok(candidates);
    }
    if link.all {
        return Ok(candidates);
    }
    if !link.skills.is_empty() {
        let unknown: Vec<_> = link
            .skills
            .iter()
            .filter(|s| !candidates.iter().any(|c| &c.display_name == *s))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            let available: Vec<_> = candidates.iter().map(|c| c.display_name.as_str()).collect();
            bail!(
                "unknown skill(s) {} in '{source}' (available: {})",
                unknown.join(", "),
                available.join(", ")
            );
        }
        return Ok(candidates
            .into_iter()
            .filter(|c| link.skills.contains(&c.display_name))
            .collect());
    }

    prompt::ensure_interactive("pass --skill or --all")?;
    let labels: Vec<String> = candidates
        .iter()
        .map(|c| match &c.description {
            Some(desc) => format!("{} - {desc}", c.display_name),
            None => c.display_name.clone(),
        })
        .collect();
    let picked = prompt::choose_many("Select skills to deploy:", &labels)?;
    Ok(candidates
        .into_iter()
        .enumerate()
        .filter(|(i, _)| picked.contains(i))
        .map(|(_, c)| c)
        .collect())
}

// ── list ────────────────────────────────────────────────────────────────────

pub fn handle_list(manager: &Manager, json: bool) -> Result<()> {
    let sources = manager.list_sources();
    if json {
        println!("{}", serde_json::to_string_pretty(sources)?);
        return Ok(());
    }
    if sources.is_empty() {
        println!("No skills installed.");
        return Ok(());
    }

    println!("Installed sources:");
    for (name, entry) in sources {
        println!("\n{name}");
        println!("  Source:    {}", entry.origin);
        println!(
            "  Installed: {}",
            entry.registered_at.format("%Y-%m-%d %H:%M UTC")
        );
        if entry.instances.is_empty() {
            println!("  Deployed:  (none)");
            continue;
        }
        println!("  Deployed:");
        for instance in &entry.instances {
            println!(
                "    - {} ({})",
                instance.target_path.display(),
                instance.mode
            );
        }
    }
    Ok(())
}

// ── remove ──────────────────────────────────────────────────────────────────

pub fn handle_remove(
    manager: &mut Manager,
    name: &str,
    instances: &[PathBuf],
    yes: bool,
) -> Result<()> {
    let entry = manager.get_source(name)?.clone();

    if !instances.is_empty() {
        let outcomes = manager.remove_instances(name, instances)?;
        return report_instance_removals(&outcomes);
    }

    if !entry.instances.is_empty() && !yes {
        prompt::ensure_interactive("pass --instance or --yes")?;
        let actions = [
            "Remove selected deployed copies".to_string(),
            "Remove the entire source (repository and ALL deployed copies)".to_string(),
        ];
        if prompt::choose_one(&format!("Manage '{name}':"), &actions, 0)? == 0 {
            let labels: Vec<String> = entry
                .instances
                .iter()
                .map(|i| {
                    if i.source_sub_path.is_empty() {
                        i.target_path.display().to_string()
                    } else {
                        format!("[{}] {}", i.source_sub_path, i.target_path.display())
                    }
                })
                .collect();
            let picked = prompt::choose_many("Select copies to remove:", &labels)?;
            if picked.is_empty() {
                println!("No copies selected.");
                return Ok(());
            }
            let targets: Vec<PathBuf> = picked
                .into_iter()
                .map(|i| entry.instances[i].target_path.clone())
                .collect();
            let outcomes = manager.remove_instances(name, &targets)?;
            return report_instance_removals(&outcomes);
        }
    }

    if !yes {
        prompt::ensure_interactive("pass --yes to confirm")?;
        if !prompt::prompt_yes_no(
            &format!("Are you sure you want to completely remove '{name}'?"),
            false,
        )? {
            println!("Aborted.");
            return Ok(());
        }
    }

    let report = manager.remove_source(name)?;
    for outcome in &report.instances {
        if let Err(e) = &outcome.result {
            eprintln!("✗ Could not remove {}: {e}", outcome.target_path.display());
        }
    }
    match &report.source_dir_result {
        Ok(_) => println!("Removed source files at {}", report.source_dir.display()),
        Err(e) => eprintln!("✗ Could not remove source files: {e}"),
    }
    if let Err(e) = &report.unregister_result {
        eprintln!("  warning: {e}");
    }
    println!("✓ Removed '{name}'.");

    if report.failures() > 0 {
        bail!("{} removal step(s) failed for '{name}'", report.failures());
    }
    Ok(())
}

fn report_instance_removals(outcomes: &[RemovalOutcome]) -> Result<()> {
    let mut failed = 0;
    for outcome in outcomes {
        match &outcome.result {
            Ok(_) => println!("Removed {}", outcome.target_path.display()),
            Err(e) => {
                failed += 1;
                eprintln!("✗ Could not remove {}: {e}", outcome.target_path.display());
            },
        }
        if let Some(e) = &outcome.persist_error {
            eprintln!("  warning: removal not recorded: {e}");
        }
    }
    if failed > 0 {
        bail!("{failed} of {} removals failed", outcomes.len());
    }
    println!("✓ Removed {} copies.", outcomes.len());
    Ok(())
}

// ── update ──────────────────────────────────────────────────────────────────

pub async fn handle_update(manager: &Manager, name: Option<&str>) -> Result<()> {
    let names: Vec<String> = match name {
        Some(name) => {
            manager.get_source(name)?;
            vec![name.to_string()]
        },
        None => manager.list_sources().keys().cloned().collect(),
    };
    if names.is_empty() {
        println!("No skills installed.");
        return Ok(());
    }

    let fetcher = if names.iter().any(|n| acquire::is_refreshable(manager, n)) {
        GitFetcher::detect()?
    } else {
        GitFetcher::with_program("git")
    };

    let mut failed = 0;
    for name in &names {
        println!("Updating {name}...");
        let report = match acquire::refresh_source(manager, &fetcher, name).await {
            Ok(report) => report,
            Err(e) => {
                failed += 1;
                eprintln!("✗ Failed to update {name}: {e}");
                continue;
            },
        };
        if !report.refreshed {
            println!("  skipped pull (local or not a git checkout)");
        }
        for outcome in &report.resynced {
            match &outcome.result {
                Ok(()) => println!("  re-copied {}", outcome.target_path.display()),
                Err(e) => {
                    failed += 1;
                    eprintln!("  ✗ {}: {e}", outcome.target_path.display());
                },
            }
        }
    }

    if failed > 0 {
        bail!("{failed} update step(s) failed");
    }
    println!("✓ All updates complete.");
    Ok(())
}

// ── create ──────────────────────────────────────────────────────────────────

pub fn handle_create(manager: &mut Manager, name: Option<&str>, no_open: bool) -> Result<()> {
    let name = match name {
        Some(name) => name.to_string(),
        None => {
            prompt::ensure_interactive("pass the skill name")?;
            prompt::prompt_required("Name of the new skill", None)?
        },
    };

    let dir = author::create_local_skill(manager, &name)?;
    println!("✓ Skill '{name}' created in '{LOCAL_SOURCE}'");
    println!("Location: {}", dir.display());

    if !no_open && let Err(e) = open::that(&dir) {
        warn!(path = %dir.display(), error = %e, "could not open skill folder");
    }

    println!("\nTo deploy this skill:\n  skm link {LOCAL_SOURCE} --skill {name}");
    println!(
        "\nTo manage version control:\n  cd {} && git init",
        manager.source_path(LOCAL_SOURCE).display()
    );
    Ok(())
}

// ── config ──────────────────────────────────────────────────────────────────

pub fn handle_config(manager: &Manager) -> Result<()> {
    let store = manager.store();
    println!("Data dir:      {}", skm_config::data_dir().display());
    println!("Registry:      {}", store.path().display());
    println!("Skills root:   {}", store.skills_root().display());
    println!(
        "Settings file: {}",
        skm_config::find_or_default_config_path().display()
    );
    println!("Sources:       {}", store.list().len());
    println!("{}", serde_json::to_string_pretty(store.document())?);
    Ok(())
}
