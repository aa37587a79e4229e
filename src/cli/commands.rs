//! Command dispatch.

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::instrument;

use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{self, Settings, LOCAL_CONFIG_NAME};
use crate::emit::{collect_templates, dump_tree, render_templates};
use crate::pipeline::{MineOutput, Miner};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Mine { input }) => mine(cli, input.as_deref()),
        Some(Commands::Tree { input }) => tree(cli, input.as_deref()),
        Some(Commands::Templates { input }) => templates(cli, input.as_deref()),
        Some(Commands::Config { command }) => execute_config_command(cli, command),
        Some(Commands::Completion { shell }) => completion(*shell),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

/// Merge the layered configuration, then apply the command line input
/// override on top.
fn load_settings(cli: &Cli, input: Option<&Path>) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(input) = input {
        settings.input_file = Some(input.to_path_buf());
    }
    Ok(settings)
}

#[instrument(skip_all)]
fn mine(cli: &Cli, input: Option<&Path>) -> CliResult<()> {
    let settings = load_settings(cli, input)?;
    let out = Miner::new(settings).run()?;
    report(&out);
    Ok(())
}

fn report(out: &MineOutput) {
    let summary = &out.summary;
    output::info(&format!(
        "{} lines mined into {} templates ({} nodes, height {})",
        summary.lines_total,
        summary.stats.templates,
        summary.stats.nodes,
        summary.stats.height
    ));
    for line in summary_details(out) {
        output::detail(&line);
    }
    if summary.unmatched_lines > 0 {
        output::warning(&format!(
            "{} of {} lines do not match any template",
            summary.unmatched_lines, summary.lines_total
        ));
    }
    for artifact in &out.artifacts {
        output::action("wrote", &artifact.display());
    }
}

/// Detail lines of the mine summary, one per counter.
fn summary_details(out: &MineOutput) -> Vec<String> {
    let summary = &out.summary;
    let stats = &summary.stats;
    let mut lines = vec![format!(
        "{} clusters, {} lines ending at an optional position",
        summary.clusters, stats.optional_occurrences
    )];
    if stats.shared_subtrees > 0 {
        lines.push(format!("{} shared subtrees", stats.shared_subtrees));
    }
    if !stats.datatype_counts.is_empty() {
        let counts: Vec<String> = stats
            .datatype_counts
            .iter()
            .map(|(datatype, n)| format!("{}={}", datatype.tag(), n))
            .collect();
        lines.push(format!("datatypes: {}", counts.join(" ")));
    }
    lines
}

#[instrument(skip_all)]
fn tree(cli: &Cli, input: Option<&Path>) -> CliResult<()> {
    let settings = load_settings(cli, input)?;
    let mined = Miner::new(settings).mine()?;
    print!("{}", dump_tree(&mined.root));
    Ok(())
}

#[instrument(skip_all)]
fn templates(cli: &Cli, input: Option<&Path>) -> CliResult<()> {
    let settings = load_settings(cli, input)?;
    let mined = Miner::new(settings).mine()?;
    print!("{}", render_templates(&collect_templates(&mined.root)));
    Ok(())
}

fn execute_config_command(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => config_show(cli),
        ConfigCommands::Init { global } => config_init(*global),
        ConfigCommands::Path => config_path(cli),
    }
}

fn config_show(cli: &Cli) -> CliResult<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    output::info(&settings.to_toml()?);
    Ok(())
}

fn config_init(global: bool) -> CliResult<()> {
    let path = if global {
        config::global_config_path().ok_or_else(|| {
            CliError::Usage("cannot determine the global config directory".into())
        })?
    } else {
        PathBuf::from(LOCAL_CONFIG_NAME)
    };
    if path.exists() {
        return Err(CliError::InvalidArgs(format!(
            "{} already exists",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&path, Settings::template())?;
    output::action("created", &path.display());
    Ok(())
}

fn config_path(cli: &Cli) -> CliResult<()> {
    if let Some(global) = config::global_config_path() {
        let marker = if global.exists() { "exists" } else { "missing" };
        output::info(&format!("global: {} ({})", global.display(), marker));
    }
    let local = Path::new(LOCAL_CONFIG_NAME);
    let marker = if local.exists() { "exists" } else { "missing" };
    output::info(&format!("local: ./{} ({})", local.display(), marker));
    if let Some(explicit) = &cli.config {
        output::info(&format!("explicit: {}", explicit.display()));
    }
    Ok(())
}

fn completion(shell: clap_complete::Shell) -> CliResult<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
