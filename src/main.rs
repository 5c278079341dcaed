//! Minimal CLI front-end: wires the reference `Parser`/`TemplateEngine`
//! collaborators into [`Orchestrator`] and runs one build. The CLI surface
//! itself is deliberately thin — argument parsing and process plumbing only,
//! just enough to exercise the build core end to end.

use anyhow::Result;
use clap::{ColorChoice, Parser, Subcommand};
use crucible::collaborators::{ReferenceParser, ReferenceTemplateEngine};
use crucible::config::StrictMode;
use crucible::{Orchestrator, SiteConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// `crucible` static site build core.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,

    /// Print per-phase timing and cache hit/miss detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the site
    Build {
        /// Site root (containing crucible.toml); defaults to the current directory
        #[arg(value_hint = clap::ValueHint::DirPath)]
        root: Option<PathBuf>,

        /// Reuse the on-disk cache and rebuild only what changed
        #[arg(short, long)]
        incremental: bool,

        /// Abort the build on the first incremental-consistency error
        /// instead of falling back to a full rebuild
        #[arg(long)]
        strict_incremental: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
    crucible::logger::set_verbose(cli.verbose);

    match cli.command {
        Commands::Build { root, incremental, strict_incremental } => {
            let root = root.unwrap_or_else(|| PathBuf::from("."));
            let mut config = SiteConfig::load(&root)?;
            if strict_incremental {
                config.strict_incremental = StrictMode::Error;
            }

            let templates_dir = root.join("templates");
            let template_engine: Arc<dyn crucible::collaborators::TemplateEngine> = Arc::new(ReferenceTemplateEngine::new(templates_dir));
            let parser: Arc<dyn crucible::collaborators::Parser> = Arc::new(ReferenceParser::default());

            let orchestrator = Orchestrator::with_collaborators(root, config, parser, template_engine, incremental);
            let stats = orchestrator.build()?;

            crucible::logger::log(
                "build",
                &format!("{} built, {} cached, {} error(s) in {:?}", stats.pages_built, stats.pages_cached, stats.errors_by_category.values().sum::<usize>(), stats.total_time),
            );
            if cli.verbose {
                for (phase, elapsed) in &stats.phase_times {
                    crucible::logger::log("build", &format!("  {phase}: {elapsed:?}"));
                }
            }
            Ok(())
        }
    }
}
