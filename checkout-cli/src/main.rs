//! `checkout`: the command-line entry point for the checkout engine.
//! Parses arguments with `clap`'s derive API, assembles the
//! filesystem-backed capabilities and object-store handles, and drives
//! `checkout::run_checkout` to completion.

mod config;
mod fs_capabilities;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use blobstore::{FsBlobstore, ImporterCache, NoRemote};
use checkout::{BlobstoreRepository, CheckoutContext, CheckoutProps, CheckoutTarget};
use clap::Parser;
use lanes::{ActiveLanePointer, LaneStore};
use merge::{Diff3LineMerger, MergeStrategy};
use object_model::ComponentId;
use slog::{o, Drain};
use workspace_index::BitmapStore;

use crate::config::SessionConfig;
use crate::fs_capabilities::{FsWorkspace, NonInteractivePrompter};

/// Switch versions of one or more tracked components.
#[derive(Parser, Debug)]
#[command(name = "checkout", version)]
struct Cli {
    /// `head`, `latest`, `reset`, or a literal version/tag.
    target: String,

    /// Component patterns as `scope/name`, or omit with `--all`.
    patterns: Vec<String>,

    /// Check out every component currently tracked by the workspace.
    #[arg(long)]
    all: bool,

    /// Resolve every conflict by keeping the locally modified content.
    #[arg(long, conflicts_with_all = ["theirs", "manual"])]
    ours: bool,

    /// Resolve every conflict by taking the target version's content.
    #[arg(long, conflicts_with_all = ["ours", "manual"])]
    theirs: bool,

    /// Leave conflict markers on disk for manual resolution.
    #[arg(long, conflicts_with_all = ["ours", "theirs"])]
    manual: bool,

    /// Skip dependency installation after write-back.
    #[arg(long)]
    skip_npm_install: bool,

    /// Only move the active lane's pointer; do not write files to disk.
    #[arg(long)]
    workspace_only: bool,

    #[arg(long)]
    verbose: bool,

    /// Root of the workspace (defaults to the current directory).
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

impl Cli {
    fn target(&self) -> Result<CheckoutTarget> {
        Ok(match self.target.as_str() {
            "head" => CheckoutTarget::Head,
            "latest" => CheckoutTarget::Latest,
            "reset" => CheckoutTarget::Reset,
            other => CheckoutTarget::Literal(other.to_string()),
        })
    }

    fn merge_strategy(&self) -> Option<MergeStrategy> {
        if self.ours {
            Some(MergeStrategy::Ours)
        } else if self.theirs {
            Some(MergeStrategy::Theirs)
        } else if self.manual {
            Some(MergeStrategy::Manual)
        } else {
            None
        }
    }

    fn ids(&self) -> Result<Option<Vec<ComponentId>>> {
        if self.all {
            return Ok(None);
        }
        self.patterns
            .iter()
            .map(|p| parse_component_id(p))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

fn parse_component_id(pattern: &str) -> Result<ComponentId> {
    let (scope, name) = pattern
        .split_once('/')
        .ok_or_else(|| anyhow!("component pattern {pattern:?} must be `scope/name`"))?;
    Ok(ComponentId::new(scope, name))
}

fn build_logger(verbose: bool) -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let min_level = if verbose {
        slog::Level::Debug
    } else {
        slog::Level::Info
    };
    let drain = slog::LevelFilter::new(drain, min_level).fuse();
    slog::Logger::root(drain, o!())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("checkout: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let logger = build_logger(cli.verbose);

    let ids = cli.ids()?;
    let props = CheckoutProps {
        target: cli.target()?,
        ids,
        all: cli.all,
        merge_strategy: cli.merge_strategy(),
        prompt_merge_options: false,
        workspace_only: cli.workspace_only,
        skip_files_write: false,
        version_per_id: Default::default(),
        skip_npm_install: cli.skip_npm_install,
        verbose: cli.verbose,
    };
    props.validate().context("invalid checkout arguments")?;

    let session_config = SessionConfig::load(&cli.root)?;
    let workspace_dependency_versions = session_config.workspace_dependency_versions();

    let objects_root = cli.root.join(".objects");
    let blobstore = FsBlobstore::new(&objects_root);
    let remote = NoRemote;
    let repository = BlobstoreRepository::new(&blobstore);
    let importer_cache = ImporterCache::new();

    let lane_pointer = ActiveLanePointer::new(&cli.root);
    let lane_store = LaneStore::new(&blobstore);
    let active_lane = match lane_pointer.get()? {
        Some(hash) => lane_store.load(hash).await?,
        None => None,
    };

    let bitmap_store = BitmapStore::new(&cli.root);
    let mut bitmap = bitmap_store.load()?;

    let workspace = FsWorkspace::new(&cli.root);
    let prompter = NonInteractivePrompter;
    let line_merger = Diff3LineMerger;

    let ctx = CheckoutContext {
        repository: &repository,
        blobstore: &blobstore,
        remote: &remote,
        importer_cache: Some(&importer_cache),
        active_lane: active_lane.as_ref(),
        current_files: &workspace,
        writer: &workspace,
        remover: &workspace,
        merge_prompter: &prompter,
        line_merger: &line_merger,
        logger: &logger,
        workspace_dependency_versions: &workspace_dependency_versions,
    };

    let report = checkout::run_checkout(&props, &mut bitmap, &ctx).await?;

    bitmap_store.save(&bitmap).context("saving workspace bitmap")?;

    if !report.applied.is_empty() {
        println!("applied: {}", report.applied.len());
    }
    if !report.removed.is_empty() {
        println!("removed: {}", report.removed.len());
    }
    for failure in &report.failed {
        if failure.legitimate {
            println!("skipped {}: {}", failure.id, failure.reason);
        } else {
            eprintln!("failed {}: {}", failure.id, failure.reason);
        }
    }
    if report.left_unresolved_conflicts {
        eprintln!("one or more components were left with unresolved conflicts");
    }
    if !report.new_from_lane.is_empty() {
        println!("new from lane: {}", report.new_from_lane.len());
    }

    Ok(report.exit_code())
}
