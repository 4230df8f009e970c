use anyhow::{Context, Result};
use bindings_support::{
    BundleLayout, ExternalLibrary, LibraryKind, Registry, ShellCommands, XshellRunner,
    all_external_libraries, autogen, config, logging,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

fn project_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .map(PathBuf::from)
        .unwrap_or(manifest_dir)
}

/// Maintenance tasks for the vendored external libraries
#[derive(Parser)]
#[command(name = "xtask")]
struct Cli {
    /// Bundle repository root (default: $IMGUI_BUNDLE_ROOT, then this workspace)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Folder holding the vendored libraries (default: <root>/external)
    #[arg(long, global = true)]
    external_dir: Option<PathBuf>,

    /// Debug-level logs with source locations
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Explicit tracing filter, e.g. "bindings_support=trace"
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every published library's generator, then write the CMake fragment
    Autogenerate {
        /// Only rewrite the CMake fragment
        #[arg(long)]
        skip_generators: bool,
    },
    /// Rewrite the CMake fragment listing the pybind sources
    WriteCmake,
    /// Show the registered libraries
    List,
    /// Update upstream-tracked checkouts to the official branch or tag
    UpdateOfficial(GitArgs),
    /// Rebase fork checkouts on the official branch
    RebaseFork(GitArgs),
    /// Register the official and fork remotes
    AddRemotes(GitArgs),
    /// Remove origin and the configured remotes
    RmRemotes(GitArgs),
}

#[derive(Args)]
struct GitArgs {
    /// Libraries to operate on
    #[arg(required_unless_present = "all")]
    libraries: Vec<String>,

    /// Every git-managed library the operation applies to
    #[arg(long, conflicts_with = "libraries")]
    all: bool,

    /// Print the commands instead of running them
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, Copy)]
enum GitOp {
    UpdateOfficial,
    RebaseFork,
    AddRemotes,
    RmRemotes,
}

impl GitOp {
    fn applies_to(self, lib: &ExternalLibrary) -> bool {
        match (self, lib.kind()) {
            (_, LibraryKind::Local(_)) => false,
            (GitOp::UpdateOfficial, kind) => matches!(kind, LibraryKind::Unforked(_)),
            (GitOp::RebaseFork, kind) => matches!(kind, LibraryKind::Forked(_)),
            (GitOp::AddRemotes | GitOp::RmRemotes, _) => true,
        }
    }

    fn commands(
        self,
        lib: &ExternalLibrary,
        layout: &BundleLayout,
    ) -> bindings_support::BindingsResult<ShellCommands> {
        match self {
            GitOp::UpdateOfficial => lib.build_update_official_commands(layout),
            GitOp::RebaseFork => lib.build_rebase_fork_commands(layout),
            GitOp::AddRemotes => lib.build_add_remotes_commands(layout),
            GitOp::RmRemotes => lib.build_remove_remotes_commands(layout),
        }
    }
}

fn layout_from(cli: &Cli) -> BundleLayout {
    let layout = match &cli.root {
        Some(root) => BundleLayout::new(root),
        None => BundleLayout::from_env_or(&project_root()),
    };
    match &cli.external_dir {
        Some(dir) => layout.with_external_dir(dir),
        None => layout,
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match (&cli.log, cli.verbose) {
        (Some(filter), _) => logging::init_tracing_with_filter(filter),
        (None, true) => logging::init_tracing_dev(),
        (None, false) => logging::init_tracing(),
    }

    let layout = layout_from(&cli);
    let registry = all_external_libraries();
    match &cli.command {
        Command::Autogenerate { skip_generators } => {
            autogenerate(&registry, &layout, *skip_generators)?
        }
        Command::WriteCmake => {
            autogen::write_build_file_fragment(registry.published_libs(), &layout)
                .context("write CMake fragment")?;
        }
        Command::List => list(&registry, &layout),
        Command::UpdateOfficial(args) => git_op(&registry, &layout, GitOp::UpdateOfficial, args)?,
        Command::RebaseFork(args) => git_op(&registry, &layout, GitOp::RebaseFork, args)?,
        Command::AddRemotes(args) => git_op(&registry, &layout, GitOp::AddRemotes, args)?,
        Command::RmRemotes(args) => git_op(&registry, &layout, GitOp::RmRemotes, args)?,
    }
    Ok(())
}

fn autogenerate(registry: &Registry, layout: &BundleLayout, skip_generators: bool) -> Result<()> {
    if !skip_generators {
        let python = config::python_interpreter()?;
        let mut runner = XshellRunner::new()?;
        info!("Running generators with {}", python.display());
        autogen::run_all_generators(registry, layout, &python, &mut runner)
            .context("bindings generation failed")?;
    }
    let path = autogen::write_build_file_fragment(registry.published_libs(), layout)
        .context("write CMake fragment")?;
    eprintln!("Done: {}", path.display());
    Ok(())
}

fn list(registry: &Registry, layout: &BundleLayout) {
    println!("external dir: {}", layout.external_dir().display());
    for lib in registry.libraries() {
        let kind = match lib.kind() {
            LibraryKind::Local(_) => "local",
            LibraryKind::Unforked(_) => "official",
            LibraryKind::Forked(_) => "fork",
        };
        let mut flags = Vec::new();
        if !lib.is_published_in_python() {
            flags.push("unpublished");
        }
        if lib.is_sub_library() {
            flags.push("sub-library");
        }
        println!(
            "{:<24} {:<9} {:<60} {:<14} {} {}",
            lib.name(),
            kind,
            lib.effective_git_url().unwrap_or("-"),
            lib.effective_git_branch().unwrap_or("-"),
            lib.git_folder_relative_path(layout),
            flags.join(",")
        );
    }
}

fn git_op(registry: &Registry, layout: &BundleLayout, op: GitOp, args: &GitArgs) -> Result<()> {
    let libraries: Vec<&ExternalLibrary> = if args.all {
        registry
            .git_managed_libs()
            .filter(|lib| op.applies_to(lib))
            .collect()
    } else {
        args.libraries
            .iter()
            .map(|name| registry.find(name).map(|e| &e.library))
            .collect::<Result<_, _>>()?
    };

    // Build every script first: a precondition failure must stop us before any git command runs.
    let scripts = libraries
        .iter()
        .map(|lib| op.commands(lib, layout).map(|cmds| (*lib, cmds)))
        .collect::<Result<Vec<_>, _>>()?;

    if args.dry_run {
        for (lib, cmds) in &scripts {
            let policy = if cmds.abort_on_error() {
                ""
            } else {
                " (continue on error)"
            };
            println!("# {}{}\n{}\n", lib.name(), policy, cmds.script());
        }
        return Ok(());
    }

    let mut runner = XshellRunner::new()?;
    for (lib, cmds) in &scripts {
        info!("{}", lib.name());
        let report = cmds
            .execute(&mut runner)
            .with_context(|| format!("git commands failed for {}", lib.name()))?;
        for failure in report.failures() {
            warn!(
                "{}: `{}` failed ({:?})",
                lib.name(),
                failure.command,
                failure.status.code()
            );
        }
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("xtask error: {e:?}");
        std::process::exit(1);
    }
}
