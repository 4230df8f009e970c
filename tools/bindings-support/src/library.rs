//! Vendored library descriptions
//!
//! An [`ExternalLibrary`] says where a library comes from (its official
//! repository and, optionally, a maintained fork) and where it lives under
//! the bundle's `external/` folder. Everything else is derived from that:
//! paths, the list of pybind sources, and the git scripts used to keep the
//! checkout in sync with upstream.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::debug;

use crate::config::BundleLayout;
use crate::error::{BindingsError, BindingsResult, IoResultExt};
use crate::naming;
use crate::shell::ShellCommands;

pub const PYBIND_PREFIX: &str = "pybind_";
pub const PYBIND_SUFFIX: &str = ".cpp";
pub const GENERATOR_PREFIX: &str = "generate_";
pub const GENERATOR_SUFFIX: &str = ".py";

const FORCE_PUSH_ADVICE: &str =
    "if the rebase did some updates, please force push manually those changes to the fork";

/// The upstream repository of a library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfficialRepo {
    pub git_url: String,
    pub branch: String,
    /// Pinned tag; when set, updates check it out instead of tracking `branch`
    pub tag: Option<String>,
    pub remote_name: String,
}

impl OfficialRepo {
    pub fn new(git_url: impl Into<String>) -> Self {
        Self {
            git_url: git_url.into(),
            branch: "master".to_string(),
            tag: None,
            remote_name: "official".to_string(),
        }
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn remote_name(mut self, remote_name: impl Into<String>) -> Self {
        self.remote_name = remote_name.into();
        self
    }

    /// Tag if pinned, else branch
    pub fn checkout_target(&self) -> &str {
        self.tag.as_deref().unwrap_or(&self.branch)
    }
}

/// A fork carrying bundle-specific patches on top of upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkRepo {
    pub git_url: String,
    pub branch: String,
    pub remote_name: String,
}

impl ForkRepo {
    pub fn new(git_url: impl Into<String>) -> Self {
        Self {
            git_url: git_url.into(),
            branch: "imgui_bundle".to_string(),
            remote_name: "pthom".to_string(),
        }
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn remote_name(mut self, remote_name: impl Into<String>) -> Self {
        self.remote_name = remote_name.into();
        self
    }
}

/// Where a library's sources come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitSource {
    /// Lives inside the bundle repository; no remotes to manage
    Local,
    Official(OfficialRepo),
    Forked { official: OfficialRepo, fork: ForkRepo },
}

/// One vendored library. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalLibrary {
    name: String,
    source: GitSource,
    custom_git_folder: Option<String>,
    is_published_in_python: bool,
    is_sub_library: bool,
}

impl ExternalLibrary {
    fn with_source(name: impl Into<String>, source: GitSource) -> Self {
        Self {
            name: name.into(),
            source,
            custom_git_folder: None,
            is_published_in_python: true,
            is_sub_library: false,
        }
    }

    /// A library developed inside the bundle, without a git remote.
    pub fn local(name: impl Into<String>) -> Self {
        Self::with_source(name, GitSource::Local)
    }

    /// A library tracked straight from upstream.
    pub fn official(name: impl Into<String>, official: OfficialRepo) -> Self {
        Self::with_source(name, GitSource::Official(official))
    }

    /// A library tracked through a fork, rebased on upstream from time to time.
    pub fn forked(name: impl Into<String>, official: OfficialRepo, fork: ForkRepo) -> Self {
        Self::with_source(name, GitSource::Forked { official, fork })
    }

    /// Checkout location relative to the external folder.
    pub fn custom_git_folder(mut self, folder: impl Into<String>) -> Self {
        self.custom_git_folder = Some(folder.into());
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.is_published_in_python = false;
        self
    }

    pub fn sub_library(mut self) -> Self {
        self.is_sub_library = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &GitSource {
        &self.source
    }

    pub fn is_published_in_python(&self) -> bool {
        self.is_published_in_python
    }

    pub fn is_sub_library(&self) -> bool {
        self.is_sub_library
    }

    pub fn is_forked(&self) -> bool {
        matches!(self.source, GitSource::Forked { .. })
    }

    pub fn official_repo(&self) -> Option<&OfficialRepo> {
        match &self.source {
            GitSource::Local => None,
            GitSource::Official(official) | GitSource::Forked { official, .. } => Some(official),
        }
    }

    pub fn fork_repo(&self) -> Option<&ForkRepo> {
        match &self.source {
            GitSource::Forked { fork, .. } => Some(fork),
            _ => None,
        }
    }

    /// Typed view used to pick the git operations that apply.
    pub fn kind(&self) -> LibraryKind<'_> {
        match &self.source {
            GitSource::Local => LibraryKind::Local(self),
            GitSource::Official(official) => LibraryKind::Unforked(UnforkedLibrary {
                library: self,
                official,
            }),
            GitSource::Forked { official, fork } => LibraryKind::Forked(ForkedLibrary {
                library: self,
                official,
                fork,
            }),
        }
    }

    // --- paths ---

    pub fn base_folder_abs_path(&self, layout: &BundleLayout) -> PathBuf {
        layout.external_dir().join(&self.name)
    }

    /// `<external>/<name>/bindings`. Does not touch the filesystem;
    /// see [`ensure_bindings_folder`](Self::ensure_bindings_folder).
    pub fn bindings_folder_abs_path(&self, layout: &BundleLayout) -> PathBuf {
        self.base_folder_abs_path(layout).join("bindings")
    }

    /// Create the bindings folder if it does not exist yet.
    pub fn ensure_bindings_folder(&self, layout: &BundleLayout) -> BindingsResult<PathBuf> {
        let dir = self.bindings_folder_abs_path(layout);
        match fs::create_dir(&dir) {
            Ok(()) => {
                debug!("created {}", dir.display());
                Ok(dir)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(dir),
            Err(e) => Err(BindingsError::filesystem(&dir, e)),
        }
    }

    pub fn bindings_folder_path_from_external(&self) -> String {
        format!("{}/bindings", self.name)
    }

    pub fn git_folder_abs_path(&self, layout: &BundleLayout) -> PathBuf {
        match &self.custom_git_folder {
            Some(folder) => layout.external_dir().join(folder),
            None => self.base_folder_abs_path(layout).join(&self.name),
        }
    }

    /// Checkout location relative to the bundle root, e.g. `external/imgui/imgui`.
    ///
    /// When the external folder lives outside the bundle root, the absolute
    /// path is returned instead.
    pub fn git_folder_relative_path(&self, layout: &BundleLayout) -> String {
        let abs = self.git_folder_abs_path(layout);
        match abs.strip_prefix(layout.repo_root()) {
            Ok(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => abs.to_string_lossy().into_owned(),
        }
    }

    pub fn name_snake_case(&self) -> String {
        naming::library_snake_case(&self.name)
    }

    // --- git source ---

    /// Fork URL if forked, else official URL.
    pub fn effective_git_url(&self) -> Option<&str> {
        match &self.source {
            GitSource::Local => None,
            GitSource::Official(official) => Some(&official.git_url),
            GitSource::Forked { fork, .. } => Some(&fork.git_url),
        }
    }

    /// Fork branch if forked, else official branch.
    pub fn effective_git_branch(&self) -> Option<&str> {
        match &self.source {
            GitSource::Local => None,
            GitSource::Official(official) => Some(&official.branch),
            GitSource::Forked { fork, .. } => Some(&fork.branch),
        }
    }

    // --- bindings folder content ---

    fn bindings_file_names(
        &self,
        layout: &BundleLayout,
        prefix: &str,
        suffix: &str,
    ) -> BindingsResult<Vec<String>> {
        let dir = self.bindings_folder_abs_path(layout);
        let mut names = Vec::new();
        for entry in fs::read_dir(&dir).at_path(&dir)? {
            let entry = entry.at_path(&dir)?;
            // follows symlinks; dangling links are listed like any other name
            if entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if name.starts_with(prefix) && name.ends_with(suffix) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// `pybind_*.cpp` files of the bindings folder, as `<name>/bindings/<file>`,
    /// sorted by file name.
    pub fn list_pybind_source_files(&self, layout: &BundleLayout) -> BindingsResult<Vec<String>> {
        let from_external = self.bindings_folder_path_from_external();
        Ok(self
            .bindings_file_names(layout, PYBIND_PREFIX, PYBIND_SUFFIX)?
            .into_iter()
            .map(|f| format!("{}/{}", from_external, f))
            .collect())
    }

    /// Stem of the single `generate_*.py` script of the bindings folder.
    pub fn generator_script_name(&self, layout: &BundleLayout) -> BindingsResult<String> {
        let scripts = self.bindings_file_names(layout, GENERATOR_PREFIX, GENERATOR_SUFFIX)?;
        match scripts.as_slice() {
            [script] => Ok(script
                .strip_suffix(GENERATOR_SUFFIX)
                .unwrap_or(script)
                .to_string()),
            [] => Err(BindingsError::configuration(format!(
                "no {}*{} script in {}",
                GENERATOR_PREFIX,
                GENERATOR_SUFFIX,
                self.bindings_folder_abs_path(layout).display()
            ))),
            many => Err(BindingsError::configuration(format!(
                "expected one {}*{} script in {}, found {}: {}",
                GENERATOR_PREFIX,
                GENERATOR_SUFFIX,
                self.bindings_folder_abs_path(layout).display(),
                many.len(),
                many.join(", ")
            ))),
        }
    }

    // --- git scripts ---

    fn no_remote(&self, operation: &str) -> BindingsError {
        BindingsError::precondition(&self.name, operation, "library has no git remote")
    }

    /// Bring an upstream-tracked checkout to the latest official branch or pinned tag.
    pub fn build_update_official_commands(
        &self,
        layout: &BundleLayout,
    ) -> BindingsResult<ShellCommands> {
        const OP: &str = "update from official";
        match self.kind() {
            LibraryKind::Unforked(lib) => Ok(lib.update_official_commands(layout)),
            LibraryKind::Forked(_) => Err(BindingsError::precondition(
                &self.name,
                OP,
                "library is a fork, rebase the fork on official changes instead",
            )),
            LibraryKind::Local(_) => Err(self.no_remote(OP)),
        }
    }

    /// Remove `origin` and the configured remotes. Missing remotes are not fatal.
    pub fn build_remove_remotes_commands(
        &self,
        layout: &BundleLayout,
    ) -> BindingsResult<ShellCommands> {
        let official = self
            .official_repo()
            .ok_or_else(|| self.no_remote("remove remotes"))?;
        let mut cmds = ShellCommands::new()
            .continue_on_error()
            .cd(self.git_folder_abs_path(layout))
            .git(["remote", "rm", "origin"])
            .git(["remote", "rm", official.remote_name.as_str()]);
        if let Some(fork) = self.fork_repo() {
            cmds = cmds.git(["remote", "rm", fork.remote_name.as_str()]);
        }
        Ok(cmds)
    }

    /// Register the official (and fork) remotes. Conflicts abort.
    pub fn build_add_remotes_commands(
        &self,
        layout: &BundleLayout,
    ) -> BindingsResult<ShellCommands> {
        let official = self
            .official_repo()
            .ok_or_else(|| self.no_remote("add remotes"))?;
        let mut cmds = ShellCommands::new()
            .cd(self.git_folder_abs_path(layout))
            .git([
                "remote",
                "add",
                official.remote_name.as_str(),
                official.git_url.as_str(),
            ]);
        if let Some(fork) = self.fork_repo() {
            cmds = cmds.git([
                "remote",
                "add",
                fork.remote_name.as_str(),
                fork.git_url.as_str(),
            ]);
        }
        Ok(cmds)
    }

    /// Rebase the fork branch on the official branch.
    pub fn build_rebase_fork_commands(
        &self,
        layout: &BundleLayout,
    ) -> BindingsResult<ShellCommands> {
        const OP: &str = "rebase fork on official changes";
        match self.kind() {
            LibraryKind::Forked(lib) => Ok(lib.rebase_fork_commands(layout)),
            LibraryKind::Unforked(_) => Err(BindingsError::precondition(
                &self.name,
                OP,
                "library has no fork",
            )),
            LibraryKind::Local(_) => Err(self.no_remote(OP)),
        }
    }
}

/// [`ExternalLibrary`] seen through its git source
#[derive(Debug, Clone, Copy)]
pub enum LibraryKind<'a> {
    Local(&'a ExternalLibrary),
    Unforked(UnforkedLibrary<'a>),
    Forked(ForkedLibrary<'a>),
}

/// A library tracked straight from upstream
#[derive(Debug, Clone, Copy)]
pub struct UnforkedLibrary<'a> {
    pub library: &'a ExternalLibrary,
    pub official: &'a OfficialRepo,
}

impl UnforkedLibrary<'_> {
    pub fn update_official_commands(&self, layout: &BundleLayout) -> ShellCommands {
        let official = self.official;
        let cmds = ShellCommands::new()
            .cd(self.library.git_folder_abs_path(layout))
            .git(["fetch", official.remote_name.as_str()])
            .git(["checkout", official.checkout_target()]);
        if official.tag.is_some() {
            return cmds;
        }
        cmds.git([
            "pull",
            "--set-upstream",
            official.remote_name.as_str(),
            official.branch.as_str(),
        ])
    }
}

/// A library tracked through a fork
#[derive(Debug, Clone, Copy)]
pub struct ForkedLibrary<'a> {
    pub library: &'a ExternalLibrary,
    pub official: &'a OfficialRepo,
    pub fork: &'a ForkRepo,
}

impl ForkedLibrary<'_> {
    pub fn rebase_fork_commands(&self, layout: &BundleLayout) -> ShellCommands {
        let (official, fork) = (self.official, self.fork);
        let upstream = format!("{}/{}", official.remote_name, official.branch);
        ShellCommands::new()
            .cd(self.library.git_folder_abs_path(layout))
            .git(["fetch", official.remote_name.as_str()])
            .git(["fetch", fork.remote_name.as_str()])
            .git(["checkout", fork.branch.as_str()])
            .git(["pull", fork.remote_name.as_str(), fork.branch.as_str()])
            .git(["fetch", official.remote_name.as_str()])
            .git(["rebase", upstream.as_str()])
            .git(["status"])
            .echo(FORCE_PUSH_ADVICE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::ShellStep;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn layout() -> BundleLayout {
        BundleLayout::new("/bundle")
    }

    fn implot() -> ExternalLibrary {
        ExternalLibrary::forked(
            "implot",
            OfficialRepo::new("https://github.com/epezent/implot.git"),
            ForkRepo::new("https://github.com/pthom/implot.git"),
        )
    }

    fn knobs() -> ExternalLibrary {
        ExternalLibrary::official(
            "imgui-knobs",
            OfficialRepo::new("https://github.com/altschuler/imgui-knobs.git").branch("main"),
        )
    }

    #[test]
    fn effective_source_without_fork_is_official() {
        let lib = knobs();
        assert_eq!(
            lib.effective_git_url(),
            Some("https://github.com/altschuler/imgui-knobs.git")
        );
        assert_eq!(lib.effective_git_branch(), Some("main"));
        assert!(!lib.is_forked());
    }

    #[test]
    fn effective_source_with_fork_is_fork() {
        let lib = implot();
        assert_eq!(
            lib.effective_git_url(),
            Some("https://github.com/pthom/implot.git")
        );
        assert_eq!(lib.effective_git_branch(), Some("imgui_bundle"));
    }

    #[test]
    fn local_library_has_no_source() {
        let lib = ExternalLibrary::local("immapp");
        assert_eq!(lib.effective_git_url(), None);
        assert_eq!(lib.effective_git_branch(), None);
        assert!(lib.build_add_remotes_commands(&layout()).unwrap_err().is_precondition());
        assert!(lib.build_remove_remotes_commands(&layout()).unwrap_err().is_precondition());
        assert!(lib.build_update_official_commands(&layout()).unwrap_err().is_precondition());
        assert!(lib.build_rebase_fork_commands(&layout()).unwrap_err().is_precondition());
    }

    #[test]
    fn derived_paths() {
        let lib = implot();
        let layout = layout();
        assert_eq!(
            lib.base_folder_abs_path(&layout),
            Path::new("/bundle/external/implot")
        );
        assert_eq!(
            lib.bindings_folder_abs_path(&layout),
            Path::new("/bundle/external/implot/bindings")
        );
        assert_eq!(lib.bindings_folder_path_from_external(), "implot/bindings");
        assert_eq!(
            lib.git_folder_abs_path(&layout),
            Path::new("/bundle/external/implot/implot")
        );
        assert_eq!(lib.git_folder_relative_path(&layout), "external/implot/implot");
    }

    #[test]
    fn relative_git_folder_follows_external_dir() {
        let lib = implot();
        let inside = layout().with_external_dir("/bundle/third_party");
        assert_eq!(
            lib.git_folder_relative_path(&inside),
            "third_party/implot/implot"
        );
        let outside = layout().with_external_dir("/opt/vendored");
        assert_eq!(
            lib.git_folder_relative_path(&outside),
            "/opt/vendored/implot/implot"
        );
    }

    #[test]
    fn custom_git_folder_paths() {
        let lib = ExternalLibrary::official(
            "imgui_tex_inspect",
            OfficialRepo::new("https://github.com/andyborrell/imgui_tex_inspect.git"),
        )
        .custom_git_folder("immvision/imgui_tex_inspect");
        assert_eq!(
            lib.git_folder_abs_path(&layout()),
            Path::new("/bundle/external/immvision/imgui_tex_inspect")
        );
        assert_eq!(
            lib.git_folder_relative_path(&layout()),
            "external/immvision/imgui_tex_inspect"
        );
    }

    #[test]
    fn snake_case_name() {
        let lib = ExternalLibrary::local("ImGuiColorTextEdit");
        assert_eq!(lib.name_snake_case(), "imgui_color_text_edit");
        assert_eq!(knobs().name_snake_case(), "imgui_knobs");
    }

    #[test]
    fn update_official_tracks_branch() {
        let cmds = knobs().build_update_official_commands(&layout()).unwrap();
        assert!(cmds.abort_on_error());
        assert_eq!(
            cmds.steps()[0],
            ShellStep::ChangeDir(PathBuf::from("/bundle/external/imgui-knobs/imgui-knobs"))
        );
        assert_eq!(
            cmds.command_lines(),
            vec![
                "git fetch official",
                "git checkout main",
                "git pull --set-upstream official main",
            ]
        );
    }

    #[test]
    fn update_official_with_pinned_tag_does_not_pull() {
        let lib = ExternalLibrary::official(
            "imgui",
            OfficialRepo::new("https://github.com/ocornut/imgui.git")
                .branch("docking")
                .tag("v1.90.1-docking"),
        );
        let cmds = lib.build_update_official_commands(&layout()).unwrap();
        assert_eq!(
            cmds.command_lines(),
            vec!["git fetch official", "git checkout v1.90.1-docking"]
        );
    }

    #[test]
    fn update_official_refuses_forks() {
        let err = implot()
            .build_update_official_commands(&layout())
            .unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn rebase_requires_fork() {
        let err = knobs().build_rebase_fork_commands(&layout()).unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn rebase_fork_script() {
        let cmds = implot().build_rebase_fork_commands(&layout()).unwrap();
        assert!(cmds.abort_on_error());
        assert_eq!(
            cmds.command_lines(),
            vec![
                "git fetch official",
                "git fetch pthom",
                "git checkout imgui_bundle",
                "git pull pthom imgui_bundle",
                "git fetch official",
                "git rebase official/master",
                "git status",
            ]
        );
        assert_eq!(
            cmds.steps().last(),
            Some(&ShellStep::Echo(FORCE_PUSH_ADVICE.to_string()))
        );
    }

    #[test]
    fn remove_remotes_continues_on_error() {
        let cmds = implot().build_remove_remotes_commands(&layout()).unwrap();
        assert!(!cmds.abort_on_error());
        assert_eq!(
            cmds.command_lines(),
            vec![
                "git remote rm origin",
                "git remote rm official",
                "git remote rm pthom",
            ]
        );
        let cmds = knobs().build_remove_remotes_commands(&layout()).unwrap();
        assert_eq!(cmds.command_lines().len(), 2);
    }

    #[test]
    fn add_remotes_aborts_on_error() {
        let cmds = implot().build_add_remotes_commands(&layout()).unwrap();
        assert!(cmds.abort_on_error());
        assert_eq!(
            cmds.command_lines(),
            vec![
                "git remote add official https://github.com/epezent/implot.git",
                "git remote add pthom https://github.com/pthom/implot.git",
            ]
        );
    }

    #[test]
    fn typed_views_match_source() {
        assert!(matches!(implot().kind(), LibraryKind::Forked(_)));
        assert!(matches!(knobs().kind(), LibraryKind::Unforked(_)));
        assert!(matches!(
            ExternalLibrary::local("immapp").kind(),
            LibraryKind::Local(_)
        ));
    }
}
