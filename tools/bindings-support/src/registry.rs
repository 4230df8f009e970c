//! The libraries vendored by the bundle

use crate::error::{BindingsError, BindingsResult};
use crate::generator::Generator;
use crate::library::{ExternalLibrary, ForkRepo, OfficialRepo};

/// A library together with its generator
#[derive(Debug, Clone)]
pub struct LibraryEntry {
    pub library: ExternalLibrary,
    pub generator: Generator,
}

impl LibraryEntry {
    pub fn script(library: ExternalLibrary) -> Self {
        Self {
            library,
            generator: Generator::Script,
        }
    }
}

/// Ordered set of libraries. Order is the generation order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<LibraryEntry>,
}

impl Registry {
    pub fn new(entries: Vec<LibraryEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    pub fn libraries(&self) -> impl Iterator<Item = &ExternalLibrary> {
        self.entries.iter().map(|e| &e.library)
    }

    /// Entries whose library is published in the Python package
    pub fn published(&self) -> impl Iterator<Item = &LibraryEntry> {
        self.entries
            .iter()
            .filter(|e| e.library.is_published_in_python())
    }

    pub fn published_libs(&self) -> impl Iterator<Item = &ExternalLibrary> {
        self.published().map(|e| &e.library)
    }

    /// Libraries with their own git checkout: a remote, and not nested in a parent library.
    pub fn git_managed_libs(&self) -> impl Iterator<Item = &ExternalLibrary> {
        self.libraries()
            .filter(|lib| lib.official_repo().is_some() && !lib.is_sub_library())
    }

    pub fn find(&self, name: &str) -> BindingsResult<&LibraryEntry> {
        self.entries
            .iter()
            .find(|e| e.library.name() == name)
            .ok_or_else(|| {
                BindingsError::configuration(format!("unknown external library `{}`", name))
            })
    }
}

fn github(owner: &str, repo: &str) -> String {
    format!("https://github.com/{}/{}.git", owner, repo)
}

fn pthom_fork(repo: &str) -> ForkRepo {
    ForkRepo::new(github("pthom", repo))
}

/// Every library vendored under `external/`
pub fn all_external_libraries() -> Registry {
    Registry::new(vec![
        LibraryEntry::script(ExternalLibrary::forked(
            "imgui",
            OfficialRepo::new(github("ocornut", "imgui")).branch("docking"),
            pthom_fork("imgui"),
        )),
        LibraryEntry::script(ExternalLibrary::official(
            "hello_imgui",
            OfficialRepo::new(github("pthom", "hello_imgui")),
        )),
        LibraryEntry::script(ExternalLibrary::forked(
            "implot",
            OfficialRepo::new(github("epezent", "implot")),
            pthom_fork("implot"),
        )),
        LibraryEntry::script(ExternalLibrary::forked(
            "ImGuiColorTextEdit",
            OfficialRepo::new(github("BalazsJako", "ImGuiColorTextEdit")),
            pthom_fork("ImGuiColorTextEdit"),
        )),
        LibraryEntry::script(ExternalLibrary::forked(
            "imgui-node-editor",
            OfficialRepo::new(github("thedmd", "imgui-node-editor")).branch("develop"),
            pthom_fork("imgui-node-editor"),
        )),
        LibraryEntry::script(ExternalLibrary::official(
            "imgui-knobs",
            OfficialRepo::new(github("altschuler", "imgui-knobs")).branch("main"),
        )),
        LibraryEntry::script(ExternalLibrary::official(
            "imspinner",
            OfficialRepo::new(github("dalerank", "imspinner")),
        )),
        LibraryEntry::script(ExternalLibrary::official(
            "imgui_toggle",
            OfficialRepo::new(github("cmdwtf", "imgui_toggle")).branch("main"),
        )),
        LibraryEntry::script(ExternalLibrary::forked(
            "ImGuizmo",
            OfficialRepo::new(github("CedricGuillemet", "ImGuizmo")),
            pthom_fork("ImGuizmo"),
        )),
        LibraryEntry::script(ExternalLibrary::official(
            "ImCoolBar",
            OfficialRepo::new(github("aiekick", "ImCoolBar")),
        )),
        LibraryEntry::script(ExternalLibrary::local("immvision")),
        LibraryEntry::script(
            ExternalLibrary::official(
                "imgui_tex_inspect",
                OfficialRepo::new(github("andyborrell", "imgui_tex_inspect")).branch("main"),
            )
            .custom_git_folder("immvision/imgui_tex_inspect")
            .sub_library()
            .unpublished(),
        ),
        LibraryEntry::script(ExternalLibrary::forked(
            "imgui_md",
            OfficialRepo::new(github("mekhontsev", "imgui_md")).branch("main"),
            pthom_fork("imgui_md"),
        )),
        LibraryEntry::script(
            ExternalLibrary::official(
                "portable_file_dialogs",
                OfficialRepo::new(github("samhocevar", "portable-file-dialogs")).branch("main"),
            )
            .custom_git_folder("portable_file_dialogs/portable-file-dialogs"),
        ),
        LibraryEntry::script(ExternalLibrary::local("immapp")),
    ])
}
