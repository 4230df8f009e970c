//! CMake fragment listing the pybind sources

use std::fs;
use std::path::Path;

use crate::error::{BindingsResult, IoResultExt};

/// Variable every entry is rooted at
pub const EXTERNAL_DIR_TOKEN: &str = "${external_dir}";

const FILELIST_PLACEHOLDER: &str = "_FILELIST_";

const TEMPLATE: &str = "#
# autogenerated file! See `cargo xtask autogenerate`
#

set(external_dir ${IMGUIBUNDLE_PATH}/external)

set(all_pybind_files
_FILELIST_
    )
    ";

/// Render the fragment for sources given relative to the external folder.
pub fn render_pybind_files(files: &[String]) -> String {
    let filelist = files
        .iter()
        .map(|f| format!("    {}/{}", EXTERNAL_DIR_TOKEN, f))
        .collect::<Vec<_>>()
        .join("\n");
    TEMPLATE.replace(FILELIST_PLACEHOLDER, &filelist)
}

/// Write `content` to `path`, replacing whatever is there.
pub fn write_fragment(path: &Path, content: &str) -> BindingsResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).at_path(parent)?;
    }
    fs::write(path, content).at_path(path)
}
