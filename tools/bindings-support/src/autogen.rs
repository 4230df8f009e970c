//! Autogeneration driver
//!
//! A single linear batch: run every published library's generator in
//! registry order, then write the CMake fragment listing the pybind sources
//! they produced. Any failure stops the batch.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::cmake;
use crate::config::BundleLayout;
use crate::error::BindingsResult;
use crate::generator::GeneratorContext;
use crate::library::ExternalLibrary;
use crate::registry::Registry;
use crate::shell::CommandRunner;

/// Run the generator of every published library, stopping at the first failure.
pub fn run_all_generators(
    registry: &Registry,
    layout: &BundleLayout,
    python: &Path,
    runner: &mut dyn CommandRunner,
) -> BindingsResult<()> {
    for entry in registry.published() {
        let library = &entry.library;
        let bindings_folder = library.ensure_bindings_folder(layout)?;
        let ctx = GeneratorContext {
            library,
            layout,
            bindings_folder: &bindings_folder,
        };
        entry.generator.run(&ctx, python, runner)?;
    }
    Ok(())
}

/// Pybind sources of `libraries`, library by library, relative to the external folder.
pub fn collect_pybind_files<'a>(
    libraries: impl IntoIterator<Item = &'a ExternalLibrary>,
    layout: &BundleLayout,
) -> BindingsResult<Vec<String>> {
    let mut files = Vec::new();
    for library in libraries {
        library.ensure_bindings_folder(layout)?;
        files.extend(library.list_pybind_source_files(layout)?);
    }
    Ok(files)
}

/// Write the CMake fragment for `libraries`, overwriting the previous one.
pub fn write_build_file_fragment<'a>(
    libraries: impl IntoIterator<Item = &'a ExternalLibrary>,
    layout: &BundleLayout,
) -> BindingsResult<PathBuf> {
    let files = collect_pybind_files(libraries, layout)?;
    let path = layout.cmake_fragment_path();
    cmake::write_fragment(&path, &cmake::render_pybind_files(&files))?;
    info!("wrote {} ({} pybind files)", path.display(), files.len());
    Ok(path)
}

/// Generators first, then the fragment: it lists what they wrote.
pub fn autogenerate_all(
    registry: &Registry,
    layout: &BundleLayout,
    python: &Path,
    runner: &mut dyn CommandRunner,
) -> BindingsResult<PathBuf> {
    run_all_generators(registry, layout, python, runner)?;
    write_build_file_fragment(registry.published_libs(), layout)
}
