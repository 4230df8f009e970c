//! Per-library binding generators
//!
//! Each registered library declares its generator up front: either the
//! Python script shipped in its bindings folder, or a Rust function.

use std::fmt;
use std::path::Path;

use tracing::info;

use crate::config::BundleLayout;
use crate::error::BindingsResult;
use crate::library::{ExternalLibrary, GENERATOR_SUFFIX};
use crate::shell::{CommandRunner, ShellCommands};

/// What a generator gets to work with
pub struct GeneratorContext<'a> {
    pub library: &'a ExternalLibrary,
    pub layout: &'a BundleLayout,
    /// Already exists when the generator runs
    pub bindings_folder: &'a Path,
}

/// A generator implemented in Rust. Effects go to the filesystem.
pub type NativeGenerator = fn(&GeneratorContext<'_>) -> BindingsResult<()>;

#[derive(Clone, Copy)]
pub enum Generator {
    /// Import the library's unique `generate_*.py` with the configured
    /// interpreter and call its `main()`
    Script,
    Native(NativeGenerator),
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generator::Script => f.write_str("Script"),
            Generator::Native(_) => f.write_str("Native(..)"),
        }
    }
}

impl Generator {
    /// Run the generator for `ctx.library`; the first failure is returned as is.
    pub fn run(
        &self,
        ctx: &GeneratorContext<'_>,
        python: &Path,
        runner: &mut dyn CommandRunner,
    ) -> BindingsResult<()> {
        match self {
            Generator::Script => {
                let script = ctx.library.generator_script_name(ctx.layout)?;
                info!("{}: running {}{}", ctx.library.name(), script, GENERATOR_SUFFIX);
                let code =
                    script_entry_point(ctx.layout.external_dir(), ctx.bindings_folder, &script);
                ShellCommands::new()
                    .cd(ctx.bindings_folder)
                    .run(python.to_string_lossy(), ["-c".to_string(), code])
                    .execute(runner)?;
                Ok(())
            }
            Generator::Native(generate) => {
                info!("{}: running native generator", ctx.library.name());
                generate(ctx)
            }
        }
    }
}

/// Python one-liner importing `module` and calling its `main()`.
///
/// The external folder goes first on `sys.path` so generators can import the
/// shared `bindings_generation` package, then the bindings folder holding the
/// script itself.
pub(crate) fn script_entry_point(
    external_dir: &Path,
    bindings_folder: &Path,
    module: &str,
) -> String {
    format!(
        "import importlib, sys; sys.path[:0] = [{}, {}]; importlib.import_module({}).main()",
        python_str(&external_dir.to_string_lossy()),
        python_str(&bindings_folder.to_string_lossy()),
        python_str(module),
    )
}

fn python_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
