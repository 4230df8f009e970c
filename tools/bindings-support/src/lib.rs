//! Maintenance tooling for the libraries vendored by imgui-bundle
//!
//! - [`ExternalLibrary`]: one vendored library, its paths and git scripts
//! - [`registry`]: the bundle's library list and their generators
//! - [`autogen`]: runs the generators and writes the CMake fragment
//! - [`ShellCommands`]: command sequences run through a [`CommandRunner`]
//!
//! ```no_run
//! use bindings_support::{BundleLayout, XshellRunner, all_external_libraries, autogen, config};
//!
//! # fn main() -> bindings_support::BindingsResult<()> {
//! let layout = BundleLayout::new("/path/to/imgui_bundle");
//! let python = config::python_interpreter()?;
//! let mut runner = XshellRunner::new()?;
//! autogen::autogenerate_all(&all_external_libraries(), &layout, &python, &mut runner)?;
//! # Ok(())
//! # }
//! ```

pub mod autogen;
pub mod cmake;
pub mod config;
pub mod error;
pub mod generator;
pub mod library;
pub mod logging;
pub mod naming;
pub mod registry;
pub mod shell;

pub use config::BundleLayout;
pub use error::{BindingsError, BindingsResult};
pub use generator::{Generator, GeneratorContext, NativeGenerator};
pub use library::{
    ExternalLibrary, ForkRepo, ForkedLibrary, GitSource, LibraryKind, OfficialRepo,
    UnforkedLibrary,
};
pub use registry::{LibraryEntry, Registry, all_external_libraries};
pub use shell::{CommandRunner, CommandStatus, RunReport, ShellCommands, ShellStep, XshellRunner};
