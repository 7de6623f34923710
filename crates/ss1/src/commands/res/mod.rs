pub mod diff;
pub mod extract;
pub mod list;
pub mod repack;

use std::{fs::File, path::Path};

use miette::{Context, IntoDiagnostic, Result};

#[derive(clap::Subcommand)]
pub enum ResCommands {
    /// Compare two resource files
    Diff(diff::DiffArgs),
    /// Extract the blocks of a resource file into a directory
    Extract(extract::ExtractArgs),
    /// List the resources of a resource file
    List(list::ListArgs),
    /// Rewrite a resource file, optionally changing its compression
    Repack(repack::RepackArgs),
}

impl ResCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            ResCommands::Diff(diff) => diff.handle(),
            ResCommands::Extract(extract) => extract.handle(),
            ResCommands::List(list) => list.handle(),
            ResCommands::Repack(repack) => repack.handle(),
        }
    }
}

pub(crate) fn open(path: &Path) -> Result<File> {
    File::open(path)
        .into_diagnostic()
        .context(format!("path: {}", path.display()))
}

pub(crate) fn create(path: &Path, overwrite: bool) -> Result<File> {
    if !overwrite {
        File::create_new(path)
            .into_diagnostic()
            .context(format!("creating {}", path.display()))
    } else {
        File::create(path)
            .into_diagnostic()
            .context(format!("creating {}", path.display()))
    }
}
