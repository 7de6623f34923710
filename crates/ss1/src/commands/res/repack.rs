use clap::{Args, ValueEnum};
use miette::{Context, Result};
use ss1_res::{ResourceReader, ResourceStore};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Compression {
    /// Keep the compression of every resource
    #[default]
    Keep,
    /// Compress every resource
    All,
    /// Store every resource uncompressed
    None,
}

#[derive(Args)]
pub struct RepackArgs {
    /// An input resource file
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// A target resource file
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Compression of the written resources
    #[arg(short, long, value_enum, default_value_t = Compression::Keep)]
    compression: Compression,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl RepackArgs {
    pub fn handle(&self) -> Result<()> {
        // everything is loaded before the output is created, so input and output may be the same
        let mut store = {
            let f = super::open(&self.input)?;
            let mut res = ResourceReader::new(&f)?;
            ResourceStore::from_viewer(&mut res).context("loading resources")?
        };

        if self.compression != Compression::Keep {
            for (_, resource) in store.iter_mut() {
                resource.properties.compressed = self.compression == Compression::All;
            }
        }

        info!(
            "writing {} resources to {}",
            store.len(),
            self.output.display()
        );
        let out = super::create(&self.output, self.overwrite)?;
        ss1_res::write(&out, &mut store).context("writing resource file")?;

        Ok(())
    }
}
