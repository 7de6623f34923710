use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use ss1_res::ResourceReader;
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct ExtractArgs {
    /// An input resource file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let f = super::open(&self.file)?;
        let mut res = ResourceReader::new(&f)?;

        for i in 0..res.len() {
            let mut resource = res.by_index(i)?;

            let dir = self.directory.join(format!("{:04x}", resource.id().value()));
            std::fs::create_dir_all(&dir)
                .into_diagnostic()
                .context(format!("creating {}", dir.display()))?;

            for block in 0..resource.block_count() {
                let p = dir.join(format!("{block}.bin"));
                info!("writing {}", p.display());

                let mut out = super::create(&p, self.overwrite)?;
                std::io::copy(&mut resource.block(block)?, &mut out)
                    .into_diagnostic()
                    .context(format!("extracting {}", p.display()))?;
            }
        }
        Ok(())
    }
}
