use clap::Args;
use itertools::Itertools;
use miette::Result;
use owo_colors::OwoColorize;
use ss1_res::{ResourceFlags, ResourceReader};
use std::path::PathBuf;

#[derive(Args)]
pub struct ListArgs {
    /// An input resource file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

fn describe_flags(flags: ResourceFlags) -> String {
    let names = flags
        .iter_names()
        .map(|(name, _)| name.to_lowercase())
        .join(",");
    if names.is_empty() {
        "-".into()
    } else {
        names
    }
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let f = super::open(&self.file)?;
        let mut res = ResourceReader::new(&f)?;

        println!(
            "{}",
            format!(
                "{:<8} {:<6} {:<20} {:>6} {:>10} {:>10}",
                "id", "type", "flags", "blocks", "unpacked", "packed"
            )
            .bold()
        );

        for i in 0..res.len() {
            let resource = res.by_index(i)?;
            println!(
                "{:<8} {:<6} {:<20} {:>6} {:>10} {:>10}",
                resource.id().to_string(),
                resource.content_type().to_string(),
                describe_flags(resource.flags()),
                resource.block_count(),
                resource.size(),
                resource.compressed_size(),
            );
        }

        println!(
            "{} resources, {} bytes unpacked",
            res.len(),
            res.unpacked_size()
        );

        Ok(())
    }
}
