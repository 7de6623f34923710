use clap::{Args, ValueEnum};
use itertools::Itertools;
use miette::{IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use ss1_res::{ResourceId, ResourceReader};
use std::{
    fmt::Display,
    io::{Read, Seek},
    path::PathBuf,
};
use tracing::info;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Mode {
    /// Compare the content of resources
    #[default]
    Semantic,
    /// Also compare how resources are stored
    Full,
}

#[derive(Debug, Eq, PartialEq)]
enum Change {
    Added(String),
    Removed(String),
    Comparison(String, String, String),
    Modified(String, Vec<Change>),
}

impl Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::Added(v) => {
                writeln!(f, "✅ {}", v.green())
            }
            Change::Removed(v) => {
                writeln!(f, "❌ {}", v.red())
            }
            Change::Comparison(key, old, new) => {
                writeln!(f, "* {}: {} vs {}", key, old.red(), new.green())
            }
            Change::Modified(v, children) => {
                writeln!(f, "🔃 {}", v.blue())?;
                let txt = children.iter().map(|c| format!("{}", c)).join("");
                writeln!(
                    f,
                    "{}",
                    txt.split("\n")
                        .filter(|l| !l.trim().is_empty())
                        .map(|l| "  ".to_string() + l)
                        .join("\n")
                )
            }
        }
    }
}

#[derive(Args)]
pub struct DiffArgs {
    /// An input resource file
    #[arg(short, long, value_name = "FILE")]
    left: PathBuf,

    /// An input resource file
    #[arg(short, long, value_name = "FILE")]
    right: PathBuf,

    /// Comparison mode
    #[arg(short, long, value_enum, default_value_t=Mode::Semantic)]
    mode: Mode,
}

fn compare<T: PartialEq + Display>(changes: &mut Vec<Change>, key: &str, left: T, right: T) {
    if left != right {
        changes.push(Change::Comparison(
            key.into(),
            left.to_string(),
            right.to_string(),
        ));
    }
}

fn read_blocks<R: Read + Seek>(res: &mut ResourceReader<R>, id: ResourceId) -> Result<Vec<Vec<u8>>> {
    let mut resource = res.by_id(id)?;
    (0..resource.block_count())
        .map(|i| -> Result<Vec<u8>> {
            let mut data = Vec::new();
            resource.block(i)?.read_to_end(&mut data).into_diagnostic()?;
            Ok(data)
        })
        .collect()
}

impl DiffArgs {
    fn handle_block(&self, index: usize, left: &[u8], right: &[u8]) -> Option<Change> {
        if left == right {
            return None;
        }

        let mut changes = Vec::new();
        compare(&mut changes, "size", left.len(), right.len());
        if let Some(offset) = left.iter().zip(right).position(|(l, r)| l != r) {
            changes.push(Change::Comparison(
                format!("first difference at {offset:#x}"),
                format!("{:#04x}", left[offset]),
                format!("{:#04x}", right[offset]),
            ));
        }

        Some(Change::Modified(format!("block {index}"), changes))
    }

    fn handle_resource<L: Read + Seek, R: Read + Seek>(
        &self,
        id: ResourceId,
        left: &mut ResourceReader<L>,
        right: &mut ResourceReader<R>,
    ) -> Result<Option<Change>> {
        let mut changes = Vec::new();

        if let (Some(l), Some(r)) = (left.entry(id).copied(), right.entry(id).copied()) {
            compare(&mut changes, "content type", l.content_type(), r.content_type());
            compare(&mut changes, "compound", l.is_compound(), r.is_compound());
            compare(&mut changes, "size", l.unpacked_length(), r.unpacked_length());

            if self.mode == Mode::Full {
                compare(&mut changes, "compressed", l.is_compressed(), r.is_compressed());
                compare(&mut changes, "packed size", l.packed_length(), r.packed_length());
            }
        }

        let blocks_left = read_blocks(left, id)?;
        let blocks_right = read_blocks(right, id)?;
        compare(&mut changes, "blocks", blocks_left.len(), blocks_right.len());

        blocks_left
            .iter()
            .zip(&blocks_right)
            .enumerate()
            .filter_map(|(i, (l, r))| self.handle_block(i, l, r))
            .for_each(|c| changes.push(c));

        Ok((!changes.is_empty()).then(|| Change::Modified(id.to_string(), changes)))
    }

    fn handle_res<L: Read + Seek, R: Read + Seek>(
        &self,
        left: &mut ResourceReader<L>,
        right: &mut ResourceReader<R>,
    ) -> Result<Vec<Change>> {
        let all_ids = left.ids().chain(right.ids()).sorted().dedup().collect::<Vec<_>>();

        let mut result = Vec::new();
        for id in all_ids {
            match (left.entry(id).is_some(), right.entry(id).is_some()) {
                (false, true) => result.push(Change::Added(id.to_string())),
                (true, false) => result.push(Change::Removed(id.to_string())),
                _ => {
                    if let Some(c) = self.handle_resource(id, left, right)? {
                        result.push(c);
                    }
                }
            }
        }

        Ok(result)
    }

    pub fn handle(&self) -> Result<()> {
        let l = super::open(&self.left)?;
        let mut left = ResourceReader::new(&l)?;

        let r = super::open(&self.right)?;
        let mut right = ResourceReader::new(&r)?;

        let differences = self.handle_res(&mut left, &mut right)?;

        if differences.is_empty() {
            info!("no differences found");
        }
        for d in differences {
            print!("{}", d);
        }

        Ok(())
    }
}
