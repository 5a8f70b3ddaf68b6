use log::{error, info};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::InspireError;

/// Summary of what the writer did with the resolved entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub requested: usize,
    pub matched: usize,
    pub appended_to: Option<PathBuf>,
}

/// Concatenate BibTeX bodies into a single blob.
pub fn join_entries(entries: &[String]) -> String {
    entries.join("\n")
}

/// Decide whether entries may be appended to `target`.
fn append_target(target: Option<&Path>, append: bool) -> Option<&Path> {
    let Some(path) = target else {
        info!("No .bib file to update!");
        return None;
    };
    if !path.exists() {
        error!("File {} not found.", path.display());
        return None;
    }
    append.then_some(path)
}

/// Print the resolved entries or append them to an existing bibliography.
///
/// Counts are always written to `out`. Append mode is dropped when there is
/// no target or the target does not exist, and nothing is appended when no
/// entries were resolved; in both cases the blob goes to `out` instead.
pub fn write_bibliography<W: Write>(
    requested: usize,
    entries: &[String],
    target: Option<&Path>,
    append: bool,
    out: &mut W,
) -> Result<WriteReport, InspireError> {
    let blob = join_entries(entries);
    let target = append_target(target, append);

    writeln!(out, "Missing bibliographic entries: {}", requested)?;
    writeln!(out, "Matched on InspireHEP: {}", entries.len())?;

    let appended_to = match target {
        Some(path) if !entries.is_empty() => {
            let mut file = OpenOptions::new().append(true).open(path)?;
            file.write_all(b"\n")?;
            file.write_all(blob.as_bytes())?;
            writeln!(out, "Entries added in {}: {}", path.display(), entries.len())?;
            Some(path.to_path_buf())
        }
        _ => {
            writeln!(out, "{}", blob)?;
            None
        }
    };

    Ok(WriteReport {
        requested,
        matched: entries.len(),
        appended_to,
    })
}
