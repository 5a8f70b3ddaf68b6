use log::{debug, error, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::InspireError;
use crate::latex::{
    collect_keys, Blacklist, AUX_CITATION_REGEX, BLG_DATABASE_FILE_REGEX, BLG_MISSING_ENTRY_REGEX,
};

/// Keys reported missing by bibtex/biber, along with the database it searched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlgScan {
    pub keys: Vec<String>,
    pub bibfile: Option<PathBuf>,
}

/// Read a build log, failing with `MissingInputFile` when it does not exist.
fn read_log(path: &Path) -> Result<String, InspireError> {
    if !path.exists() {
        return Err(InspireError::MissingInputFile(path.to_path_buf()));
    }
    // Stray Latin-1 bytes on unrelated lines must not hide the citations.
    Ok(String::from_utf8_lossy(&fs::read(path)?).into_owned())
}

/// Extract TeX keys from the contents of an .aux file.
pub fn parse_aux(content: &str, blacklist: &Blacklist) -> Vec<String> {
    let payloads = content.lines().filter_map(|line| {
        let captures = AUX_CITATION_REGEX.captures(line);
        if captures.is_none() && (line.starts_with("\\citation") || line.starts_with("\\abx@aux@cite")) {
            debug!("Ignoring malformed citation line: {}", line);
        }
        captures.and_then(|c| c.name("keys")).map(|m| m.as_str())
    });
    collect_keys(payloads, blacklist)
}

/// Extract missing TeX keys and the first database file from the contents of a .blg file.
pub fn parse_blg(content: &str, blacklist: &Blacklist) -> BlgScan {
    let payloads = content.lines().filter_map(|line| {
        BLG_MISSING_ENTRY_REGEX
            .captures(line)
            .and_then(|c| c.name("dq").or_else(|| c.name("sq")))
            .map(|m| m.as_str())
    });
    let keys = collect_keys(payloads, blacklist);

    let bibfile = content.lines().find_map(|line| {
        BLG_DATABASE_FILE_REGEX
            .captures(line)
            .and_then(|c| c.name("file"))
            .map(|m| PathBuf::from(m.as_str().trim()))
    });

    BlgScan { keys, bibfile }
}

/// Extract TeX keys from an .aux file.
///
/// A missing or unreadable file is logged and yields no keys.
pub fn aux_to_texkeys(path: &Path, blacklist: &Blacklist) -> Vec<String> {
    match read_log(path) {
        Ok(content) => {
            let keys = parse_aux(&content, blacklist);
            info!("Found {} citation keys in {}", keys.len(), path.display());
            keys
        }
        Err(e) => {
            error!("{}", e);
            Vec::new()
        }
    }
}

/// Extract TeX keys and the bibliography file from a .blg file.
///
/// A missing or unreadable file is logged and yields an empty scan.
pub fn blg_to_texkeys(path: &Path, blacklist: &Blacklist) -> BlgScan {
    match read_log(path) {
        Ok(content) => {
            let scan = parse_blg(&content, blacklist);
            info!("Found {} missing citation keys in {}", scan.keys.len(), path.display());
            scan
        }
        Err(e) => {
            error!("{}", e);
            BlgScan::default()
        }
    }
}

/// Locate a bibliography file named in a .blg log.
///
/// bibtex records the database path relative to where it ran, usually the
/// directory of the log itself, so a relative path that does not exist from
/// the current directory is retried next to the log.
pub fn resolve_bibfile(blg_path: &Path, bibfile: &Path) -> PathBuf {
    if bibfile.exists() || bibfile.is_absolute() {
        return bibfile.to_path_buf();
    }
    match blg_path.parent() {
        Some(dir) if dir.join(bibfile).exists() => dir.join(bibfile),
        _ => bibfile.to_path_buf(),
    }
}
