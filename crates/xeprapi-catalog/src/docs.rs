use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Sub-directory of the documentation root holding the `*.doc` files.
pub const DOC_SUBDIR: &str = "Examples";

const DOC_EXTENSION: &str = "doc";
const MORE_INFO: &str = "See ProDeL documentation in Xepr for more information.";
const NO_INFO: &str = "See ProDeL documentation in Xepr for information.";

static PROTOTYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w*\s*(\w+)[\t]*\([\w\s,]*\))").expect("prototype regex must compile")
});

/// Build a name -> prototype map from `<root>/Examples/*.doc`.
///
/// Best effort: a missing directory or an unreadable file contributes
/// nothing. Files are visited in name order; a later prototype for the
/// same name replaces an earlier one.
pub fn scan_prototypes(root: &Path) -> HashMap<String, String> {
    let dir = root.join(DOC_SUBDIR);
    let mut prototypes = HashMap::new();

    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(?dir, error = %err, "no prototype documentation");
            return prototypes;
        }
    };

    let mut files: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == DOC_EXTENSION))
        .collect();
    files.sort();

    for file in files {
        let bytes = match std::fs::read(&file) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(?file, error = %err, "skipping unreadable documentation file");
                continue;
            }
        };
        let content = String::from_utf8_lossy(&bytes);
        for caps in PROTOTYPE.captures_iter(&content) {
            prototypes.insert(caps[2].to_string(), caps[1].to_string());
        }
    }

    debug!(count = prototypes.len(), "scanned prototype documentation");
    prototypes
}

/// Documentation text attached to a synthesized member.
pub fn member_doc(prototype: Option<&str>) -> String {
    match prototype {
        Some(prototype) => format!("{prototype}\n\n{MORE_INFO}"),
        None => NO_INFO.to_string(),
    }
}
