// src/watch/filter.rs

//! Which files the monitor cares about.

use std::collections::BTreeSet;
use std::path::Path;

/// Case-insensitive suffix match against a configured set of extensions.
///
/// Extensions are stored lowercase with a leading `.`; `"MP4"`, `".mp4"` and
/// `".Mp4"` all configure the same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: BTreeSet<String>,
}

impl ExtensionFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .filter_map(|e| normalize(e.as_ref()))
            .collect();
        Self { extensions }
    }

    pub fn is_eligible(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let (_, ext) = split_extension(name);
        !ext.is_empty() && self.extensions.contains(&ext.to_lowercase())
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

fn normalize(ext: &str) -> Option<String> {
    let ext = ext.trim().trim_start_matches('.');
    if ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_lowercase()))
}

/// Split a file name at its last `.`: `"clip.final.mp4"` becomes
/// `("clip.final", ".mp4")`, `"README"` becomes `("README", "")`.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) => name.split_at(idx),
        None => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn video_filter() -> ExtensionFilter {
        ExtensionFilter::new([".mp4", "MKV", " .webm "])
    }

    #[test]
    fn matches_case_insensitively() {
        let f = video_filter();
        assert!(f.is_eligible(Path::new("/in/clip.mp4")));
        assert!(f.is_eligible(Path::new("/in/CLIP.MP4")));
        assert!(f.is_eligible(Path::new("/in/talk.Mkv")));
        assert!(f.is_eligible(Path::new("/in/a.b.webm")));
    }

    #[test]
    fn rejects_unknown_or_missing_extension() {
        let f = video_filter();
        assert!(!f.is_eligible(Path::new("/in/notes.txt")));
        assert!(!f.is_eligible(Path::new("/in/README")));
        assert!(!f.is_eligible(Path::new("/in/clip.mp4.failed")));
        assert!(!f.is_eligible(Path::new("/in/clip.mp4.part")));
        assert!(!f.is_eligible(Path::new("/")));
    }

    #[test]
    fn normalizes_configured_extensions() {
        let f = video_filter();
        let exts: Vec<_> = f.extensions().collect();
        assert_eq!(exts, vec![".mkv", ".mp4", ".webm"]);
        assert!(ExtensionFilter::new(["", "."]).extensions().next().is_none());
    }

    #[test]
    fn splits_at_last_dot() {
        assert_eq!(split_extension("clip.final.mp4"), ("clip.final", ".mp4"));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(".mp4"), ("", ".mp4"));
    }

    proptest! {
        #[test]
        fn eligibility_ignores_case(stem in "[a-zA-Z0-9_ -]{1,16}", upper in any::<bool>()) {
            let f = video_filter();
            let ext = if upper { "MP4" } else { "mp4" };
            let name = format!("{stem}.{ext}");
            let path = Path::new("/watch").join(name);
            prop_assert!(f.is_eligible(&path));
        }
    }
}
