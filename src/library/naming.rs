//! Filename and folder-segment sanitizing.

use std::path::Path;

/// Replace spaces with underscores and keep only alphanumerics, `.`, `_`, `-`.
pub fn sanitize_filename(name: &str) -> String {
    name.replace(' ', "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

/// Sanitize one folder segment. `None` when nothing usable remains, including
/// the `.` and `..` segments that would escape the target tree.
pub fn sanitize_segment(segment: &str) -> Option<String> {
    let cleaned = sanitize_filename(segment.trim());
    match cleaned.as_str() {
        "" | "." | ".." => None,
        _ => Some(cleaned),
    }
}

/// Sanitized segments of a forward-slash folder path.
pub fn folder_segments(folder_path: &str) -> Vec<String> {
    folder_path.split('/').filter_map(sanitize_segment).collect()
}

/// The primary author's surname: everything before the first comma.
pub fn primary_surname(author: &str) -> &str {
    author.split(',').next().unwrap_or(author).trim()
}

/// `{surname}-{title}{ext}`, sanitized, keeping the original extension.
pub fn target_filename(author: &str, title: &str, original: &Path) -> String {
    let stem = sanitize_filename(&format!("{}-{}", primary_surname(author), title));
    match original.extension() {
        Some(ext) => format!("{stem}.{}", ext.to_string_lossy()),
        None => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_basic() {
        assert_eq!(
            sanitize_filename("smith_relativity_1916.pdf"),
            "smith_relativity_1916.pdf"
        );
        assert_eq!(
            sanitize_filename("Kant - Critique (1781).pdf"),
            "Kant_-_Critique_1781.pdf"
        );
        assert_eq!(sanitize_filename("a/b\\c:d?.pdf"), "abcd.pdf");
        assert_eq!(sanitize_filename("Gödel Über.pdf"), "Gödel_Über.pdf");
    }

    #[test]
    fn segments_drop_empty_and_traversal() {
        assert_eq!(folder_segments("Physics/General"), vec!["Physics", "General"]);
        assert_eq!(
            folder_segments("/Philosophy & Logic//Modal/"),
            vec!["Philosophy__Logic", "Modal"]
        );
        assert_eq!(folder_segments("../etc"), vec!["etc"]);
        assert!(folder_segments("?!/").is_empty());
    }

    #[test]
    fn surname_before_comma() {
        assert_eq!(primary_surname("Smith, John"), "Smith");
        assert_eq!(primary_surname("Smith"), "Smith");
        assert_eq!(primary_surname(""), "");
    }

    #[test]
    fn target_name_keeps_extension() {
        assert_eq!(
            target_filename("Smith", "Relativity", Path::new("smith_relativity_1916.pdf")),
            "Smith-Relativity.pdf"
        );
        assert_eq!(
            target_filename("Einstein, Albert", "On the Electrodynamics", Path::new("x.PDF")),
            "Einstein-On_the_Electrodynamics.PDF"
        );
        assert_eq!(target_filename("A", "B", Path::new("noext")), "A-B");
    }
}
