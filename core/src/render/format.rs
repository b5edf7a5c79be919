//! Text helpers used by the view model.

use std::cmp::Ordering;

use crate::files::ListingStats;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human-readable byte size: `0 B`, `512 B`, `2.00 KB`, `1.50 MB`.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", SIZE_UNITS[unit])
}

/// Compare two entry names the way a user-facing file list expects.
///
/// Letters compare case-insensitively first. Names that differ only in case
/// put the lowercase form first (`a` < `A` < `b`). Names that are fully equal
/// compare `Equal`, leaving their order to a stable sort.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let folded_a = a.chars().flat_map(char::to_lowercase);
    let folded_b = b.chars().flat_map(char::to_lowercase);
    folded_a.cmp(folded_b).then_with(|| case_order(a, b))
}

fn case_order(a: &str, b: &str) -> Ordering {
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca == cb {
            continue;
        }
        return match (ca.is_lowercase(), cb.is_lowercase()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => ca.cmp(&cb),
        };
    }
    a.chars().count().cmp(&b.chars().count())
}

/// Footer line, e.g. `2 folders, 1 file, 2.00 KB`.
pub fn stats_label(stats: &ListingStats) -> String {
    format!(
        "{} {}, {} {}, {}",
        stats.directories,
        if stats.directories == 1 { "folder" } else { "folders" },
        stats.files,
        if stats.files == 1 { "file" } else { "files" },
        format_size(stats.total_bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(1536 * 1024), "1.50 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5.00 GB");
        assert_eq!(format_size(3 * 1024u64.pow(5)), "3072.00 TB");
    }

    #[test]
    fn compare_names_ignores_case_first() {
        assert_eq!(compare_names("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_names("Zebra", "apple"), Ordering::Greater);
    }

    #[test]
    fn compare_names_lowercase_before_uppercase_on_tie() {
        assert_eq!(compare_names("readme", "README"), Ordering::Less);
        assert_eq!(compare_names("README", "readme"), Ordering::Greater);
        assert_eq!(compare_names("a", "A"), Ordering::Less);
    }

    #[test]
    fn compare_names_equal_names() {
        assert_eq!(compare_names("same.txt", "same.txt"), Ordering::Equal);
        assert_eq!(compare_names("", ""), Ordering::Equal);
    }

    #[test]
    fn compare_names_prefix_sorts_first() {
        assert_eq!(compare_names("log", "log.1"), Ordering::Less);
    }

    #[test]
    fn stats_label_pluralizes() {
        let stats = ListingStats {
            directories: 1,
            files: 2,
            total_bytes: 2048,
        };
        assert_eq!(stats_label(&stats), "1 folder, 2 files, 2.00 KB");
        assert_eq!(stats_label(&ListingStats::default()), "0 folders, 0 files, 0 B");
    }
}
