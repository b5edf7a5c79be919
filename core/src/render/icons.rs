//! Icon category classification.
//!
//! Classification is an ordered rule table. Rules are tried top to bottom and
//! the first match wins: the directory rule, then MIME-type families, then
//! filename suffixes. Anything left over is [`IconCategory::Generic`].

use serde::{Deserialize, Serialize};

/// The fixed set of icon categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconCategory {
    Directory,
    Image,
    Video,
    Audio,
    Pdf,
    Archive,
    Spreadsheet,
    Document,
    Presentation,
    Text,
    StructuredData,
    SourceCode,
    Generic,
}

/// What a rule can look at.
#[derive(Debug, Clone, Copy)]
pub struct IconInput<'a> {
    pub is_directory: bool,
    pub mime_type: Option<&'a str>,
    pub name: &'a str,
}

/// Predicate half of a rule.
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    Directory,
    /// MIME type starts with the prefix (e.g. `image/`).
    MimePrefix(&'static str),
    /// MIME type equals one of the listed types.
    MimeExact(&'static [&'static str]),
    /// Lowercased file name ends with one of the listed suffixes.
    Suffix(&'static [&'static str]),
}

impl Matcher {
    pub fn matches(&self, input: &IconInput<'_>) -> bool {
        match self {
            Matcher::Directory => input.is_directory,
            Matcher::MimePrefix(prefix) => input
                .mime_type
                .is_some_and(|m| m.to_ascii_lowercase().starts_with(prefix)),
            Matcher::MimeExact(types) => input.mime_type.is_some_and(|m| {
                let essence = mime_essence(m);
                types.iter().any(|t| *t == essence)
            }),
            Matcher::Suffix(suffixes) => {
                let name = input.name.to_ascii_lowercase();
                suffixes.iter().any(|s| name.ends_with(s))
            }
        }
    }
}

/// A `(predicate, category)` pair.
#[derive(Debug, Clone, Copy)]
pub struct IconRule {
    pub matcher: Matcher,
    pub category: IconCategory,
}

const fn rule(matcher: Matcher, category: IconCategory) -> IconRule {
    IconRule { matcher, category }
}

const ARCHIVE_MIMES: &[&str] = &[
    "application/zip",
    "application/x-tar",
    "application/gzip",
    "application/x-gzip",
    "application/x-bzip2",
    "application/x-xz",
    "application/x-7z-compressed",
    "application/x-rar-compressed",
    "application/vnd.rar",
];
const SPREADSHEET_MIMES: &[&str] = &[
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.oasis.opendocument.spreadsheet",
    "text/csv",
];
const DOCUMENT_MIMES: &[&str] = &[
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.oasis.opendocument.text",
    "application/rtf",
];
const PRESENTATION_MIMES: &[&str] = &[
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.oasis.opendocument.presentation",
];
const STRUCTURED_MIMES: &[&str] = &[
    "application/json",
    "application/xml",
    "text/xml",
    "application/yaml",
    "application/x-yaml",
    "text/yaml",
    "application/toml",
];
const SOURCE_MIMES: &[&str] = &[
    "application/javascript",
    "text/javascript",
    "application/typescript",
    "text/x-python",
    "text/x-rust",
    "text/x-c",
    "text/x-c++",
    "text/x-java",
    "text/x-go",
    "text/x-shellscript",
    "application/x-sh",
    "text/css",
    "text/html",
];

/// Evaluation order is part of the contract.
pub const ICON_RULES: &[IconRule] = &[
    rule(Matcher::Directory, IconCategory::Directory),
    // MIME families
    rule(Matcher::MimePrefix("image/"), IconCategory::Image),
    rule(Matcher::MimePrefix("video/"), IconCategory::Video),
    rule(Matcher::MimePrefix("audio/"), IconCategory::Audio),
    rule(Matcher::MimeExact(&["application/pdf"]), IconCategory::Pdf),
    rule(Matcher::MimeExact(ARCHIVE_MIMES), IconCategory::Archive),
    rule(Matcher::MimeExact(SPREADSHEET_MIMES), IconCategory::Spreadsheet),
    rule(Matcher::MimeExact(DOCUMENT_MIMES), IconCategory::Document),
    rule(Matcher::MimeExact(PRESENTATION_MIMES), IconCategory::Presentation),
    rule(Matcher::MimeExact(STRUCTURED_MIMES), IconCategory::StructuredData),
    rule(Matcher::MimeExact(SOURCE_MIMES), IconCategory::SourceCode),
    rule(Matcher::MimePrefix("text/"), IconCategory::Text),
    // Filename suffixes
    rule(
        Matcher::Suffix(&[
            ".png", ".jpg", ".jpeg", ".gif", ".bmp", ".svg", ".webp", ".ico", ".tiff",
        ]),
        IconCategory::Image,
    ),
    rule(
        Matcher::Suffix(&[".mp4", ".mkv", ".mov", ".avi", ".webm", ".wmv"]),
        IconCategory::Video,
    ),
    rule(
        Matcher::Suffix(&[".mp3", ".wav", ".flac", ".ogg", ".m4a", ".aac"]),
        IconCategory::Audio,
    ),
    rule(Matcher::Suffix(&[".pdf"]), IconCategory::Pdf),
    rule(
        Matcher::Suffix(&[
            ".zip", ".tar", ".gz", ".tgz", ".bz2", ".xz", ".7z", ".rar",
        ]),
        IconCategory::Archive,
    ),
    rule(
        Matcher::Suffix(&[".xls", ".xlsx", ".ods", ".csv"]),
        IconCategory::Spreadsheet,
    ),
    rule(
        Matcher::Suffix(&[".doc", ".docx", ".odt", ".rtf"]),
        IconCategory::Document,
    ),
    rule(
        Matcher::Suffix(&[".ppt", ".pptx", ".odp", ".key"]),
        IconCategory::Presentation,
    ),
    rule(
        Matcher::Suffix(&[".txt", ".md", ".log", ".ini", ".cfg", ".conf"]),
        IconCategory::Text,
    ),
    rule(
        Matcher::Suffix(&[".json", ".xml", ".yaml", ".yml", ".toml"]),
        IconCategory::StructuredData,
    ),
    rule(
        Matcher::Suffix(&[
            ".rs", ".go", ".py", ".js", ".ts", ".jsx", ".tsx", ".c", ".h", ".cpp", ".hpp",
            ".java", ".kt", ".rb", ".php", ".sh", ".css", ".html", ".sql",
        ]),
        IconCategory::SourceCode,
    ),
];

/// Classify with the default rule table.
pub fn classify(input: &IconInput<'_>) -> IconCategory {
    classify_with(ICON_RULES, input)
}

/// Classify with an explicit rule table; first match wins.
pub fn classify_with(rules: &[IconRule], input: &IconInput<'_>) -> IconCategory {
    rules
        .iter()
        .find(|r| r.matcher.matches(input))
        .map(|r| r.category)
        .unwrap_or(IconCategory::Generic)
}

/// `text/plain; charset=utf-8` -> `text/plain`
fn mime_essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
