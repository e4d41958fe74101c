//! Function prototype extraction from C sources.
//!
//! A light textual scan, not a C parser: it looks for
//! `<return type> <name>(<parameters>)` and keeps the first match per name,
//! which is enough to print a readable signature in a call banner.

use crate::utils::config::DEFAULT_SOURCE_EXTENSIONS;
use crate::utils::error::LoadError;
use log::{debug, info};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Words that can precede `name(` in statements but are never return types
const STATEMENT_KEYWORDS: &[&str] = &[
    "return", "else", "case", "goto", "sizeof", "do", "if", "while", "for", "switch",
];

/// One extracted declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prototype {
    pub name: String,
    pub return_type: String,
    pub parameters: Vec<String>,
    pub file: PathBuf,
    /// Rendered signature, e.g. `void LOG_ILogWaypointValue( uint32 logVal )`
    pub text: String,
}

/// Function name -> first prototype found
#[derive(Debug, Default)]
pub struct PrototypeIndex {
    entries: HashMap<String, Prototype>,
}

impl PrototypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the name is already known
    pub fn insert(&mut self, prototype: Prototype) {
        self.entries
            .entry(prototype.name.clone())
            .or_insert(prototype);
    }

    pub fn get(&self, name: &str) -> Option<&Prototype> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which files the scan visits
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// File extensions, without the dot
    pub extensions: Vec<String>,
    /// Paths containing any of these substrings (case-insensitive) are skipped
    pub exclude: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_SOURCE_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            exclude: Vec::new(),
        }
    }
}

impl ScanOptions {
    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude.into_iter().map(|e| e.to_lowercase()).collect();
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        let extension_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));

        let lowered = path.to_string_lossy().to_lowercase();
        extension_ok && !self.exclude.iter().any(|x| lowered.contains(x.as_str()))
    }
}

/// Scan a source tree for prototypes
///
/// **Public** - main entry point for prototype loading
///
/// Files are visited in sorted order so "first match wins" is stable
/// across runs.
///
/// # Errors
/// * `LoadError::WalkFailed` - Directory cannot be traversed
/// * `LoadError::IoError` - A source file cannot be read
pub fn scan_source_tree(
    root: impl AsRef<Path>,
    options: &ScanOptions,
) -> Result<PrototypeIndex, LoadError> {
    let root = root.as_ref();
    info!("Scanning source tree: {}", root.display());

    let mut index = PrototypeIndex::new();
    let mut files = 0usize;

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !options.accepts(entry.path()) {
            continue;
        }

        debug!("Parsing file: {}", entry.path().display());
        let bytes = fs::read(entry.path())?;
        let contents = String::from_utf8_lossy(&bytes);

        for prototype in extract_prototypes(&contents, entry.path()) {
            index.insert(prototype);
        }
        files += 1;
    }

    info!("Source scan complete: {} files, {} prototypes", files, index.len());
    Ok(index)
}

/// Extract declarations from one file's text
///
/// **Public** - used by `scan_source_tree` and tests
pub fn extract_prototypes(contents: &str, file: &Path) -> Vec<Prototype> {
    let bytes = contents.as_bytes();
    let mut found = Vec::new();
    // Matches never overlap: scanning resumes after the previous `)`
    let mut floor = 0usize;
    let mut cursor = 0usize;

    while let Some(offset) = contents[cursor..].find('(') {
        let open = cursor + offset;
        cursor = open + 1;

        let mut name_start = open;
        while name_start > floor && is_word_byte(bytes[name_start - 1]) {
            name_start -= 1;
        }
        if name_start == open || bytes[name_start].is_ascii_digit() {
            continue;
        }
        // `int f(` or `char *f(`
        if name_start == floor || !matches!(bytes[name_start - 1], b' ' | b'*') {
            continue;
        }

        let mut type_start = name_start;
        while type_start > floor && is_type_byte(bytes[type_start - 1]) {
            type_start -= 1;
        }
        // Preprocessor lines such as `#define MAX(a, b)`
        if type_start > 0 && bytes[type_start - 1] == b'#' {
            continue;
        }

        let return_type = collapse_whitespace(&contents[type_start..name_start]);
        if return_type.is_empty() {
            continue;
        }
        let first_word = return_type.split(' ').next().unwrap_or("");
        if STATEMENT_KEYWORDS.contains(&first_word) {
            continue;
        }

        let Some(close) = contents[open + 1..].find(')').map(|c| open + 1 + c) else {
            break;
        };

        let name = &contents[name_start..open];
        let parameters = split_parameters(&contents[open + 1..close]);
        found.push(Prototype {
            name: name.to_string(),
            text: render_prototype(&return_type, name, &parameters),
            return_type,
            parameters,
            file: file.to_path_buf(),
        });

        floor = close + 1;
        cursor = close + 1;
    }

    found
}

/// `void f( uint32 a, char *b )`, or `void f()` without parameters
pub fn render_prototype(return_type: &str, name: &str, parameters: &[String]) -> String {
    if parameters.is_empty() {
        format!("{} {}()", return_type, name)
    } else {
        format!("{} {}( {} )", return_type, name, parameters.join(", "))
    }
}

/// Split at top-level commas, collapsing whitespace inside each parameter
fn split_parameters(params: &str) -> Vec<String> {
    let mut parameters = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;

    for c in params.chars() {
        match c {
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                parameters.push(collapse_whitespace(&current));
                current.clear();
            }
            _ => current.push(c),
        }
    }

    let last = collapse_whitespace(&current);
    if !last.is_empty() {
        parameters.push(last);
    }

    parameters
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_type_byte(b: u8) -> bool {
    is_word_byte(b) || b == b'*' || b == b' '
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "\
#include \"log.h\"

static uint32 counter;

void LOG_ILogWaypointValue( uint32 logVal )
{
    if (logVal) {
        REGISTER_Waypoint = logVal;
    }
    return helper(logVal);
}

static char *LOG_Format(const char *fmt,
                        uint32 value)
{
    return 0;
}

void LOG_Reset(void);
";

    #[test]
    fn test_extract_prototypes() {
        let found = extract_prototypes(SOURCE, Path::new("Log_Handlers.c"));
        let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["LOG_ILogWaypointValue", "LOG_Format", "LOG_Reset"]);

        assert_eq!(found[0].text, "void LOG_ILogWaypointValue( uint32 logVal )");
        assert_eq!(found[1].return_type, "static char *");
        assert_eq!(
            found[1].parameters,
            vec!["const char *fmt".to_string(), "uint32 value".to_string()]
        );
        assert_eq!(found[2].text, "void LOG_Reset( void )");
        assert_eq!(found[0].file, PathBuf::from("Log_Handlers.c"));
    }

    #[test]
    fn test_statement_keywords_are_not_return_types() {
        let found = extract_prototypes("    return compute(x);\n", Path::new("a.c"));
        assert!(found.is_empty());
    }

    #[test]
    fn test_first_prototype_wins() {
        let mut index = PrototypeIndex::new();
        for p in extract_prototypes("int f(int a);\nlong f(long b)\n", Path::new("a.c")) {
            index.insert(p);
        }
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("f").unwrap().text, "int f( int a )");
    }

    #[test]
    fn test_preprocessor_macros_are_skipped() {
        let found = extract_prototypes("#define MAX(a, b) ((a) > (b))\n", Path::new("a.h"));
        assert!(found.is_empty());
    }

    #[test]
    fn test_render_without_parameters() {
        assert_eq!(render_prototype("int", "main", &[]), "int main()");
    }

    #[test]
    fn test_scan_options_filtering() {
        let options = ScanOptions::default().with_exclude(vec!["TinyCBOR".to_string()]);
        assert!(options.accepts(Path::new("src/log/Log_Handlers.c")));
        assert!(!options.accepts(Path::new("src/log/Log_Handlers.h")));
        assert!(!options.accepts(Path::new("third_party/tinycbor/cbor.c")));
    }
}
