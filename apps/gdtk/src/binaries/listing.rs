//! Parsing of the distribution server's HTML directory listings.
//!
//! The server renders each directory as a table with one row per entry:
//!
//! ```text
//! <tr><td class="n"><a href="3.1/">3.1</a>/</td>
//!     <td class="m">2019-Mar-13 19:31:43</td>
//!     <td class="s">- &nbsp;</td>
//!     <td class="t">Directory</td></tr>
//! ```
//!
//! Only the name (`n`), modified (`m`) and type (`t`) cells are used. The
//! type cell reads `Directory` for sub-directories and a MIME type for files.
//!
//! This is pattern matching, not an HTML parser. It assumes the Apache
//! `mod_autoindex` table layout: one `<td class="n">` anchor per row, and no
//! `</tr>` inside a cell. Rows without a name anchor or a type cell (headers,
//! separators) are skipped. A row with several name anchors yields the first.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").expect("valid row regex"));

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<td[^>]*class="n"[^>]*>.*?<a[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#)
        .expect("valid name regex")
});

static MODIFIED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<td[^>]*class="m"[^>]*>(.*?)</td>"#).expect("valid modified regex")
});

static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<td[^>]*class="t"[^>]*>(.*?)</td>"#).expect("valid type regex")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+\.\d+(?:\.\d+)?(?:\.\d+)?").expect("valid version regex")
});

/// Type label the listing uses for sub-directories.
const DIRECTORY_LABEL: &str = "Directory";

/// Sub-directories of a version folder that are not release channels.
const NON_RELEASE_DIRS: [&str; 2] = ["mono", "fixup"];

/// Whether a listing row is a directory or a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Visible link text, with any trailing `/` removed.
    pub name: String,
    /// Raw `href` of the link.
    pub href: String,
    /// Contents of the modified cell, empty when the server shows none.
    pub last_modified: String,
    pub kind: EntryKind,
}

impl ListingEntry {
    fn is_navigation(&self) -> bool {
        self.name.eq_ignore_ascii_case("parent directory") || self.name == ".." || self.href == "../"
    }
}

/// Parses every table row that has a name link and a type cell.
#[must_use]
pub fn parse_listing(html: &str) -> Vec<ListingEntry> {
    ROW_RE
        .captures_iter(html)
        .filter_map(|row| {
            let row = row.get(1)?.as_str();
            let name = NAME_RE.captures(row)?;
            let kind_label = cell_text(TYPE_RE.captures(row)?.get(1)?.as_str());
            let last_modified = MODIFIED_RE
                .captures(row)
                .and_then(|m| m.get(1))
                .map(|m| cell_text(m.as_str()))
                .unwrap_or_default();

            let kind = if kind_label == DIRECTORY_LABEL {
                EntryKind::Directory
            } else {
                EntryKind::File
            };

            Some(ListingEntry {
                name: cell_text(name.get(2)?.as_str())
                    .trim_end_matches('/')
                    .to_string(),
                href: decode_entities(name.get(1)?.as_str()),
                last_modified,
                kind,
            })
        })
        .collect()
}

/// Extracts version directories from the root listing, keyed by version.
///
/// A row counts when it is a directory and its link text contains a
/// version-like pattern (`N.N`, `N.N.N` or `N.N.N.N`). Later rows with the
/// same version replace earlier ones.
#[must_use]
pub fn version_directories(entries: &[ListingEntry]) -> BTreeMap<String, &ListingEntry> {
    let mut versions = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.kind == EntryKind::Directory) {
        for found in VERSION_RE.find_iter(&entry.name) {
            versions.insert(found.as_str().to_string(), entry);
        }
    }
    versions
}

/// Extracts release-channel directories from a version listing.
///
/// Navigation rows and the `mono`/`fixup` folders are skipped.
#[must_use]
pub fn release_directories(entries: &[ListingEntry]) -> Vec<&ListingEntry> {
    entries
        .iter()
        .filter(|e| e.kind == EntryKind::Directory)
        .filter(|e| !e.is_navigation())
        .filter(|e| !NON_RELEASE_DIRS.contains(&e.name.as_str()))
        .collect()
}

fn cell_text(raw: &str) -> String {
    decode_entities(&TAG_RE.replace_all(raw, ""))
        .trim()
        .to_string()
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Renders a listing page in the server's format.
    ///
    /// Each row is `(name, is_dir, modified)`.
    pub(crate) fn render_listing(rows: &[(&str, bool, &str)]) -> String {
        let mut html = String::from(
            "<html><body><table><thead><tr><th class=\"n\">Name</th>\
             <th class=\"m\">Last Modified</th><th class=\"s\">Size</th>\
             <th class=\"t\">Type</th></tr></thead><tbody>\n\
             <tr class=\"d\"><td class=\"n\"><a href=\"../\">Parent Directory</a>/</td>\
             <td class=\"m\">&nbsp;</td><td class=\"s\">- &nbsp;</td>\
             <td class=\"t\">Directory</td></tr>\n",
        );
        for (name, is_dir, modified) in rows {
            if *is_dir {
                html.push_str(&format!(
                    "<tr class=\"d\"><td class=\"n\"><a href=\"{name}/\">{name}</a>/</td>\
                     <td class=\"m\">{modified}</td><td class=\"s\">- &nbsp;</td>\
                     <td class=\"t\">Directory</td></tr>\n"
                ));
            } else {
                html.push_str(&format!(
                    "<tr><td class=\"n\"><a href=\"{name}\">{name}</a></td>\
                     <td class=\"m\">{modified}</td><td class=\"s\">18.2M</td>\
                     <td class=\"t\">application/zip</td></tr>\n"
                ));
            }
        }
        html.push_str("</tbody></table></body></html>");
        html
    }

    #[test]
    fn rows_without_name_or_type_cell_are_skipped() {
        let html = r#"<table>
<tr><th class="n">Name</th><th class="t">Type</th></tr>
<tr><th colspan="5"><hr></th></tr>
<tr><td class="n"><a href="3.1/">3.1</a>/</td><td class="m">2019-Mar-13 19:31:43</td><td class="t">Directory</td></tr>
<tr><td class="n"><a href="4.0/">4.0</a>/</td><td class="m">2023-Mar-01 10:00:00</td></tr>
<tr><td class="n"><a href="3.2/">3.2</a> <a href="3.2-old/">old</a></td><td class="t">Directory</td></tr>
</table>"#;

        let entries = parse_listing(html);

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["3.1", "3.2"]);
        assert_eq!(entries[1].href, "3.2/");
        assert_eq!(entries[1].last_modified, "");
    }

    #[test]
    fn parses_rows_and_kinds() {
        let html = render_listing(&[
            ("3.1", true, "2019-Mar-13 19:31:43"),
            ("Godot_v3.1-stable_x11.64.zip", false, "2019-Mar-13 19:31:43"),
        ]);
        let entries = parse_listing(&html);

        // Header row has no link, so only parent + two entries remain.
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].name, "3.1");
        assert_eq!(entries[1].href, "3.1/");
        assert_eq!(entries[1].kind, EntryKind::Directory);
        assert_eq!(entries[1].last_modified, "2019-Mar-13 19:31:43");
        assert_eq!(entries[2].kind, EntryKind::File);
    }

    #[test]
    fn parent_directory_has_blank_modified() {
        let entries = parse_listing(&render_listing(&[]));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Parent Directory");
        assert_eq!(entries[0].last_modified, "");
    }

    #[test]
    fn version_directories_match_pattern_and_skip_files() {
        let html = render_listing(&[
            ("1.1", true, "a"),
            ("3.2.3", true, "b"),
            ("3.2.3.1", true, "c"),
            ("media", true, "d"),
            ("toolchains", true, "e"),
            ("9.9.zip", false, "f"),
        ]);
        let entries = parse_listing(&html);
        let versions = version_directories(&entries);

        let keys: Vec<_> = versions.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["1.1", "3.2.3", "3.2.3.1"]);
        assert_eq!(versions["3.2.3"].last_modified, "b");
    }

    #[test]
    fn release_directories_skip_navigation_mono_and_fixup() {
        let html = render_listing(&[
            ("rc1", true, "a"),
            ("beta2", true, "b"),
            ("mono", true, "c"),
            ("fixup", true, "d"),
            ("Godot_v3.1-stable_x11.64.zip", false, "e"),
        ]);
        let entries = parse_listing(&html);
        let names: Vec<_> = release_directories(&entries)
            .into_iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["rc1", "beta2"]);
    }

    #[test]
    fn tolerates_markup_without_rows() {
        assert!(parse_listing("<html><body>Not found</body></html>").is_empty());
    }
}
