//! Flat `key=value` property files.
//!
//! Reads the common subset of the Java properties syntax: `#`/`!` comments, `=`/`:`/whitespace
//! separators, backslash escapes (including `\uXXXX`) and line continuations. Files are written in
//! UTF-8 with keys in sorted order.

use crate::utils::util::Result;
use std::{
    collections::BTreeMap,
    fs,
    io::{BufWriter, Write},
    path::Path,
    str::FromStr,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|error| {
            crate::vcfstore_error!("Failed to read properties {}: {error}", path.display())
        })?;
        Ok(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let mut properties = Self::new();
        let mut lines = contents.lines();
        while let Some(line) = lines.next() {
            let mut logical = line.trim_start().to_string();
            if logical.is_empty() || logical.starts_with('#') || logical.starts_with('!') {
                continue;
            }
            while ends_with_continuation(&logical) {
                logical.pop();
                match lines.next() {
                    Some(next) => logical.push_str(next.trim_start()),
                    None => break,
                }
            }
            let (key, value) = split_entry(&logical);
            properties.set(unescape(key), unescape(value));
        }
        properties
    }

    /// Writes all entries to `path`, preceded by a timestamp comment line.
    pub fn store(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(fs::File::create(path)?);
        writeln!(writer, "#{}", chrono::Local::now().format("%a %b %d %H:%M:%S %Z %Y"))?;
        for (key, value) in &self.entries {
            writeln!(writer, "{}={}", escape(key, true), escape(value, false))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Parses the value at `key`, `Ok(None)` when it is absent.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|value| {
                value.trim().parse::<T>().map_err(|error| {
                    crate::vcfstore_error!("Invalid value for property {key}: '{value}' ({error})")
                })
            })
            .transpose()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\x0c' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }
    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start_matches([' ', '\t', '\x0c']);
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start_matches([' ', '\t', '\x0c']);
    }
    (key, rest)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn escape(raw: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, c) in raw.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_skips_comments_and_accepts_all_separators() {
        let properties = Properties::parse(
            "# comment\n! other comment\n\nname=sample\nversion : 1.2.0\nsummary.size 42\n",
        );
        assert_eq!(properties.len(), 3);
        assert_eq!(properties.get("name"), Some("sample"));
        assert_eq!(properties.get("version"), Some("1.2.0"));
        assert_eq!(properties.get("summary.size"), Some("42"));
        assert_eq!(properties.get("missing"), None);
    }

    #[test]
    fn parse_handles_escapes_and_continuations() {
        let properties = Properties::parse(
            "path=C\\:\\\\data\\\\vcf\nmulti=first \\\n    second\nkey\\=with\\:sep=v\nuni=caf\\u00e9\n",
        );
        assert_eq!(properties.get("path"), Some("C:\\data\\vcf"));
        assert_eq!(properties.get("multi"), Some("first second"));
        assert_eq!(properties.get("key=with:sep"), Some("v"));
        assert_eq!(properties.get("uni"), Some("café"));
    }

    #[test]
    fn store_then_load_preserves_entries() {
        let temp_dir = tempdir().expect("temp dir should be created");
        let path = temp_dir.path().join("vcf.properties");

        let mut properties = Properties::new();
        properties.set("name", "my vcf");
        properties.set("name.original", "my vcf.vcf.gz");
        properties.set("odd key", " leading space = value:with#chars\\");
        properties.store(&path).expect("properties should be stored");

        let contents = fs::read_to_string(&path).expect("properties should be readable");
        assert!(contents.starts_with('#'));

        let loaded = Properties::load(&path).expect("properties should load");
        assert_eq!(loaded, properties);
    }

    #[test]
    fn get_parsed_reports_invalid_numbers() {
        let properties = Properties::parse("count=12\nbad=twelve\n");
        assert_eq!(
            properties.get_parsed::<u64>("count").expect("count should parse"),
            Some(12)
        );
        assert_eq!(properties.get_parsed::<u64>("absent").expect("absent is ok"), None);
        assert!(properties.get_parsed::<u64>("bad").is_err());
    }
}
