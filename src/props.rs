//! Flat `key=value` configuration sources.
//!
//! The format is deliberately naive: whitespace-separated tokens, each split
//! at the first `=`. No escaping, no comments, no quoting. Tokens without a
//! `=` are skipped.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{DbError, DbResult};

/// String-keyed property mapping read from a config source.
pub type Props = BTreeMap<String, String>;

/// Read a property file into a [`Props`] mapping.
///
/// # Errors
///
/// Returns `DbError::Config` if the source cannot be read.
pub fn read_props(path: &Path) -> DbResult<Props> {
    let text = fs::read_to_string(path)
        .map_err(|e| DbError::Config(format!("cannot read {}: {e}", path.display())))?;

    let mut props = Props::new();
    for token in text.split_whitespace() {
        if let Some(eq) = token.find('=') {
            props.insert(token[..eq].to_string(), token[eq + 1..].to_string());
        }
    }
    Ok(props)
}

/// Look up a property by name.
#[must_use]
pub fn get_prop<'a>(props: &'a Props, name: &str) -> Option<&'a str> {
    props.get(name).map(String::as_str)
}

/// Look up a property that a driver requires: present and non-empty.
#[must_use]
pub fn required_prop<'a>(props: &'a Props, name: &str) -> Option<&'a str> {
    match get_prop(props, name) {
        Some(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_tokens_and_skips_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "driver=mock\nuser=bob password=secret").unwrap();
        writeln!(file, "not-a-pair").unwrap();
        writeln!(file, "server=localhost:3306").unwrap();

        let props = read_props(file.path()).unwrap();
        assert_eq!(get_prop(&props, "driver"), Some("mock"));
        assert_eq!(get_prop(&props, "user"), Some("bob"));
        assert_eq!(get_prop(&props, "password"), Some("secret"));
        assert_eq!(get_prop(&props, "server"), Some("localhost:3306"));
        assert_eq!(get_prop(&props, "not-a-pair"), None);
    }

    #[test]
    fn required_prop_rejects_empty_values() {
        let mut props = Props::new();
        props.insert("database".into(), String::new());
        assert_eq!(required_prop(&props, "database"), None);
        assert_eq!(required_prop(&props, "missing"), None);
        props.insert("database".into(), "app".into());
        assert_eq!(required_prop(&props, "database"), Some("app"));
    }

    #[test]
    fn unreadable_source_is_a_config_error() {
        let err = read_props(Path::new("/nonexistent/sql-access.cfg")).unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }
}
