//! Backup targets
//!
//! A run backs up either one named database or every database the server
//! reports, minus an ignore list.

use std::collections::BTreeSet;
use std::fmt;

/// Databases skipped in all-databases mode unless overridden
pub const DEFAULT_IGNORED_DATABASES: [&str; 3] = ["postgres", "template0", "template1"];

/// What a backup or restore run operates on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// A single named database
    Single(String),
    /// Every non-template database on the server, minus the ignore list
    All { ignore: BTreeSet<String> },
}

impl DatabaseTarget {
    /// All-databases mode with the default ignore list
    pub fn all() -> Self {
        Self::All {
            ignore: default_ignore_list(),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All { .. })
    }

    /// Whether `name` is excluded by the ignore list
    pub fn is_ignored(&self, name: &str) -> bool {
        match self {
            Self::Single(_) => false,
            Self::All { ignore } => ignore.contains(name),
        }
    }

    /// Expand into concrete database names
    ///
    /// `available` is the server's database list; it is only consulted in
    /// all-databases mode. The result is sorted and free of duplicates so a
    /// run visits targets in a stable order.
    pub fn expand(&self, available: &[String]) -> Vec<String> {
        match self {
            Self::Single(name) => vec![name.clone()],
            Self::All { ignore } => available
                .iter()
                .map(|name| name.trim())
                .filter(|name| !name.is_empty() && !ignore.contains(*name))
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        }
    }
}

impl fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(name) => write!(f, "{}", name),
            Self::All { ignore } => {
                write!(f, "all databases")?;
                if !ignore.is_empty() {
                    let names: Vec<&str> = ignore.iter().map(String::as_str).collect();
                    write!(f, " (ignoring {})", names.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

/// The default ignore list as an owned set
pub fn default_ignore_list() -> BTreeSet<String> {
    DEFAULT_IGNORED_DATABASES
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// Parse a space-separated ignore list (`IGNORE_DB_LIST`)
pub fn parse_ignore_list(value: &str) -> BTreeSet<String> {
    value.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_ignores_server_list() {
        let target = DatabaseTarget::Single("app".into());
        assert_eq!(target.expand(&names(&["other"])), names(&["app"]));
        assert!(!target.is_ignored("app"));
    }

    #[test]
    fn test_all_excludes_default_ignore_list() {
        let target = DatabaseTarget::all();
        let expanded = target.expand(&names(&["postgres", "app", "template1", "billing"]));
        assert_eq!(expanded, names(&["app", "billing"]));
    }

    #[test]
    fn test_all_excludes_custom_ignore_list() {
        let target = DatabaseTarget::All {
            ignore: parse_ignore_list("postgres analytics"),
        };
        let expanded = target.expand(&names(&["analytics", "app", "postgres", "app"]));
        assert_eq!(expanded, names(&["app"]));
        assert!(target.is_ignored("analytics"));
    }

    #[test]
    fn test_parse_ignore_list() {
        let list = parse_ignore_list("  a  b\tc ");
        assert_eq!(list.len(), 3);
        assert!(list.contains("b"));
        assert!(parse_ignore_list("").is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(DatabaseTarget::Single("app".into()).to_string(), "app");
        let all = DatabaseTarget::All {
            ignore: parse_ignore_list("x"),
        };
        assert_eq!(all.to_string(), "all databases (ignoring x)");
    }
}
