//! Result filters requested by the host.
//!
//! Filters are threaded through every query operation. Deciding whether a
//! package passes them is delegated to a [`FilterStrategy`], so real filter
//! semantics can be plugged in without touching the callers.

use anyhow::{Result, bail};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Filter {
    Installed,
    NotInstalled,
    Development,
    NotDevelopment,
    Gui,
    NotGui,
    Basename,
    Application,
    NotApplication,
}

impl Filter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::Installed => "installed",
            Filter::NotInstalled => "~installed",
            Filter::Development => "devel",
            Filter::NotDevelopment => "~devel",
            Filter::Gui => "gui",
            Filter::NotGui => "~gui",
            Filter::Basename => "basename",
            Filter::Application => "application",
            Filter::NotApplication => "~application",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let filter = match s.trim() {
            "installed" => Filter::Installed,
            "~installed" => Filter::NotInstalled,
            "devel" => Filter::Development,
            "~devel" => Filter::NotDevelopment,
            "gui" => Filter::Gui,
            "~gui" => Filter::NotGui,
            "basename" => Filter::Basename,
            "application" => Filter::Application,
            "~application" => Filter::NotApplication,
            other => bail!("Unknown filter '{}'", other),
        };
        Ok(filter)
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A set of filters. Empty means "none".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters(BTreeSet<Filter>);

impl Filters {
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse filter names as sent by the host. `none` is accepted and ignored;
    /// each name may also be a `;`-separated list.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut set = BTreeSet::new();
        for name in names {
            for part in name.as_ref().split(';') {
                let part = part.trim();
                if part.is_empty() || part == "none" {
                    continue;
                }
                set.insert(part.parse::<Filter>()?);
            }
        }
        Ok(Self(set))
    }

    pub fn contains(&self, filter: Filter) -> bool {
        self.0.contains(&filter)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Filter> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Filter> for Filters {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Filters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.0.iter().map(Filter::as_str).collect();
        f.write_str(&names.join(";"))
    }
}

/// Decides whether a package passes the requested filters.
pub trait FilterStrategy: Send + Sync {
    fn matches(&self, name: &str, filters: &Filters) -> bool;
}

/// Accepts every package regardless of filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassAll;

impl FilterStrategy for PassAll {
    fn matches(&self, _name: &str, _filters: &Filters) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        let filters = Filters::parse(&["installed", "~devel"]).unwrap();

        assert!(filters.contains(Filter::Installed));
        assert!(filters.contains(Filter::NotDevelopment));
        assert!(!filters.contains(Filter::Gui));
    }

    #[test]
    fn test_parse_semicolon_list() {
        let filters = Filters::parse(&["gui;application"]).unwrap();

        assert_eq!(
            filters.iter().collect::<Vec<_>>(),
            vec![Filter::Gui, Filter::Application]
        );
    }

    #[test]
    fn test_parse_none() {
        let filters = Filters::parse(&["none"]).unwrap();
        assert!(filters.is_empty());
        assert_eq!(filters.to_string(), "none");
    }

    #[test]
    fn test_parse_unknown_fails() {
        let err = Filters::parse(&["installed", "shiny"]).unwrap_err();
        assert!(err.to_string().contains("shiny"));
    }

    #[test]
    fn test_display_round_trip() {
        let filters: Filters = [Filter::Basename, Filter::NotInstalled].into_iter().collect();

        assert_eq!(filters.to_string(), "~installed;basename");
        assert_eq!(Filters::parse(&[filters.to_string()]).unwrap(), filters);
    }

    #[test]
    fn test_pass_all_accepts_everything() {
        let filters = Filters::parse(&["installed", "gui"]).unwrap();

        assert!(PassAll.matches("foo", &filters));
        assert!(PassAll.matches("bar", &Filters::none()));
    }
}
