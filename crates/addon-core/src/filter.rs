//! Name-based exclusion rules for directory walks
//!
//! Rules are matched against a single path segment (a file or directory
//! name), never against the full path.

use regex::Regex;
use thiserror::Error;

/// Errors while compiling filter rules
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid filter pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A compiled pattern matched against one name
#[derive(Debug, Clone)]
pub struct FilterRule {
    regex: Regex,
}

impl FilterRule {
    /// Compile a rule from a regular expression
    ///
    /// # Errors
    /// Returns an error if the pattern is not a valid regular expression
    pub fn new(pattern: &str) -> Result<Self, FilterError> {
        let regex = Regex::new(pattern).map_err(|source| FilterError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { regex })
    }

    /// Search semantics: the rule matches if it matches anywhere in `name`,
    /// unless the pattern anchors itself.
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// A set of rules; a name is excluded when any rule matches it
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<FilterRule>,
}

/// Hidden entries
const HIDDEN_PATTERN: &str = r"^\.";
const PYCACHE_DIR_PATTERN: &str = r"^__pycache__$";
const BYTECODE_FILE_PATTERN: &str = r"\.pyc$";

impl RuleSet {
    /// An empty set that excludes nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile a rule set from patterns
    ///
    /// # Errors
    /// Returns an error if any pattern fails to compile
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .map(|p| FilterRule::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Default file rules: hidden files and bytecode caches
    pub fn default_files() -> Self {
        Self::builtin(&[HIDDEN_PATTERN, BYTECODE_FILE_PATTERN])
    }

    /// Default directory rules: hidden directories and `__pycache__`
    pub fn default_dirs() -> Self {
        Self::builtin(&[HIDDEN_PATTERN, PYCACHE_DIR_PATTERN])
    }

    fn builtin(patterns: &[&str]) -> Self {
        let rules = patterns
            .iter()
            .map(|p| FilterRule::new(p).expect("builtin pattern is valid"))
            .collect();
        Self { rules }
    }

    /// Whether any rule in the set matches `name`
    pub fn matches(&self, name: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(name))
    }
}
