//! Dialect policy resolved once per parse.
//!
//! The supported dialect set is configuration, not behavior baked into the
//! node catalog: a [`DialectContext`] is built from a [`Dialect`] value
//! (deserializable from config), consulted by the builder during
//! normalization, and never stored on nodes.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqltree_ast::LikeOp;

/// A supported SQL dialect.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Generic ANSI-style SQL. Double-quoted identifiers, case-folding to
    /// lowercase.
    #[default]
    Ansi,
    /// MySQL. Backtick-quoted identifiers, identifier case preserved.
    MySql,
    /// Hive. Backtick-quoted identifiers, case-folding to lowercase.
    Hive,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ansi => "ansi",
            Self::MySql => "mysql",
            Self::Hive => "hive",
        })
    }
}

/// Case-folding policy for unquoted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseFold {
    /// Keep identifiers exactly as written.
    Preserve,
    /// Fold to ASCII lowercase.
    Lower,
}

/// Words that cannot appear as bare identifiers in any supported dialect.
const RESERVED_CORE: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST", "CREATE", "CROSS", "DELETE",
    "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXCEPT", "EXISTS", "FALSE", "FROM", "FULL",
    "GROUP", "HAVING", "IN", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "LEFT",
    "LIKE", "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "RIGHT", "SELECT",
    "SET", "TABLE", "THEN", "TRUE", "UNION", "UPDATE", "USING", "VALUES", "WHEN", "WHERE",
    "WITH",
];

/// Additional reserved words per dialect.
const RESERVED_MYSQL: &[&str] = &["DIV", "RLIKE", "REGEXP", "STRAIGHT_JOIN"];
const RESERVED_HIVE: &[&str] = &["CLUSTER", "DISTRIBUTE", "RLIKE", "SORT"];

/// Immutable per-parse dialect configuration.
///
/// Shared by reference across builder and analysis passes; never locked,
/// never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectContext {
    dialect: Dialect,
}

impl DialectContext {
    /// Resolve the context for a dialect.
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// The active dialect.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The identifier quote character for this dialect.
    #[must_use]
    pub const fn quote_char(&self) -> char {
        match self.dialect {
            Dialect::Ansi => '"',
            Dialect::MySql | Dialect::Hive => '`',
        }
    }

    /// Case-folding policy for unquoted identifiers.
    #[must_use]
    pub const fn case_fold(&self) -> CaseFold {
        match self.dialect {
            Dialect::Ansi | Dialect::Hive => CaseFold::Lower,
            Dialect::MySql => CaseFold::Preserve,
        }
    }

    /// Apply the unquoted-identifier folding policy.
    #[must_use]
    pub fn fold(&self, ident: &str) -> String {
        match self.case_fold() {
            CaseFold::Preserve => ident.to_owned(),
            CaseFold::Lower => ident.to_ascii_lowercase(),
        }
    }

    /// Whether a word is reserved under this dialect.
    #[must_use]
    pub fn is_reserved(&self, word: &str) -> bool {
        let extras = match self.dialect {
            Dialect::Ansi => &[][..],
            Dialect::MySql => RESERVED_MYSQL,
            Dialect::Hive => RESERVED_HIVE,
        };
        RESERVED_CORE
            .iter()
            .chain(extras)
            .any(|kw| kw.eq_ignore_ascii_case(word))
    }

    /// Whether this dialect has the given pattern-match operator.
    #[must_use]
    pub const fn supports_like_op(&self, op: LikeOp) -> bool {
        match op {
            LikeOp::Like => true,
            LikeOp::Rlike | LikeOp::Regexp => {
                matches!(self.dialect, Dialect::MySql | Dialect::Hive)
            }
        }
    }

    /// Whether this dialect has FULL JOIN.
    #[must_use]
    pub const fn supports_full_join(&self) -> bool {
        !matches!(self.dialect, Dialect::MySql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_chars() {
        assert_eq!(DialectContext::new(Dialect::Ansi).quote_char(), '"');
        assert_eq!(DialectContext::new(Dialect::MySql).quote_char(), '`');
        assert_eq!(DialectContext::new(Dialect::Hive).quote_char(), '`');
    }

    #[test]
    fn test_case_folding() {
        let ansi = DialectContext::new(Dialect::Ansi);
        assert_eq!(ansi.fold("Users"), "users");
        let mysql = DialectContext::new(Dialect::MySql);
        assert_eq!(mysql.fold("Users"), "Users");
        let hive = DialectContext::new(Dialect::Hive);
        assert_eq!(hive.fold("USERS"), "users");
    }

    #[test]
    fn test_reserved_words() {
        let ansi = DialectContext::new(Dialect::Ansi);
        assert!(ansi.is_reserved("select"));
        assert!(ansi.is_reserved("SELECT"));
        assert!(!ansi.is_reserved("rlike"));
        let hive = DialectContext::new(Dialect::Hive);
        assert!(hive.is_reserved("sort"));
        assert!(hive.is_reserved("rlike"));
    }

    #[test]
    fn test_like_op_support() {
        assert!(!DialectContext::new(Dialect::Ansi).supports_like_op(LikeOp::Rlike));
        assert!(DialectContext::new(Dialect::MySql).supports_like_op(LikeOp::Regexp));
        assert!(DialectContext::new(Dialect::Hive).supports_like_op(LikeOp::Rlike));
        assert!(DialectContext::new(Dialect::Ansi).supports_like_op(LikeOp::Like));
    }

    #[test]
    fn test_dialect_from_config() {
        let d: Dialect = serde_json::from_str("\"mysql\"").unwrap();
        assert_eq!(d, Dialect::MySql);
        let d: Dialect = serde_json::from_str("\"hive\"").unwrap();
        assert_eq!(d, Dialect::Hive);
    }
}
