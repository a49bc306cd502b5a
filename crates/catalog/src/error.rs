use icu_locid::ParserError as LocaleParserError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write catalog {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to enumerate catalog directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed XML at line {line}, column {column}: {message}")]
    Xml {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("unknown translation type '{value}' at line {line}, column {column}")]
    UnknownStatus {
        value: String,
        line: usize,
        column: usize,
    },
    #[error("invalid catalog structure at line {line}, column {column}: {reason}")]
    Schema {
        line: usize,
        column: usize,
        reason: String,
    },
    #[error("input is not valid UTF-8 (first invalid byte at offset {offset})")]
    Encoding { offset: usize },
    #[error("unsupported document encoding '{0}'; only UTF-8 catalogs are accepted")]
    UnsupportedEncoding(String),
    #[error("language tag '{tag}' is invalid: {error}")]
    InvalidLanguage {
        tag: String,
        error: LocaleParserError,
    },
    #[error("catalog {path} does not declare a language")]
    MissingLanguage { path: PathBuf },
    #[error("catalog does not declare a language")]
    UntaggedCatalog,
    #[error("duplicate catalog language {0}")]
    DuplicateLanguage(String),
}

/// A schema irregularity that was skipped under [`SchemaPolicy::Lenient`].
/// （寬鬆模式下被略過的結構異常。）
///
/// [`SchemaPolicy::Lenient`]: crate::SchemaPolicy::Lenient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaWarning {
    pub line: usize,
    pub column: usize,
    pub reason: String,
}

impl std::fmt::Display for SchemaWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.reason)
    }
}
