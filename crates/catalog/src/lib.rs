pub mod config;
mod error;
pub mod model;
pub mod numerus;
pub mod parser;
pub mod translator;
pub mod validate;
pub mod writer;

pub use config::{CheckConfig, ConfigError, LingcatConfig, CONFIG_FILE_NAME};
pub use error::{CatalogError, SchemaWarning};
pub use model::{
    Catalog, CatalogStats, Context, LineNumber, Location, Message, Status, Translation,
};
pub use numerus::NumerusRule;
pub use parser::{
    parse_bytes, parse_bytes_with_policy, parse_str, parse_with_policy, ParseReport, SchemaPolicy,
};
pub use translator::{substitute_count, LocaleCatalogStats, TranslationManager, Translator};
pub use validate::{validate, Issue, IssueKind};
pub use writer::{to_ts_string, write_to};
