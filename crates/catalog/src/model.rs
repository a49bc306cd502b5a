use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::CatalogError;
use crate::numerus::NumerusRule;

pub const DEFAULT_FORMAT_VERSION: &str = "2.0";

/// Translation state of a message, decoded from the `type` attribute of
/// `<translation>`. A missing attribute means [`Status::Finished`].
/// （訊息的翻譯狀態，由 `<translation>` 的 `type` 屬性解碼；缺少屬性代表已完成。）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Finished,
    Unfinished,
    Obsolete,
    Vanished,
}

impl Status {
    /// Decodes the raw attribute value. `None` is the finished state.
    /// （解碼原始屬性值；`None` 即為已完成。）
    pub fn from_type_attr(value: Option<&str>) -> Option<Self> {
        match value {
            None => Some(Self::Finished),
            Some("unfinished") => Some(Self::Unfinished),
            Some("obsolete") => Some(Self::Obsolete),
            Some("vanished") => Some(Self::Vanished),
            Some(_) => None,
        }
    }

    /// The `type` attribute value written for this status, if any.
    /// （回傳此狀態寫出時的 `type` 屬性值。）
    pub fn type_attr(self) -> Option<&'static str> {
        match self {
            Self::Finished => None,
            Self::Unfinished => Some("unfinished"),
            Self::Obsolete => Some("obsolete"),
            Self::Vanished => Some("vanished"),
        }
    }

    /// Obsolete and vanished messages no longer correspond to live source code.
    /// （已過時與已消失的訊息不再對應現行原始碼。）
    pub fn is_live(self) -> bool {
        matches!(self, Self::Finished | Self::Unfinished)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Finished => "finished",
            Self::Unfinished => "unfinished",
            Self::Obsolete => "obsolete",
            Self::Vanished => "vanished",
        };
        f.write_str(label)
    }
}

/// Line reference of a `<location>`; lupdate's relative mode writes `+N`/`-N`.
/// （`<location>` 的行號；lupdate 相對模式會寫出 `+N`/`-N`。）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineNumber {
    Absolute(u32),
    Relative(i32),
}

impl LineNumber {
    pub fn parse(value: &str) -> Option<Self> {
        if value.starts_with('+') || value.starts_with('-') {
            value.parse().ok().map(Self::Relative)
        } else {
            value.parse().ok().map(Self::Absolute)
        }
    }
}

impl fmt::Display for LineNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute(line) => write!(f, "{line}"),
            Self::Relative(delta) => write!(f, "{delta:+}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<LineNumber>,
}

impl Location {
    pub fn new(filename: impl Into<String>, line: u32) -> Self {
        Self {
            filename: Some(filename.into()),
            line: Some(LineNumber::Absolute(line)),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.filename.as_deref().unwrap_or("<unknown>"))?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Translation {
    Singular(String),
    /// Numerus forms in the order of the target language's plural rule.
    Plural(Vec<String>),
}

impl Translation {
    pub fn is_plural(&self) -> bool {
        matches!(self, Self::Plural(_))
    }

    /// True when no form carries any text.
    /// （所有形式皆無文字時為真。）
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Singular(text) => text.is_empty(),
            Self::Plural(forms) => forms.iter().all(String::is_empty),
        }
    }

    /// The singular text, or the first numerus form.
    /// （單數文字，或第一個複數形式。）
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Singular(text) => Some(text.as_str()),
            Self::Plural(forms) => forms.first().map(String::as_str),
        }
    }
}

/// One translatable unit.
/// （單一可翻譯單元。）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub locations: Vec<Location>,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translator_comment: Option<String>,
    /// Raw value of the historical `utf8` attribute; only kept for rewriting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utf8: Option<String>,
    pub translation: Translation,
    pub status: Status,
}

impl Message {
    pub fn singular(source: impl Into<String>, text: impl Into<String>, status: Status) -> Self {
        Self::with_translation(source.into(), Translation::Singular(text.into()), status)
    }

    pub fn plural<I, S>(source: impl Into<String>, forms: I, status: Status) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let forms = forms.into_iter().map(Into::into).collect();
        Self::with_translation(source.into(), Translation::Plural(forms), status)
    }

    fn with_translation(source: String, translation: Translation, status: Status) -> Self {
        Self {
            locations: Vec::new(),
            source,
            comment: None,
            extra_comment: None,
            translator_comment: None,
            utf8: None,
            translation,
            status,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_extra_comment(mut self, comment: impl Into<String>) -> Self {
        self.extra_comment = Some(comment.into());
        self
    }

    pub fn with_translator_comment(mut self, comment: impl Into<String>) -> Self {
        self.translator_comment = Some(comment.into());
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    pub fn is_plural(&self) -> bool {
        self.translation.is_plural()
    }

    /// The disambiguation comment, with an absent comment read as empty.
    /// （消歧義註解；未提供時視為空字串。）
    pub fn comment_or_empty(&self) -> &str {
        self.comment.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub name: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub contexts: usize,
    pub messages: usize,
    pub finished: usize,
    pub unfinished: usize,
    pub obsolete: usize,
    pub vanished: usize,
    pub plural: usize,
}

impl CatalogStats {
    /// Share of live messages that are finished, in percent.
    /// （現行訊息中已完成的百分比。）
    pub fn completeness(&self) -> f64 {
        let live = self.finished + self.unfinished;
        if live == 0 {
            return 100.0;
        }
        self.finished as f64 / live as f64 * 100.0
    }
}

/// All contexts of one `.ts` file, in file order.
/// （單一 `.ts` 檔的所有情境，依檔案順序。）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    #[serde(default)]
    pub contexts: Vec<Context>,
}

fn default_version() -> String {
    DEFAULT_FORMAT_VERSION.to_string()
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            version: default_version(),
            language: None,
            source_language: None,
            contexts: Vec::new(),
        }
    }
}

impl Catalog {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: Some(language.into()),
            ..Self::default()
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.contexts.push(context);
        self
    }

    /// Reads and parses a catalog file with the lenient schema policy.
    /// （以寬鬆結構策略讀取並解析目錄檔。）
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading catalog");
        let bytes = std::fs::read(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        crate::parser::parse_bytes(&bytes)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "saving catalog");
        std::fs::write(path, self.to_ts_string()).map_err(|source| CatalogError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_ts_string(&self) -> String {
        crate::writer::to_ts_string(self)
    }

    /// First context with the given name.
    /// （回傳第一個符合名稱的情境。）
    pub fn context(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|context| context.name == name)
    }

    /// Every message paired with its context, in file order.
    /// （依檔案順序列出每則訊息及其情境。）
    pub fn messages(&self) -> impl Iterator<Item = (&Context, &Message)> {
        self.contexts
            .iter()
            .flat_map(|context| context.messages.iter().map(move |message| (context, message)))
    }

    pub fn stats(&self) -> CatalogStats {
        let mut stats = CatalogStats {
            contexts: self.contexts.len(),
            ..CatalogStats::default()
        };
        for (_, message) in self.messages() {
            stats.messages += 1;
            match message.status {
                Status::Finished => stats.finished += 1,
                Status::Unfinished => stats.unfinished += 1,
                Status::Obsolete => stats.obsolete += 1,
                Status::Vanished => stats.vanished += 1,
            }
            if message.is_plural() {
                stats.plural += 1;
            }
        }
        stats
    }

    /// The numerus rule of the catalog language; untagged catalogs use the
    /// one/other rule.
    /// （回傳目錄語言的複數規則；未標示語言者採用 one/other 規則。）
    pub fn numerus_rule(&self) -> Result<NumerusRule, CatalogError> {
        match self.language.as_deref() {
            Some(tag) => NumerusRule::for_language(tag),
            None => Ok(NumerusRule::OneOther),
        }
    }

    /// A copy for bootstrapping another language: every live translation is
    /// cleared and marked unfinished, with one empty numerus form per form
    /// the new language needs.
    /// （為新語言建立起始副本：清空現行翻譯並標為未完成。）
    pub fn seeded_for(&self, language: &str) -> Result<Self, CatalogError> {
        let form_count = NumerusRule::for_language(language)?.form_count();
        let mut seeded = self.clone();
        seeded.language = Some(language.to_string());
        for context in &mut seeded.contexts {
            for message in &mut context.messages {
                if !message.status.is_live() {
                    continue;
                }
                message.status = Status::Unfinished;
                message.translator_comment = None;
                message.translation = match message.translation {
                    Translation::Singular(_) => Translation::Singular(String::new()),
                    Translation::Plural(_) => Translation::Plural(vec![String::new(); form_count]),
                };
            }
        }
        Ok(seeded)
    }

    /// A copy without obsolete and vanished messages. Contexts left empty
    /// are dropped.
    /// （移除已過時與已消失訊息的副本，並捨棄因此變空的情境。）
    pub fn without_obsolete(&self) -> Self {
        let contexts = self
            .contexts
            .iter()
            .filter_map(|context| {
                let messages: Vec<Message> = context
                    .messages
                    .iter()
                    .filter(|message| message.status.is_live())
                    .cloned()
                    .collect();
                if messages.is_empty() {
                    None
                } else {
                    Some(Context {
                        name: context.name.clone(),
                        messages,
                    })
                }
            })
            .collect();
        Self {
            contexts,
            ..self.clone_header()
        }
    }

    fn clone_header(&self) -> Self {
        Self {
            version: self.version.clone(),
            language: self.language.clone(),
            source_language: self.source_language.clone(),
            contexts: Vec::new(),
        }
    }
}

impl FromStr for Catalog {
    type Err = CatalogError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        crate::parser::parse_str(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalog {
        Catalog::new("de_DE")
            .with_context(
                Context::new("FlightListWindow")
                    .with_message(Message::singular(
                        "%1: no flights",
                        "%1: keine Flüge",
                        Status::Finished,
                    ))
                    .with_message(Message::plural(
                        "%n flight(s) exported",
                        ["%n Flug exportiert", "%n Flüge exportiert"],
                        Status::Finished,
                    ))
                    .with_message(Message::singular("Refresh", "", Status::Unfinished)),
            )
            .with_context(Context::new("ConfirmOverwritePersonDialog").with_message(
                Message::singular("Erroneous entries", "Fehlerhafte Einträge", Status::Obsolete),
            ))
    }

    #[test]
    fn stats_count_each_status() {
        let stats = sample().stats();
        assert_eq!(stats.contexts, 2);
        assert_eq!(stats.messages, 4);
        assert_eq!(stats.finished, 2);
        assert_eq!(stats.unfinished, 1);
        assert_eq!(stats.obsolete, 1);
        assert_eq!(stats.plural, 1);
        assert!((stats.completeness() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn completeness_of_empty_catalog_is_full() {
        assert_eq!(Catalog::default().stats().completeness(), 100.0);
    }

    #[test]
    fn status_attribute_mapping() {
        assert_eq!(Status::from_type_attr(None), Some(Status::Finished));
        assert_eq!(Status::from_type_attr(Some("vanished")), Some(Status::Vanished));
        assert_eq!(Status::from_type_attr(Some("finished")), None);
        assert_eq!(Status::Finished.type_attr(), None);
        assert_eq!(Status::Obsolete.type_attr(), Some("obsolete"));
    }

    #[test]
    fn line_numbers_keep_their_sign() {
        assert_eq!(LineNumber::parse("42"), Some(LineNumber::Absolute(42)));
        assert_eq!(LineNumber::parse("+17"), Some(LineNumber::Relative(17)));
        assert_eq!(LineNumber::parse("-3"), Some(LineNumber::Relative(-3)));
        assert_eq!(LineNumber::parse("x"), None);
        assert_eq!(LineNumber::Relative(17).to_string(), "+17");
        assert_eq!(LineNumber::Relative(-3).to_string(), "-3");
    }

    #[test]
    fn seeded_catalog_clears_live_translations() {
        let seeded = sample().seeded_for("ru_RU").expect("seed");
        assert_eq!(seeded.language.as_deref(), Some("ru_RU"));
        let messages: Vec<_> = seeded.messages().map(|(_, message)| message).collect();
        assert_eq!(messages[0].translation, Translation::Singular(String::new()));
        assert_eq!(messages[0].status, Status::Unfinished);
        assert_eq!(messages[1].translation, Translation::Plural(vec![String::new(); 3]));
        assert_eq!(messages[3].status, Status::Obsolete);
        assert_eq!(
            messages[3].translation,
            Translation::Singular("Fehlerhafte Einträge".to_string())
        );
    }

    #[test]
    fn catalog_parses_from_str() {
        let written = sample().to_ts_string();
        let parsed: Catalog = written.parse().expect("parse written catalog");
        assert_eq!(parsed, sample());

        let error = "<TS version=\"2.0\"><context>".parse::<Catalog>().unwrap_err();
        assert!(matches!(error, CatalogError::Xml { .. }));
    }

    #[test]
    fn pruning_drops_dead_messages_and_empty_contexts() {
        let pruned = sample().without_obsolete();
        assert_eq!(pruned.contexts.len(), 1);
        assert_eq!(pruned.contexts[0].messages.len(), 3);
        assert_eq!(pruned.language.as_deref(), Some("de_DE"));
    }
}
