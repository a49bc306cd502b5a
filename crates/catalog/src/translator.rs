use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::error::CatalogError;
use crate::model::{Catalog, CatalogStats, Message, Status, Translation};
use crate::numerus::NumerusRule;
use crate::parser::{parse_bytes_with_policy, SchemaPolicy};

/// Message positions by context, then source text.
type MessageIndex = HashMap<String, HashMap<String, Vec<(usize, usize)>>>;

/// Runtime lookups against one catalog, falling back to the source text
/// whenever no usable translation exists.
/// （針對單一目錄查詢翻譯，無可用翻譯時回退至原文。）
#[derive(Debug, Clone)]
pub struct Translator {
    catalog: Catalog,
    rule: NumerusRule,
    index: MessageIndex,
    include_unfinished: bool,
}

impl Translator {
    pub fn new(catalog: Catalog) -> Result<Self, CatalogError> {
        let rule = catalog.numerus_rule()?;
        let mut index: MessageIndex = HashMap::new();
        for (context_index, context) in catalog.contexts.iter().enumerate() {
            for (message_index, message) in context.messages.iter().enumerate() {
                if !message.status.is_live() {
                    continue;
                }
                index
                    .entry(context.name.clone())
                    .or_default()
                    .entry(message.source.clone())
                    .or_default()
                    .push((context_index, message_index));
            }
        }
        Ok(Self {
            catalog,
            rule,
            index,
            include_unfinished: true,
        })
    }

    /// Whether unfinished translations are served. Enabled by default, the
    /// way `lrelease` compiles them unless told otherwise.
    /// （設定是否提供未完成的翻譯；預設與 `lrelease` 相同為啟用。）
    pub fn with_unfinished(mut self, include: bool) -> Self {
        self.include_unfinished = include;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn language(&self) -> Option<&str> {
        self.catalog.language.as_deref()
    }

    pub fn numerus_rule(&self) -> NumerusRule {
        self.rule
    }

    /// Translation of `source`, or `source` itself when the message is
    /// missing, excluded, or translated to nothing yet.
    /// （回傳 `source` 的翻譯；缺少或尚未翻譯時回傳原文。）
    pub fn lookup<'a>(&'a self, context: &str, source: &'a str, comment: Option<&str>) -> &'a str {
        match self.find(context, source, comment).map(|message| &message.translation) {
            Some(Translation::Singular(text)) if !text.is_empty() => text.as_str(),
            Some(Translation::Plural(forms)) => forms
                .first()
                .filter(|form| !form.is_empty())
                .map_or(source, String::as_str),
            _ => source,
        }
    }

    /// Numerus form for `count` under the catalog language's rule.
    /// （依目錄語言規則回傳 `count` 對應的複數形式。）
    pub fn lookup_plural<'a>(&'a self, context: &str, source: &'a str, count: u64) -> &'a str {
        self.lookup_plural_with_comment(context, source, None, count)
    }

    pub fn lookup_plural_with_comment<'a>(
        &'a self,
        context: &str,
        source: &'a str,
        comment: Option<&str>,
        count: u64,
    ) -> &'a str {
        match self.find(context, source, comment).map(|message| &message.translation) {
            Some(Translation::Plural(forms)) => forms
                .get(self.rule.form_index(count))
                .filter(|form| !form.is_empty())
                .map_or(source, String::as_str),
            Some(Translation::Singular(text)) if !text.is_empty() => text.as_str(),
            _ => source,
        }
    }

    /// Like [`Translator::lookup_plural`], with every `%n` replaced by `count`.
    /// （同 `lookup_plural`，並將 `%n` 替換為數量。）
    pub fn translate_plural(&self, context: &str, source: &str, count: u64) -> String {
        substitute_count(self.lookup_plural(context, source, count), count)
    }

    fn find(&self, context: &str, source: &str, comment: Option<&str>) -> Option<&Message> {
        let candidates = self.index.get(context)?.get(source)?;
        let wanted = comment.unwrap_or("");
        self.first_usable(candidates, wanted).or_else(|| {
            if wanted.is_empty() {
                None
            } else {
                self.first_usable(candidates, "")
            }
        })
    }

    fn first_usable(&self, candidates: &[(usize, usize)], comment: &str) -> Option<&Message> {
        candidates
            .iter()
            .map(|&(context, message)| &self.catalog.contexts[context].messages[message])
            .find(|message| {
                message.comment_or_empty() == comment
                    && (self.include_unfinished || message.status == Status::Finished)
            })
    }
}

/// Replaces `%n` the way Qt's `tr(source, comment, n)` does.
/// （以 Qt `tr(source, comment, n)` 的方式替換 `%n`。）
pub fn substitute_count(template: &str, count: u64) -> String {
    template.replace("%n", &count.to_string())
}

#[derive(Debug, Clone)]
pub struct LocaleCatalogStats {
    pub language: String,
    pub stats: CatalogStats,
}

/// Catalogs for several target languages with one active at a time. With no
/// active language every lookup returns the source text.
/// （管理多個語言目錄，同時僅啟用一個；未啟用時回傳原文。）
#[derive(Debug, Clone, Default)]
pub struct TranslationManager {
    translators: Vec<Translator>,
    active: Option<usize>,
}

impl TranslationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.ts` file in `path`. A missing directory yields an
    /// empty manager.
    /// （載入目錄中所有 `*.ts` 檔；目錄不存在時回傳空管理器。）
    pub fn load_from_dir(
        path: impl AsRef<Path>,
        policy: SchemaPolicy,
        include_unfinished: bool,
    ) -> Result<Self, CatalogError> {
        let dir = path.as_ref();
        let mut manager = Self::new();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(manager),
            Err(source) => {
                return Err(CatalogError::ReadDir {
                    path: dir.to_path_buf(),
                    source,
                })
            }
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CatalogError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("ts") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let bytes = fs::read(&path).map_err(|source| CatalogError::Read {
                path: path.clone(),
                source,
            })?;
            let report = parse_bytes_with_policy(&bytes, policy)?;
            if report.catalog.language.is_none() {
                return Err(CatalogError::MissingLanguage { path });
            }
            tracing::debug!(
                path = %path.display(),
                warnings = report.warnings.len(),
                "loaded catalog"
            );
            manager.insert(Translator::new(report.catalog)?.with_unfinished(include_unfinished))?;
        }
        Ok(manager)
    }

    /// Adds a translator; its catalog must carry a language not yet present.
    /// （加入翻譯器；其目錄須標示尚未存在的語言。）
    pub fn insert(&mut self, translator: Translator) -> Result<(), CatalogError> {
        let Some(language) = translator.language().map(str::to_string) else {
            return Err(CatalogError::UntaggedCatalog);
        };
        if self.position(&language).is_some() {
            return Err(CatalogError::DuplicateLanguage(language));
        }
        self.translators.push(translator);
        Ok(())
    }

    pub fn languages(&self) -> Vec<&str> {
        self.translators
            .iter()
            .map(|translator| translator.language().unwrap_or_default())
            .collect()
    }

    pub fn active_language(&self) -> Option<&str> {
        self.active.and_then(|index| self.translators[index].language())
    }

    /// Switches languages; `de_DE` and `de-DE` name the same catalog.
    /// （切換語言；`de_DE` 與 `de-DE` 視為相同。）
    pub fn set_active_by_code(&mut self, code: &str) -> bool {
        match self.position(code) {
            Some(index) => {
                self.active = Some(index);
                true
            }
            None => false,
        }
    }

    /// Returns to the source language.
    /// （回到原文語言。）
    pub fn clear_active(&mut self) {
        self.active = None;
    }

    pub fn translator(&self, code: &str) -> Option<&Translator> {
        self.position(code).map(|index| &self.translators[index])
    }

    pub fn translate<'a>(
        &'a self,
        context: &str,
        source: &'a str,
        comment: Option<&str>,
    ) -> &'a str {
        match self.active {
            Some(index) => self.translators[index].lookup(context, source, comment),
            None => source,
        }
    }

    pub fn translate_plural(&self, context: &str, source: &str, count: u64) -> String {
        match self.active {
            Some(index) => self.translators[index].translate_plural(context, source, count),
            None => substitute_count(source, count),
        }
    }

    pub fn catalog_stats(&self) -> Vec<LocaleCatalogStats> {
        self.translators
            .iter()
            .map(|translator| LocaleCatalogStats {
                language: translator.language().unwrap_or_default().to_string(),
                stats: translator.catalog().stats(),
            })
            .collect()
    }

    fn position(&self, code: &str) -> Option<usize> {
        let wanted = normalize_code(code);
        self.translators.iter().position(|translator| {
            translator
                .language()
                .is_some_and(|language| normalize_code(language) == wanted)
        })
    }
}

fn normalize_code(code: &str) -> String {
    code.replace('-', "_").to_ascii_lowercase()
}
