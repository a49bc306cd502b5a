//! Reader for the Qt Linguist `.ts` XML format.
//!
//! The document is walked with a pull parser so that every schema
//! irregularity can be reported with its position, and so that text content
//! (sources, translations, comments) is taken over byte for byte, without
//! whitespace normalization.

use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, SchemaWarning};
use crate::model::{
    Catalog, Context, LineNumber, Location, Message, Status, Translation, DEFAULT_FORMAT_VERSION,
};

/// What to do with well-formed XML that does not follow the `.ts` schema.
/// （遇到格式正確但不符 `.ts` 結構的 XML 時的處理方式。）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaPolicy {
    /// Skip the offending element (or message) and record a warning.
    #[default]
    Lenient,
    /// Fail the whole catalog on the first irregularity.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseReport {
    pub catalog: Catalog,
    pub warnings: Vec<SchemaWarning>,
}

/// Parses a catalog with [`SchemaPolicy::Lenient`].
/// （以寬鬆策略解析目錄。）
pub fn parse_str(input: &str) -> Result<Catalog, CatalogError> {
    parse_with_policy(input, SchemaPolicy::Lenient).map(|report| report.catalog)
}

/// Parses raw file contents, rejecting anything that is not UTF-8.
/// （解析原始檔案內容，拒絕非 UTF-8 的輸入。）
pub fn parse_bytes(bytes: &[u8]) -> Result<Catalog, CatalogError> {
    parse_str(decode_utf8(bytes)?)
}

pub fn parse_bytes_with_policy(
    bytes: &[u8],
    policy: SchemaPolicy,
) -> Result<ParseReport, CatalogError> {
    parse_with_policy(decode_utf8(bytes)?, policy)
}

pub fn parse_with_policy(input: &str, policy: SchemaPolicy) -> Result<ParseReport, CatalogError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut parser = TsParser::new(input, policy);
    let catalog = parser.parse_document()?;
    Ok(ParseReport {
        catalog,
        warnings: parser.warnings,
    })
}

fn decode_utf8(bytes: &[u8]) -> Result<&str, CatalogError> {
    std::str::from_utf8(bytes).map_err(|error| CatalogError::Encoding {
        offset: error.valid_up_to(),
    })
}

struct TsParser<'a> {
    input: &'a str,
    reader: Reader<&'a [u8]>,
    policy: SchemaPolicy,
    warnings: Vec<SchemaWarning>,
}

impl<'a> TsParser<'a> {
    fn new(input: &'a str, policy: SchemaPolicy) -> Self {
        let mut reader = Reader::from_str(input);
        reader.expand_empty_elements(true);
        Self {
            input,
            reader,
            policy,
            warnings: Vec::new(),
        }
    }

    fn parse_document(&mut self) -> Result<Catalog, CatalogError> {
        let mut catalog = None;
        loop {
            match self.next_event()? {
                Event::Decl(decl) => self.check_declared_encoding(&decl)?,
                Event::Start(start) => {
                    if start.name().as_ref() == b"TS" && catalog.is_none() {
                        catalog = Some(self.parse_ts(&start)?);
                    } else {
                        self.skip_unknown(&start, "document")?;
                    }
                }
                Event::Text(text) => self.expect_layout(&text, "document")?,
                Event::Eof => break,
                _ => {}
            }
        }
        catalog.ok_or_else(|| {
            let (line, column) = self.position();
            CatalogError::Schema {
                line,
                column,
                reason: "document has no <TS> root element".to_string(),
            }
        })
    }

    fn parse_ts(&mut self, start: &BytesStart<'_>) -> Result<Catalog, CatalogError> {
        let mut catalog = Catalog {
            version: DEFAULT_FORMAT_VERSION.to_string(),
            ..Catalog::default()
        };
        for (key, value) in self.attributes(start)? {
            match key.as_str() {
                "version" => catalog.version = value,
                "language" => catalog.language = Some(value),
                "sourcelanguage" => catalog.source_language = Some(value),
                _ => self.irregular(format!("unknown <TS> attribute '{key}'"))?,
            }
        }
        loop {
            match self.next_event()? {
                Event::Start(child) => match child.name().as_ref() {
                    b"context" => catalog.contexts.push(self.parse_context()?),
                    _ => self.skip_unknown(&child, "TS")?,
                },
                Event::End(_) => return Ok(catalog),
                Event::Text(text) => self.expect_layout(&text, "TS")?,
                Event::Eof => return Err(self.unexpected_eof("TS")),
                _ => {}
            }
        }
    }

    fn parse_context(&mut self) -> Result<Context, CatalogError> {
        let mut name = None;
        let mut messages = Vec::new();
        loop {
            match self.next_event()? {
                Event::Start(child) => match child.name().as_ref() {
                    b"name" => name = Some(self.read_text("name")?),
                    b"message" => {
                        if let Some(message) = self.parse_message(&child)? {
                            messages.push(message);
                        }
                    }
                    _ => self.skip_unknown(&child, "context")?,
                },
                Event::End(_) => break,
                Event::Text(text) => self.expect_layout(&text, "context")?,
                Event::Eof => return Err(self.unexpected_eof("context")),
                _ => {}
            }
        }
        let name = match name {
            Some(name) => name,
            None => {
                self.irregular("<context> without <name>")?;
                String::new()
            }
        };
        Ok(Context { name, messages })
    }

    /// Returns `None` when a malformed message was skipped.
    fn parse_message(&mut self, start: &BytesStart<'_>) -> Result<Option<Message>, CatalogError> {
        let mut plural = false;
        let mut utf8 = None;
        for (key, value) in self.attributes(start)? {
            match key.as_str() {
                "numerus" => plural = value == "yes",
                "utf8" => utf8 = Some(value),
                _ => self.irregular(format!("unknown <message> attribute '{key}'"))?,
            }
        }

        let mut locations = Vec::new();
        let mut source = None;
        let mut comment = None;
        let mut extra_comment = None;
        let mut translator_comment = None;
        let mut translation = None;
        loop {
            match self.next_event()? {
                Event::Start(child) => match child.name().as_ref() {
                    b"location" => locations.push(self.parse_location(&child)?),
                    b"source" => source = Some(self.read_text("source")?),
                    b"comment" => comment = Some(self.read_text("comment")?),
                    b"extracomment" => extra_comment = Some(self.read_text("extracomment")?),
                    b"translatorcomment" => {
                        translator_comment = Some(self.read_text("translatorcomment")?)
                    }
                    b"translation" => translation = Some(self.parse_translation(&child, plural)?),
                    _ => self.skip_unknown(&child, "message")?,
                },
                Event::End(_) => break,
                Event::Text(text) => self.expect_layout(&text, "message")?,
                Event::Eof => return Err(self.unexpected_eof("message")),
                _ => {}
            }
        }

        let Some(source) = source else {
            self.irregular("<message> without <source> skipped")?;
            return Ok(None);
        };
        let (translation, status) = match translation {
            Some(parsed) => parsed,
            None => {
                self.irregular(format!("message '{source}' has no <translation>"))?;
                let empty = if plural {
                    Translation::Plural(Vec::new())
                } else {
                    Translation::Singular(String::new())
                };
                (empty, Status::Unfinished)
            }
        };
        Ok(Some(Message {
            locations,
            source,
            comment,
            extra_comment,
            translator_comment,
            utf8,
            translation,
            status,
        }))
    }

    fn parse_location(&mut self, start: &BytesStart<'_>) -> Result<Location, CatalogError> {
        let mut location = Location {
            filename: None,
            line: None,
        };
        for (key, value) in self.attributes(start)? {
            match key.as_str() {
                "filename" => location.filename = Some(value),
                "line" => match LineNumber::parse(&value) {
                    Some(line) => location.line = Some(line),
                    None => self.irregular(format!("invalid location line '{value}'"))?,
                },
                _ => self.irregular(format!("unknown <location> attribute '{key}'"))?,
            }
        }
        self.skip_element()?;
        Ok(location)
    }

    fn parse_translation(
        &mut self,
        start: &BytesStart<'_>,
        plural: bool,
    ) -> Result<(Translation, Status), CatalogError> {
        let mut status = Status::Finished;
        for (key, value) in self.attributes(start)? {
            match key.as_str() {
                "type" => match Status::from_type_attr(Some(value.as_str())) {
                    Some(parsed) => status = parsed,
                    None => {
                        let (line, column) = self.position();
                        return Err(CatalogError::UnknownStatus {
                            value,
                            line,
                            column,
                        });
                    }
                },
                _ => self.irregular(format!("unknown <translation> attribute '{key}'"))?,
            }
        }

        if !plural {
            let text = self.read_text("translation")?;
            return Ok((Translation::Singular(text), status));
        }

        let mut forms = Vec::new();
        loop {
            match self.next_event()? {
                Event::Start(child) => match child.name().as_ref() {
                    b"numerusform" => forms.push(self.read_text("numerusform")?),
                    _ => self.skip_unknown(&child, "translation")?,
                },
                Event::End(_) => break,
                Event::Text(text) => self.expect_layout(&text, "translation")?,
                Event::CData(_) => self.irregular("character data outside <numerusform>")?,
                Event::Eof => return Err(self.unexpected_eof("translation")),
                _ => {}
            }
        }
        Ok((Translation::Plural(forms), status))
    }

    /// Collects the text content of the current element up to its end tag.
    fn read_text(&mut self, element: &str) -> Result<String, CatalogError> {
        let mut text = String::new();
        loop {
            match self.next_event()? {
                Event::Text(chunk) => match chunk.unescape() {
                    Ok(unescaped) => text.push_str(&unescaped),
                    Err(error) => return Err(self.xml_error(error.to_string())),
                },
                Event::CData(chunk) => {
                    text.push_str(&String::from_utf8_lossy(&chunk.into_inner()));
                }
                Event::Start(child) => {
                    if child.name().as_ref() == b"byte" {
                        if let Some(decoded) = self.parse_byte(&child)? {
                            text.push(decoded);
                        }
                    } else {
                        self.skip_unknown(&child, element)?;
                    }
                }
                Event::End(_) => return Ok(text),
                Event::Eof => return Err(self.unexpected_eof(element)),
                _ => {}
            }
        }
    }

    /// Decodes `<byte value="x1b"/>`, which lupdate writes for characters
    /// XML cannot carry literally.
    fn parse_byte(&mut self, start: &BytesStart<'_>) -> Result<Option<char>, CatalogError> {
        let value = self
            .attributes(start)?
            .into_iter()
            .find(|(key, _)| key == "value")
            .map(|(_, value)| value);
        self.skip_element()?;
        let decoded = value
            .as_deref()
            .and_then(|raw| match raw.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => raw.parse().ok(),
            })
            .and_then(char::from_u32);
        if decoded.is_none() {
            self.irregular(format!("invalid <byte> value {value:?}"))?;
        }
        Ok(decoded)
    }

    fn attributes(&self, start: &BytesStart<'_>) -> Result<Vec<(String, String)>, CatalogError> {
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|error| self.xml_error(error.to_string()))?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|error| self.xml_error(error.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(attributes)
    }

    fn check_declared_encoding(&self, decl: &BytesDecl<'_>) -> Result<(), CatalogError> {
        if let Some(Ok(encoding)) = decl.encoding() {
            let label = String::from_utf8_lossy(&encoding).to_ascii_lowercase();
            if label != "utf-8" && label != "utf8" {
                return Err(CatalogError::UnsupportedEncoding(label));
            }
        }
        Ok(())
    }

    fn skip_unknown(&mut self, start: &BytesStart<'_>, parent: &str) -> Result<(), CatalogError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        self.irregular(format!("unexpected <{name}> inside <{parent}>"))?;
        self.skip_element()
    }

    /// Consumes events up to and including the end tag of the element whose
    /// start tag was just read.
    fn skip_element(&mut self) -> Result<(), CatalogError> {
        let mut depth = 0usize;
        loop {
            match self.next_event()? {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                Event::Eof => return Err(self.unexpected_eof("element")),
                _ => {}
            }
        }
    }

    /// Text between structural elements must be indentation only.
    fn expect_layout(&mut self, text: &BytesText<'_>, parent: &str) -> Result<(), CatalogError> {
        if text.iter().all(u8::is_ascii_whitespace) {
            Ok(())
        } else {
            self.irregular(format!("stray text inside <{parent}>"))
        }
    }

    fn irregular(&mut self, reason: impl Into<String>) -> Result<(), CatalogError> {
        let (line, column) = self.position();
        let reason = reason.into();
        match self.policy {
            SchemaPolicy::Strict => Err(CatalogError::Schema {
                line,
                column,
                reason,
            }),
            SchemaPolicy::Lenient => {
                tracing::warn!(line, column, "{reason}");
                self.warnings.push(SchemaWarning {
                    line,
                    column,
                    reason,
                });
                Ok(())
            }
        }
    }

    fn next_event(&mut self) -> Result<Event<'a>, CatalogError> {
        match self.reader.read_event() {
            Ok(event) => Ok(event),
            Err(error) => Err(self.xml_error(error.to_string())),
        }
    }

    fn xml_error(&self, message: String) -> CatalogError {
        let (line, column) = self.position();
        CatalogError::Xml {
            line,
            column,
            message,
        }
    }

    fn unexpected_eof(&self, element: &str) -> CatalogError {
        self.xml_error(format!("unexpected end of document inside <{element}>"))
    }

    fn position(&self) -> (usize, usize) {
        line_column(self.input, self.reader.buffer_position())
    }
}

/// 1-based line and column (in characters) of a byte offset.
fn line_column(input: &str, offset: usize) -> (usize, usize) {
    let consumed = &input.as_bytes()[..offset.min(input.len())];
    let line_start = consumed
        .iter()
        .rposition(|&byte| byte == b'\n')
        .map_or(0, |index| index + 1);
    let line = consumed.iter().filter(|&&byte| byte == b'\n').count() + 1;
    let column = consumed[line_start..]
        .iter()
        .filter(|&&byte| byte & 0xC0 != 0x80)
        .count()
        + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE TS>\n<TS version=\"2.0\" language=\"de_DE\">\n<context>\n    <name>Ctx</name>\n{body}\n</context>\n</TS>\n"
        )
    }

    #[test]
    fn line_column_counts_characters() {
        let input = "ab\nüx";
        assert_eq!(line_column(input, 0), (1, 1));
        assert_eq!(line_column(input, 3), (2, 1));
        assert_eq!(line_column(input, 5), (2, 2));
    }

    #[test]
    fn entities_and_cdata_are_decoded() {
        let catalog = parse_str(&wrap(
            "<message><source>&lt;html&gt;Degrees&lt;/html&gt;</source><translation>&apos;<![CDATA[<b>]]></translation></message>",
        ))
        .expect("parse");
        let message = &catalog.contexts[0].messages[0];
        assert_eq!(message.source, "<html>Degrees</html>");
        assert_eq!(message.translation, Translation::Singular("'<b>".to_string()));
    }

    #[test]
    fn byte_elements_become_characters() {
        let catalog = parse_str(&wrap(
            "<message><source>a<byte value=\"x1b\"/>b</source><translation></translation></message>",
        ))
        .expect("parse");
        assert_eq!(catalog.contexts[0].messages[0].source, "a\u{1b}b");
    }

    #[test]
    fn whitespace_only_comments_are_kept() {
        let catalog = parse_str(&wrap(
            "<message><source>&amp;Separator:</source><translatorcomment>\t</translatorcomment><translation>&amp;Trennzeichen:</translation></message>",
        ))
        .expect("parse");
        let message = &catalog.contexts[0].messages[0];
        assert_eq!(message.translator_comment.as_deref(), Some("\t"));
        assert_eq!(message.status, Status::Finished);
    }

    #[test]
    fn relative_locations_without_filename() {
        let catalog = parse_str(&wrap(
            "<message><location line=\"+26\"/><location filename=\"main.cpp\" line=\"65\"/><source>x</source><translation>y</translation></message>",
        ))
        .expect("parse");
        let locations = &catalog.contexts[0].messages[0].locations;
        assert_eq!(locations[0].filename, None);
        assert_eq!(locations[0].line, Some(LineNumber::Relative(26)));
        assert_eq!(locations[1], Location::new("main.cpp", 65));
    }

    #[test]
    fn bom_is_skipped() {
        let input = format!("\u{feff}{}", wrap(""));
        let catalog = parse_str(&input).expect("parse");
        assert_eq!(catalog.contexts[0].name, "Ctx");
    }

    #[test]
    fn declared_legacy_encoding_is_rejected() {
        let input = "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><TS version=\"2.0\"></TS>";
        let error = parse_str(input).unwrap_err();
        assert!(matches!(error, CatalogError::UnsupportedEncoding(label) if label == "iso-8859-1"));
    }

    #[test]
    fn missing_root_is_a_schema_error() {
        let error = parse_str("<?xml version=\"1.0\"?><catalog/>").unwrap_err();
        assert!(matches!(error, CatalogError::Schema { .. }));
    }

    #[test]
    fn unterminated_document_reports_eof() {
        let error = parse_str("<TS version=\"2.0\"><context><name>x</name>").unwrap_err();
        assert!(matches!(error, CatalogError::Xml { .. }), "{error:?}");
    }
}
