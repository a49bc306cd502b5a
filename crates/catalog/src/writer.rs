use quick_xml::escape::escape;
use std::io;

use crate::model::{Catalog, Context, Location, Message, Translation};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";
const DOCTYPE: &str = "<!DOCTYPE TS>\n";

/// Renders a catalog in the layout lupdate produces.
/// （以 lupdate 的排版輸出目錄。）
pub fn to_ts_string(catalog: &Catalog) -> String {
    let mut out = String::with_capacity(256 + catalog.contexts.len() * 512);
    out.push_str(XML_DECLARATION);
    out.push_str(DOCTYPE);
    out.push_str("<TS");
    push_attribute(&mut out, "version", &catalog.version);
    if let Some(language) = &catalog.language {
        push_attribute(&mut out, "language", language);
    }
    if let Some(source_language) = &catalog.source_language {
        push_attribute(&mut out, "sourcelanguage", source_language);
    }
    out.push_str(">\n");
    for context in &catalog.contexts {
        push_context(&mut out, context);
    }
    out.push_str("</TS>\n");
    out
}

pub fn write_to<W: io::Write>(catalog: &Catalog, mut writer: W) -> io::Result<()> {
    writer.write_all(to_ts_string(catalog).as_bytes())?;
    writer.flush()
}

fn push_context(out: &mut String, context: &Context) {
    out.push_str("<context>\n");
    push_element(out, 4, "name", &context.name);
    for message in &context.messages {
        push_message(out, message);
    }
    out.push_str("</context>\n");
}

fn push_message(out: &mut String, message: &Message) {
    out.push_str("    <message");
    if message.is_plural() {
        push_attribute(out, "numerus", "yes");
    }
    if let Some(utf8) = &message.utf8 {
        push_attribute(out, "utf8", utf8);
    }
    out.push_str(">\n");
    for location in &message.locations {
        push_location(out, location);
    }
    push_element(out, 8, "source", &message.source);
    if let Some(comment) = &message.comment {
        push_element(out, 8, "comment", comment);
    }
    if let Some(comment) = &message.extra_comment {
        push_element(out, 8, "extracomment", comment);
    }
    if let Some(comment) = &message.translator_comment {
        push_element(out, 8, "translatorcomment", comment);
    }

    out.push_str("        <translation");
    if let Some(kind) = message.status.type_attr() {
        push_attribute(out, "type", kind);
    }
    out.push('>');
    match &message.translation {
        Translation::Singular(text) => push_text(out, text),
        Translation::Plural(forms) if forms.is_empty() => {}
        Translation::Plural(forms) => {
            out.push('\n');
            for form in forms {
                push_element(out, 12, "numerusform", form);
            }
            out.push_str("        ");
        }
    }
    out.push_str("</translation>\n");
    out.push_str("    </message>\n");
}

fn push_location(out: &mut String, location: &Location) {
    out.push_str("        <location");
    if let Some(filename) = &location.filename {
        push_attribute(out, "filename", filename);
    }
    if let Some(line) = location.line {
        push_attribute(out, "line", &line.to_string());
    }
    out.push_str("/>\n");
}

fn push_element(out: &mut String, indent: usize, name: &str, text: &str) {
    out.extend(std::iter::repeat(' ').take(indent));
    out.push('<');
    out.push_str(name);
    out.push('>');
    push_text(out, text);
    out.push_str("</");
    out.push_str(name);
    out.push_str(">\n");
}

fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape(value));
    out.push('"');
}

/// Escapes text content. Control characters XML cannot carry are written as
/// `<byte>` elements; carriage returns as a character reference so readers
/// do not normalize them away.
fn push_text(out: &mut String, text: &str) {
    let mut run_start = 0;
    for (index, ch) in text.char_indices() {
        let replacement = match ch {
            '\t' | '\n' => continue,
            '\r' => "&#xd;".to_string(),
            ch if (ch as u32) < 0x20 => format!("<byte value=\"x{:x}\"/>", ch as u32),
            _ => continue,
        };
        out.push_str(&escape(&text[run_start..index]));
        out.push_str(&replacement);
        run_start = index + ch.len_utf8();
    }
    out.push_str(&escape(&text[run_start..]));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Status, DEFAULT_FORMAT_VERSION};

    fn escaped(text: &str) -> String {
        let mut out = String::new();
        push_text(&mut out, text);
        out
    }

    #[test]
    fn markup_characters_are_escaped() {
        assert_eq!(
            escaped("<html>Tom's \"&\"</html>"),
            "&lt;html&gt;Tom&apos;s &quot;&amp;&quot;&lt;/html&gt;"
        );
    }

    #[test]
    fn control_characters_use_byte_elements() {
        assert_eq!(escaped("a\tb\nc"), "a\tb\nc");
        assert_eq!(escaped("a\u{1b}b"), "a<byte value=\"x1b\"/>b");
        assert_eq!(escaped("line\r\n"), "line&#xd;\n");
    }

    #[test]
    fn header_and_status_attributes() {
        let catalog = Catalog::new("de_DE").with_context(
            Context::new("TestContext")
                .with_message(Message::singular("Done", "Fertig", Status::Finished))
                .with_message(Message::singular("Later", "", Status::Unfinished))
                .with_message(Message::plural(
                    "%n file(s)",
                    Vec::<String>::new(),
                    Status::Vanished,
                )),
        );
        let xml = to_ts_string(&catalog);
        assert!(xml.starts_with(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE TS>\n<TS version=\"2.0\" language=\"de_DE\">\n"
        ));
        assert!(xml.contains("        <translation>Fertig</translation>\n"));
        assert!(xml.contains("        <translation type=\"unfinished\"></translation>\n"));
        assert!(xml.contains(
            "    <message numerus=\"yes\">\n        <source>%n file(s)</source>\n        <translation type=\"vanished\"></translation>\n"
        ));
        assert_eq!(catalog.version, DEFAULT_FORMAT_VERSION);
    }

    #[test]
    fn numerus_forms_are_indented() {
        let message = Message::plural(
            "%n flight(s) exported",
            ["%n Flug exportiert", "%n Flüge exportiert"],
            Status::Finished,
        )
        .with_location(Location::new(
            "../src/gui/windows/objectList/FlightListWindow.cpp",
            227,
        ));
        let catalog = Catalog::new("de_DE")
            .with_context(Context::new("FlightListWindow").with_message(message));
        let expected = "<context>
    <name>FlightListWindow</name>
    <message numerus=\"yes\">
        <location filename=\"../src/gui/windows/objectList/FlightListWindow.cpp\" line=\"227\"/>
        <source>%n flight(s) exported</source>
        <translation>
            <numerusform>%n Flug exportiert</numerusform>
            <numerusform>%n Flüge exportiert</numerusform>
        </translation>
    </message>
</context>
";
        assert!(to_ts_string(&catalog).contains(expected));
    }
}
