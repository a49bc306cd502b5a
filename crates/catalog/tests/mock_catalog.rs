use lingcat_catalog::{
    parse_str, validate, Catalog, CheckConfig, IssueKind, Location, Status, Translation, Translator,
};

const MOCK_TS: &str = include_str!("fixtures/mock_test.ts");

fn mock() -> Catalog {
    parse_str(MOCK_TS).expect("parse mock catalog")
}

#[test]
fn header_and_context_are_read() {
    let catalog = mock();
    assert_eq!(catalog.version, "2.0");
    assert_eq!(catalog.language.as_deref(), Some("de_DE"));
    assert_eq!(catalog.contexts.len(), 1);
    assert_eq!(catalog.contexts[0].name, "TestContext");
    assert_eq!(catalog.contexts[0].messages.len(), 9);
}

#[test]
fn regular_message_with_comment_and_location() {
    let catalog = mock();
    let message = &catalog.contexts[0].messages[0];
    assert_eq!(message.source, "Regular message");
    assert_eq!(message.comment.as_deref(), Some("With regular comment"));
    assert_eq!(message.locations, vec![Location::new("../src/dummy.cpp", 42)]);
    assert_eq!(message.status, Status::Unfinished);
    assert_eq!(message.translation, Translation::Singular(String::new()));
}

#[test]
fn status_follows_type_attribute() {
    let catalog = mock();
    let statuses: Vec<Status> = catalog.messages().map(|(_, message)| message.status).collect();
    assert_eq!(
        statuses,
        vec![
            Status::Unfinished,
            Status::Unfinished,
            Status::Finished,
            Status::Unfinished,
            Status::Unfinished,
            Status::Finished,
            Status::Unfinished,
            Status::Unfinished,
            Status::Finished,
        ]
    );
}

#[test]
fn multi_line_text_is_preserved_exactly() {
    let catalog = mock();
    let messages = &catalog.contexts[0].messages;
    assert_eq!(messages[3].source, "Multi\nline\nmessage");
    assert_eq!(messages[4].source, "Multi line\nmessage\n(mock translated)");
    assert_eq!(
        messages[4].translation,
        Translation::Singular("Multi line\nmock\ntranslation".to_string())
    );
    assert_eq!(
        messages[5].translation,
        Translation::Singular("Multi line\nmanual\ntranslation".to_string())
    );
}

#[test]
fn numerus_messages_keep_their_forms() {
    let catalog = mock();
    let messages = &catalog.contexts[0].messages;
    assert!(messages[6].is_plural());
    assert_eq!(messages[6].translation, Translation::Plural(vec![String::new()]));
    assert_eq!(
        messages[7].translation,
        Translation::Plural(vec![
            "%n mock translation".to_string(),
            "%n mock translation(s)".to_string(),
        ])
    );
    assert_eq!(messages[8].status, Status::Finished);
    assert!(messages.iter().take(6).all(|message| !message.is_plural()));
}

#[test]
fn unfinished_empty_translation_falls_back_to_source() {
    let translator = Translator::new(mock()).unwrap();
    assert_eq!(
        translator.lookup("TestContext", "Regular message", Some("With regular comment")),
        "Regular message"
    );
}

#[test]
fn finished_translation_is_returned() {
    let translator = Translator::new(mock()).unwrap();
    assert_eq!(
        translator.lookup("TestContext", "Regular message (manually translated)", None),
        "Manual translation"
    );
    assert_eq!(
        translator.lookup("TestContext", "Regular message (mock translated)", None),
        "Mock translation"
    );
}

#[test]
fn plural_lookup_uses_german_rule() {
    let translator = Translator::new(mock()).unwrap();
    let source = "%n numerus message(s) (mock translated)";
    assert_eq!(translator.lookup_plural("TestContext", source, 1), "%n mock translation");
    assert_eq!(translator.lookup_plural("TestContext", source, 5), "%n mock translation(s)");
    assert_eq!(translator.lookup_plural("TestContext", source, 0), "%n mock translation(s)");
    assert_eq!(
        translator.translate_plural("TestContext", "Numerus message(s) (manually translated)", 3),
        "3 manual translation(s)"
    );
}

#[test]
fn irregular_numerus_entry_falls_back_to_source() {
    let translator = Translator::new(mock()).unwrap();
    let source = "%n numerus message(s)";
    assert_eq!(translator.lookup_plural("TestContext", source, 1), source);
    assert_eq!(translator.lookup_plural("TestContext", source, 7), source);
}

#[test]
fn validation_reports_only_the_short_numerus_entry() {
    let issues = validate(&mock(), &CheckConfig::default()).unwrap();
    assert_eq!(issues.len(), 1, "{issues:?}");
    assert_eq!(issues[0].source, "%n numerus message(s)");
    assert_eq!(
        issues[0].kind,
        IssueKind::NumerusArity {
            expected: 2,
            found: 1
        }
    );
}

#[test]
fn stats_match_file() {
    let stats = mock().stats();
    assert_eq!(stats.messages, 9);
    assert_eq!(stats.finished, 3);
    assert_eq!(stats.unfinished, 6);
    assert_eq!(stats.plural, 3);
}
