extern crate stache;
use stache::{CompileError, FormatCompiler, FormatError, RenderError, Template, TagBehavior, TagDefinition, Value};


fn compile_error(text: &str) -> CompileError {
    match Template::from(text) {
        Err(error) => error,
        Ok(_) => panic!("expected {:?} to fail", text),
    }
}

#[test]
fn unknown_tag_is_named() {
    let error = compile_error("{{#bogus}}...{{/bogus}}");
    assert!(matches!(error, CompileError::UnknownTag { .. }));
    assert_eq!(error.tag_name(), Some("bogus"));
    assert!(error.to_string().contains("bogus"));
}

#[test]
fn unknown_tag_location() {
    let error = compile_error("line one\nxx {{#nope a b}}");
    let location = error.location().unwrap();
    assert_eq!((location.line, location.column), (2, 4));
    assert_eq!(location.offset, 12);
}

#[test]
fn stray_closing_tag() {
    assert!(matches!(compile_error("text{{/if}}"), CompileError::UnexpectedTag { .. }));
    assert!(matches!(compile_error("text{{/bogus}}"), CompileError::UnknownTag { .. }));
}

#[test]
fn context_sensitive_tag_outside_parent() {
    let error = compile_error("{{#else}}x");
    assert!(matches!(error, CompileError::UnexpectedTag { .. }));
    assert_eq!(error.tag_name(), Some("else"));
}

#[test]
fn malformed_arguments() {
    let error = compile_error("{{#if 'unterminated}}x{{/if}}");
    assert!(matches!(error, CompileError::MalformedTag { .. }));
    assert_eq!(error.tag_name(), Some("if"));
}

#[test]
fn too_many_arguments() {
    match compile_error("{{#each a b}}{{/each}}") {
        CompileError::WrongArgumentCount { name, expected, found, .. } => {
            assert_eq!(name, "each");
            assert_eq!((expected, found), (1, 2));
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn missing_required_argument() {
    match compile_error("{{#with}}{{/with}}") {
        CompileError::MissingArgument { name, parameter, .. } => {
            assert_eq!(name, "with");
            assert_eq!(parameter, "context");
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn missing_closing_tag() {
    let error = compile_error("{{#if a}}never closed");
    assert!(matches!(error, CompileError::MissingClosingTag { .. }));
    assert_eq!(error.location().map(|l| l.offset), Some(0));
}

#[test]
fn duplicate_registration() {
    struct Plain;
    impl TagBehavior for Plain {}

    let mut compiler = FormatCompiler::new();
    compiler.register(TagDefinition::inline("stamp", Plain)).unwrap();
    let error = compiler.register(TagDefinition::content("stamp", Plain)).unwrap_err();
    assert!(matches!(error, CompileError::DuplicateTag(ref name) if name == "stamp"));
    assert!(compiler.register(TagDefinition::inline("each", Plain)).is_err());
}

#[test]
fn missing_key_fails_the_render() {
    let template = Template::from("{{a.b.c}}").unwrap();
    let data = Value::from_iter([("a", Value::from_iter([("b", Value::empty_mapping())]))]);
    match template.render(&data) {
        Err(RenderError::KeyNotFound { key, member }) => {
            assert_eq!(key, "a.b.c");
            assert_eq!(member, "c");
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn missing_variable_fails_the_render() {
    let template = Template::from("{{@nothing}}").unwrap();
    let data = Value::from_iter([("nothing", 1)]);
    assert!(matches!(template.render(&data), Err(RenderError::KeyNotFound { .. })));
}

#[test]
fn missing_argument_key_fails_the_render() {
    let template = Template::from("{{#each missing}}x{{/each}}").unwrap();
    assert!(template.render(&Value::empty_mapping()).is_err());
}

#[test]
fn bad_format_names_the_key() {
    let template = Template::from("{{price:Q}} {{ratio:D}}").unwrap();
    let data = Value::from_iter([("price", Value::Int(1)), ("ratio", Value::Float(0.5))]);
    match template.render(&data) {
        Err(RenderError::Format { key, source }) => {
            assert_eq!(key, "price");
            assert_eq!(source, FormatError::InvalidSpecifier("Q".to_owned()));
        },
        other => panic!("unexpected {:?}", other),
    }

    let template = Template::from("{{ratio:D}}").unwrap();
    assert!(matches!(
        template.render(&data),
        Err(RenderError::Format { source: FormatError::Unsupported { .. }, .. })
    ));
}
