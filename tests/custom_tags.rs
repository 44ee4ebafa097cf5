extern crate stache;
use stache::{
    is_truthy, Arguments, FormatCompiler, NestedContext, RenderError, Scope, TagBehavior,
    TagDefinition, TagParameter, Value,
};

use std::sync::{Arc, Mutex};


/// Upper-cases its body.
struct Upper;

impl TagBehavior for Upper {
    fn child_contexts<'s>(
        &self, _key_scope: &'s Scope<'s>, _arguments: &Arguments, context_scope: &'s Scope<'s>
    ) -> Result<Vec<NestedContext<'s>>, RenderError> {
        Ok(vec![NestedContext::buffered(None, Some(context_scope.child()))])
    }

    fn consolidate(&self, text: String, _arguments: &Arguments) -> String {
        text.to_uppercase()
    }
}

/// The opposite of `if`, with an `otherwise` branch.
struct Unless;

impl TagBehavior for Unless {
    fn should_create_secondary_group(&self, child: &TagDefinition) -> bool {
        child.name() == "otherwise"
    }

    fn should_generate_primary_group(&self, arguments: &Arguments) -> bool {
        !is_truthy(arguments.get("condition"))
    }
}

struct Otherwise;

impl TagBehavior for Otherwise {}

/// Renders its body `count` times, exposing the round as `@round`.
struct Times;

impl TagBehavior for Times {
    fn child_contexts<'s>(
        &self, _key_scope: &'s Scope<'s>, arguments: &Arguments, context_scope: &'s Scope<'s>
    ) -> Result<Vec<NestedContext<'s>>, RenderError> {
        let count = match arguments.get("count") {
            Value::Int(count) if *count >= 0 => *count,
            other => return Err(RenderError::Tag {
                name: "times".to_owned(),
                message: format!("count must be a positive integer, got {:?}", other),
            }),
        };
        Ok((1..=count)
            .map(|round| {
                let scope = context_scope.child();
                scope.declare("round", Value::Int(round));
                NestedContext::new(None, scope)
            })
            .collect())
    }
}

/// Writes `text` joined with `separator`, `count` times.
struct Repeat;

impl TagBehavior for Repeat {
    fn text(&self, writer: &mut String, arguments: &Arguments, _context_scope: &Scope<'_>) -> Result<(), RenderError> {
        let text = arguments.get("text").as_str().unwrap_or_default().to_owned();
        let count = match arguments.get("count") {
            Value::Int(count) => *count as usize,
            _ => 1,
        };
        let separator = arguments.get("separator").as_str().unwrap_or_default().to_owned();
        writer.push_str(&vec![text; count].join(&separator));
        Ok(())
    }
}

/// A setter writing a constant into the variable named by its argument.
struct Mark;

impl TagBehavior for Mark {
    fn is_setter(&self) -> bool {
        true
    }

    fn text(&self, _writer: &mut String, arguments: &Arguments, context_scope: &Scope<'_>) -> Result<(), RenderError> {
        if let Some(name) = arguments.get("name").as_str() {
            context_scope.set(name, Some(Value::Bool(true)));
        }
        Ok(())
    }
}

/// Iterates its `source`, reported as a context to placeholder handlers.
struct Rows;

impl TagBehavior for Rows {
    fn child_context_parameters(&self) -> Vec<String> {
        vec!["source".to_owned()]
    }

    fn child_contexts<'s>(
        &self, key_scope: &'s Scope<'s>, arguments: &Arguments, context_scope: &'s Scope<'s>
    ) -> Result<Vec<NestedContext<'s>>, RenderError> {
        Ok(arguments.get("source")
            .items()
            .into_iter()
            .map(|row| NestedContext::new(Some(key_scope.child_over(row)), context_scope.child()))
            .collect())
    }
}


fn compiler() -> FormatCompiler {
    let mut compiler = FormatCompiler::new();
    compiler.register(TagDefinition::content("upper", Upper)).unwrap();
    compiler
        .register(
            TagDefinition::content("unless", Unless)
                .with_parameter(TagParameter::required("condition"))
                .with_child_tag("otherwise")
        )
        .unwrap()
        .register(
            TagDefinition::content("otherwise", Otherwise)
                .with_closing_tag("unless")
                .context_sensitive()
        )
        .unwrap()
        .register(TagDefinition::content("times", Times).with_parameter(TagParameter::required("count")))
        .unwrap()
        .register(
            TagDefinition::inline("repeat", Repeat)
                .with_parameter(TagParameter::required("text"))
                .with_parameter(TagParameter::optional("count", Value::Int(2)))
                .with_parameter(TagParameter::optional("separator", Value::text("")))
        )
        .unwrap()
        .register(TagDefinition::inline("mark", Mark).with_parameter(TagParameter::required("name")))
        .unwrap()
        .register(TagDefinition::content("rows", Rows).with_parameter(TagParameter::required("source")))
        .unwrap();
    compiler
}

fn render(text: &str, data: Value) -> String {
    compiler().compile(text).unwrap().render(&data).unwrap()
}


#[test]
fn buffered_bodies_are_consolidated() {
    let data = Value::from_iter([("name", "ann")]);
    assert_eq!(render("a{{#upper}}hi {{name}}{{/upper}}b", data), "aHI ANNb");
}

#[test]
fn secondary_group_of_a_custom_tag() {
    let template = "{{#unless busy}}free{{otherwise}}busy{{/unless}}";
    assert_eq!(render(template, Value::from_iter([("busy", false)])), "free");
    assert_eq!(render(template, Value::from_iter([("busy", true)])), "busy");
}

#[test]
fn context_sensitive_custom_tag_outside_parent() {
    assert!(compiler().compile("{{#otherwise}}x{{/unless}}").is_err());
}

#[test]
fn looping_custom_tag_with_variables() {
    assert_eq!(render("{{#times n}}{{@round}}.{{/times}}", Value::from_iter([("n", 3)])), "1.2.3.");
    assert_eq!(render("{{#times 2}}x{{/times}}", Value::Null), "xx");
}

#[test]
fn custom_tag_failures_surface_as_render_errors() {
    let template = compiler().compile("{{#times n}}x{{/times}}").unwrap();
    match template.render(&Value::from_iter([("n", "many")])) {
        Err(RenderError::Tag { name, message }) => {
            assert_eq!(name, "times");
            assert!(message.contains("many"));
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn optional_parameters_use_defaults() {
    assert_eq!(render("{{#repeat 'ab'}}", Value::Null), "abab");
    assert_eq!(render("{{#repeat 'ab' 3 '-'}}", Value::Null), "ab-ab-ab");
    assert_eq!(render("{{#repeat word n}}", Value::from_iter([("word", Value::text("x")), ("n", Value::Int(4))])), "xxxx");
}

#[test]
fn setters_receive_argument_names() {
    let data = Value::from_iter([("flag", "data value")]);
    assert_eq!(render("{{#mark flag}}{{@flag}} {{flag}}", data), "true data value");
}

#[test]
fn tags_without_body_cannot_be_closed() {
    assert!(compiler().compile("{{#repeat 'a'}}{{/repeat}}").is_err());
}

#[test]
fn custom_contexts_reach_placeholder_handlers() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut compiler = compiler();
    let sink = seen.clone();
    compiler.on_placeholder_found(move |args| {
        let last = args.context.last().map(|c| (c.tag.clone(), c.key("source").map(str::to_owned)));
        sink.lock().unwrap().push(last);
    });
    let template = compiler.compile("{{#rows people}}{{name}};{{/rows}}").unwrap();
    let data = Value::from_iter([("people", vec![
        Value::from_iter([("name", "ann")]),
        Value::from_iter([("name", "bob")]),
    ])]);
    assert_eq!(template.render(&data).unwrap(), "ann;bob;");
    assert_eq!(*seen.lock().unwrap(), vec![Some(("rows".to_owned(), Some("people".to_owned())))]);
}

#[test]
fn registry_lists_custom_tags_after_built_ins() {
    let compiler = compiler();
    let names = compiler.tags().names();
    assert_eq!(&names[..3], &["if", "elif", "else"]);
    assert_eq!(names.last(), Some(&"rows"));
    assert!(compiler.tags().get("otherwise").unwrap().is_context_sensitive());
}
