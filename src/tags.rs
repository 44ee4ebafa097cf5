//! Tag definitions.
//!
//! Every tag declares its parameters, the tags valid directly in its body,
//! the tags that close it and whether it has a body at all. What a tag does
//! while rendering is dispatched on [TagKind]: the built-in tags are a
//! closed set, anything else is a [TagBehavior] registered by the caller.

use std::{collections::HashMap, fmt, sync::Arc};
use tracing::debug;
use crate::argument::Arguments;
use crate::error::{CompileError, RenderError};
use crate::format::FormatSpec;
use crate::{Scope, Value};


/// A parameter in a tag's signature.
#[derive(Debug, Clone, PartialEq)]
pub struct TagParameter {
    name: String,
    required: bool,
    default: Option<Value>,
}

impl TagParameter {
    pub fn required(name: &str) -> Self {
        TagParameter {
            name: name.to_owned(),
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &str, default: Value) -> Self {
        TagParameter {
            name: name.to_owned(),
            required: false,
            default: Some(default),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}


/// One pass over a tag's body: the scopes to render it with, and whether
/// the output is buffered and handed to [TagBehavior::consolidate] before
/// it reaches the real output.
///
/// A scope left as `None` renders the body against the enclosing one.
pub struct NestedContext<'s> {
    pub key_scope: Option<Scope<'s>>,
    pub context_scope: Option<Scope<'s>>,
    pub buffered: bool,
}

impl<'s> NestedContext<'s> {
    pub fn new(key_scope: Option<Scope<'s>>, context_scope: Scope<'s>) -> Self {
        NestedContext {
            key_scope,
            context_scope: Some(context_scope),
            buffered: false,
        }
    }

    /// A pass writing variables into the enclosing context scope.
    pub fn inherit(key_scope: Option<Scope<'s>>) -> Self {
        NestedContext {
            key_scope,
            context_scope: None,
            buffered: false,
        }
    }

    pub fn buffered(key_scope: Option<Scope<'s>>, context_scope: Option<Scope<'s>>) -> Self {
        NestedContext {
            key_scope,
            context_scope,
            buffered: true,
        }
    }
}


/// Behaviour of a tag registered by the caller.
///
/// Every method has a default matching a plain content tag: one pass over
/// the body in the enclosing scopes, always the primary group, no output
/// of its own.
pub trait TagBehavior: Send + Sync {
    /// Parameters whose placeholder names are reported as a new context.
    fn child_context_parameters(&self) -> Vec<String> {
        Vec::new()
    }

    fn child_contexts<'s>(
        &self, _key_scope: &'s Scope<'s>, _arguments: &Arguments, _context_scope: &'s Scope<'s>
    ) -> Result<Vec<NestedContext<'s>>, RenderError> {
        Ok(vec![NestedContext::inherit(None)])
    }

    /// Whether a child tag starts the alternate group of this tag.
    fn should_create_secondary_group(&self, _child: &TagDefinition) -> bool {
        false
    }

    fn should_generate_primary_group(&self, _arguments: &Arguments) -> bool {
        true
    }

    /// Output of a tag without body.
    fn text(
        &self, _writer: &mut String, _arguments: &Arguments, _context_scope: &Scope<'_>
    ) -> Result<(), RenderError> {
        Ok(())
    }

    /// Transform the buffered output of a body pass.
    fn consolidate(&self, text: String, _arguments: &Arguments) -> String {
        text
    }

    /// Setters receive the names of their arguments instead of values.
    fn is_setter(&self) -> bool {
        false
    }
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Branch {
    If,
    Elif,
    Else,
}

#[derive(Clone)]
pub(crate) enum TagKind {
    Master,
    Condition(Branch),
    Each,
    With,
    Index,
    Set,
    Newline,
    Custom(Arc<dyn TagBehavior>),
}

impl fmt::Debug for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKind::Master => write!(f, "Master"),
            TagKind::Condition(branch) => write!(f, "Condition({:?})", branch),
            TagKind::Each => write!(f, "Each"),
            TagKind::With => write!(f, "With"),
            TagKind::Index => write!(f, "Index"),
            TagKind::Set => write!(f, "Set"),
            TagKind::Newline => write!(f, "Newline"),
            TagKind::Custom(_) => write!(f, "Custom"),
        }
    }
}


pub const IF: &str = "if";
pub const ELIF: &str = "elif";
pub const ELSE: &str = "else";
pub const EACH: &str = "each";
pub const WITH: &str = "with";
pub const INDEX: &str = "index";
pub const SET: &str = "set";
pub const NEWLINE: &str = "newline";

const CONDITION: &str = "condition";
const COLLECTION: &str = "collection";
const CONTEXT: &str = "context";
const NAME: &str = "name";
const INDEX_VARIABLE: &str = "index";


#[derive(Debug, Clone)]
pub struct TagDefinition {
    name: String,
    parameters: Vec<TagParameter>,
    child_tags: Vec<String>,
    closing_tags: Vec<String>,
    has_content: bool,
    is_context_sensitive: bool,
    kind: TagKind,
}

impl TagDefinition {
    fn built_in(name: &str, has_content: bool, kind: TagKind) -> Self {
        TagDefinition {
            name: name.to_owned(),
            parameters: Vec::new(),
            child_tags: Vec::new(),
            closing_tags: if has_content { vec![name.to_owned()] } else { Vec::new() },
            has_content,
            is_context_sensitive: false,
            kind,
        }
    }

    /// A caller-defined tag with a body, closed by `{{/name}}`.
    pub fn content<B: TagBehavior + 'static>(name: &str, behavior: B) -> Self {
        TagDefinition::built_in(name, true, TagKind::Custom(Arc::new(behavior)))
    }

    /// A caller-defined tag without body.
    pub fn inline<B: TagBehavior + 'static>(name: &str, behavior: B) -> Self {
        TagDefinition::built_in(name, false, TagKind::Custom(Arc::new(behavior)))
    }

    pub fn with_parameter(mut self, parameter: TagParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_child_tag(mut self, name: &str) -> Self {
        self.child_tags.push(name.to_owned());
        self
    }

    /// Add a tag whose closing marker also ends this tag's body.
    pub fn with_closing_tag(mut self, name: &str) -> Self {
        self.closing_tags.push(name.to_owned());
        self
    }

    /// Only match the tag where a parent lists it as a child tag.
    pub fn context_sensitive(mut self) -> Self {
        self.is_context_sensitive = true;
        self
    }

    /// The implicit tag around a whole template; it runs to the end of input.
    pub(crate) fn master() -> Self {
        TagDefinition {
            closing_tags: Vec::new(),
            ..TagDefinition::built_in("", true, TagKind::Master)
        }
    }

    fn condition(name: &str, branch: Branch) -> Self {
        let definition = TagDefinition::built_in(name, true, TagKind::Condition(branch));
        match branch {
            Branch::If => definition
                .with_parameter(TagParameter::required(CONDITION))
                .with_child_tag(ELIF)
                .with_child_tag(ELSE),
            Branch::Elif => TagDefinition { closing_tags: vec![IF.to_owned()], ..definition }
                .with_parameter(TagParameter::required(CONDITION))
                .with_child_tag(ELIF)
                .with_child_tag(ELSE)
                .context_sensitive(),
            Branch::Else => TagDefinition { closing_tags: vec![IF.to_owned()], ..definition }
                .context_sensitive(),
        }
    }

    fn if_tag() -> Self {
        TagDefinition::condition(IF, Branch::If)
    }

    fn elif_tag() -> Self {
        TagDefinition::condition(ELIF, Branch::Elif)
    }

    fn else_tag() -> Self {
        TagDefinition::condition(ELSE, Branch::Else)
    }

    fn each_tag() -> Self {
        TagDefinition::built_in(EACH, true, TagKind::Each)
            .with_parameter(TagParameter::required(COLLECTION))
    }

    fn with_tag() -> Self {
        TagDefinition::built_in(WITH, true, TagKind::With)
            .with_parameter(TagParameter::required(CONTEXT))
    }

    fn index_tag() -> Self {
        TagDefinition::built_in(INDEX, false, TagKind::Index)
    }

    fn set_tag() -> Self {
        TagDefinition::built_in(SET, false, TagKind::Set)
            .with_parameter(TagParameter::required(NAME))
    }

    fn newline_tag() -> Self {
        TagDefinition::built_in(NEWLINE, false, TagKind::Newline)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[TagParameter] {
        &self.parameters
    }

    pub fn child_tags(&self) -> &[String] {
        &self.child_tags
    }

    pub fn closing_tags(&self) -> &[String] {
        &self.closing_tags
    }

    pub fn has_content(&self) -> bool {
        self.has_content
    }

    pub fn is_context_sensitive(&self) -> bool {
        self.is_context_sensitive
    }

    pub fn is_setter(&self) -> bool {
        match &self.kind {
            TagKind::Set => true,
            TagKind::Custom(behavior) => behavior.is_setter(),
            _ => false,
        }
    }

    pub fn child_context_parameters(&self) -> Vec<String> {
        match &self.kind {
            TagKind::Each => vec![COLLECTION.to_owned()],
            TagKind::With => vec![CONTEXT.to_owned()],
            TagKind::Custom(behavior) => behavior.child_context_parameters(),
            _ => Vec::new(),
        }
    }

    /// The passes to make over the body of this tag.
    pub fn child_contexts<'s>(
        &self, key_scope: &'s Scope<'s>, arguments: &Arguments, context_scope: &'s Scope<'s>
    ) -> Result<Vec<NestedContext<'s>>, RenderError> {
        match &self.kind {
            TagKind::Each => Ok(
                arguments.get(COLLECTION)
                    .items()
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| {
                        let iteration = context_scope.child();
                        iteration.declare(INDEX_VARIABLE, Value::from(index));
                        NestedContext::new(Some(key_scope.child_over(item)), iteration)
                    })
                    .collect()
            ),
            TagKind::With => Ok(vec![
                NestedContext::inherit(Some(key_scope.child_over(arguments.get(CONTEXT).clone())))
            ]),
            TagKind::Custom(behavior) =>
                behavior.child_contexts(key_scope, arguments, context_scope),
            _ => Ok(vec![NestedContext::inherit(None)]),
        }
    }

    /// Whether `child`, found in this tag's body, starts the alternate group.
    pub fn should_create_secondary_group(&self, child: &TagDefinition) -> bool {
        match &self.kind {
            TagKind::Condition(Branch::If | Branch::Elif) =>
                child.name == ELIF || child.name == ELSE,
            TagKind::Custom(behavior) => behavior.should_create_secondary_group(child),
            _ => false,
        }
    }

    pub fn should_generate_primary_group(&self, arguments: &Arguments) -> bool {
        match &self.kind {
            TagKind::Condition(Branch::If | Branch::Elif) => is_truthy(arguments.get(CONDITION)),
            TagKind::Custom(behavior) => behavior.should_generate_primary_group(arguments),
            _ => true,
        }
    }

    /// Output of a tag without body.
    pub fn write_text(
        &self, writer: &mut String, arguments: &Arguments, context_scope: &Scope<'_>
    ) -> Result<(), RenderError> {
        match &self.kind {
            TagKind::Index => {
                if let Some(index) = context_scope.try_find(INDEX_VARIABLE) {
                    let text = FormatSpec::default()
                        .format(&index, &Default::default())
                        .map_err(|source| RenderError::Format { key: INDEX_VARIABLE.to_owned(), source })?;
                    writer.push_str(&text);
                }
                Ok(())
            },
            TagKind::Set => {
                if let Some(name) = arguments.get(NAME).as_str() {
                    context_scope.set(name, None);
                }
                Ok(())
            },
            TagKind::Newline => {
                writer.push('\n');
                Ok(())
            },
            TagKind::Custom(behavior) => behavior.text(writer, arguments, context_scope),
            _ => Ok(()),
        }
    }

    pub fn consolidate(&self, text: String, arguments: &Arguments) -> String {
        match &self.kind {
            TagKind::Custom(behavior) => behavior.consolidate(text, arguments),
            _ => text,
        }
    }
}


/// Truth value of a condition argument.
///
/// Null is false; collections and text are true when not empty; a char is
/// true unless NUL; numbers and booleans are true unless zero. Any other
/// value is true.
pub fn is_truthy(condition: &Value) -> bool {
    match condition {
        Value::Null => false,
        Value::Sequence(seq) => !seq.is_empty(),
        Value::Mapping(mapping) => !mapping.is_empty(),
        Value::Text(text) => !text.is_empty(),
        Value::Char(c) => *c != '\0',
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => !f.is_finite() || *f != 0.0,
        Value::Object(_) => true,
    }
}


const BUILT_IN_TAGS: &[fn() -> TagDefinition] = &[
    TagDefinition::if_tag,
    TagDefinition::elif_tag,
    TagDefinition::else_tag,
    TagDefinition::each_tag,
    TagDefinition::with_tag,
    TagDefinition::index_tag,
    TagDefinition::set_tag,
    TagDefinition::newline_tag,
];

/// Tag definitions by name, in registration order.
#[derive(Debug, Clone)]
pub struct TagRegistry {
    tags: Vec<Arc<TagDefinition>>,
    by_name: HashMap<String, usize>,
}

impl TagRegistry {
    pub fn empty() -> Self {
        TagRegistry {
            tags: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// A registry holding the built-in tags.
    pub fn built_in() -> Self {
        let mut registry = TagRegistry::empty();
        for definition in BUILT_IN_TAGS {
            let definition = definition();
            let index = registry.tags.len();
            registry.by_name.insert(definition.name.clone(), index);
            registry.tags.push(Arc::new(definition));
        }
        registry
    }

    pub fn register(&mut self, definition: TagDefinition) -> Result<(), CompileError> {
        let valid_name = !definition.name.is_empty()
            && definition.name.chars().all(|c| c.is_alphanumeric() || c == '_');
        if !valid_name {
            return Err(CompileError::InvalidTagName(definition.name));
        }
        if self.by_name.contains_key(&definition.name) {
            return Err(CompileError::DuplicateTag(definition.name));
        }
        debug!(tag = %definition.name, has_content = definition.has_content, "registering tag");
        self.by_name.insert(definition.name.clone(), self.tags.len());
        self.tags.push(Arc::new(definition));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<TagDefinition>> {
        self.by_name.get(name).map(|&index| &self.tags[index])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<TagDefinition>> {
        self.tags.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tags.iter().map(|tag| tag.name()).collect()
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        TagRegistry::built_in()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    impl TagBehavior for Plain {}

    #[test]
    fn built_in_registry_contents() {
        let registry = TagRegistry::built_in();
        assert_eq!(
            registry.names(),
            vec!["if", "elif", "else", "each", "with", "index", "set", "newline"]
        );
        assert!(registry.get(ELSE).unwrap().is_context_sensitive());
        assert!(registry.get(SET).unwrap().is_setter());
        assert!(!registry.get(INDEX).unwrap().has_content());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = TagRegistry::built_in();
        registry.register(TagDefinition::content("box", Plain)).unwrap();
        match registry.register(TagDefinition::inline("box", Plain)) {
            Err(CompileError::DuplicateTag(name)) => assert_eq!(name, "box"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(registry.register(TagDefinition::inline("if", Plain)).is_err());
    }

    #[test]
    fn invalid_names_are_rejected() {
        let mut registry = TagRegistry::empty();
        assert!(matches!(
            registry.register(TagDefinition::inline("a b", Plain)),
            Err(CompileError::InvalidTagName(_))
        ));
    }

    #[test]
    fn conditional_children_go_to_the_secondary_group() {
        let registry = TagRegistry::built_in();
        let if_tag = registry.get(IF).unwrap();
        assert!(if_tag.should_create_secondary_group(registry.get(ELSE).unwrap()));
        assert!(if_tag.should_create_secondary_group(registry.get(ELIF).unwrap()));
        assert!(!if_tag.should_create_secondary_group(registry.get(EACH).unwrap()));
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&Value::text("")));
        assert!(is_truthy(&Value::text("0")));
        assert!(!is_truthy(&Value::Int(0)));
        assert!(is_truthy(&Value::Int(-1)));
        assert!(!is_truthy(&Value::Float(0.0)));
        assert!(is_truthy(&Value::Float(f64::NAN)));
        assert!(!is_truthy(&Value::Char('\0')));
        assert!(is_truthy(&Value::Char('x')));
        assert!(!is_truthy(&Value::sequence(vec![])));
        assert!(!is_truthy(&Value::empty_mapping()));
        assert!(!is_truthy(&Value::Bool(false)));
    }

    #[test]
    fn each_declares_index_per_item() {
        let registry = TagRegistry::built_in();
        let each = registry.get(EACH).unwrap();
        let mut arguments = Arguments::default();
        arguments.insert(COLLECTION, Value::from(vec!["a", "b"]));
        let keys = Scope::new(Value::empty_mapping());
        let variables = Scope::new(Value::empty_mapping());
        let passes = each.child_contexts(&keys, &arguments, &variables).unwrap();
        assert_eq!(passes.len(), 2);
        assert_eq!(passes[1].context_scope.as_ref().unwrap().try_find("index"), Some(Value::Int(1)));
        let item = passes[1].key_scope.as_ref().unwrap().try_find("this");
        assert_eq!(item, Some(Value::text("b")));
    }
}
