//! Compiling template text into a generator tree.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use serde::Deserialize;
use tracing::{debug, trace};
use crate::argument::{Argument, ArgumentCollection};
use crate::error::{CompileError, Location};
use crate::events::{PlaceholderFoundArgs, PlaceholderFoundHandler, VariableFoundArgs, VariableFoundHandler};
use crate::format::{FormatSpec, NumberFormat, MAX_WIDTH};
use crate::generator::{CompoundGenerator, Generator, InlineGenerator, KeyGenerator};
use crate::matcher::{split_arguments, TagMatch, TagMatcher};
use crate::{Context, ContextParameter, TagDefinition, TagRegistry, Template};


/// Compiler settings. Every field has a default, so a partial YAML or JSON
/// document is enough to configure a compiler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Strip `\n` and `\r\n` from static text.
    pub remove_newlines: bool,
    /// Also recognise tags between triple braces.
    pub allow_extension_tags: bool,
    /// HTML-escape substitutions, except in triple braces.
    pub escape_html: bool,
    pub number_format: NumberFormat,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            remove_newlines: true,
            allow_extension_tags: false,
            escape_html: false,
            number_format: NumberFormat::default(),
        }
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MatcherKey {
    children: Vec<String>,
    closing: Vec<String>,
    extension: bool,
}


/// Turns template text into a [Template].
///
/// The compiler owns the tag registry and the compile-time hooks. Matchers
/// are built on first use for each combination of child tags and closing
/// tags, and dropped when a tag is registered.
///
/// ```
/// use stache::{FormatCompiler, Value};
///
/// let compiler = FormatCompiler::new();
/// let template = compiler.compile("{{#each items}}[{{this}}]{{/each}}").unwrap();
/// let data = Value::from_iter([("items", vec![1, 2])]);
/// assert_eq!(template.render(&data).unwrap(), "[1][2]");
/// ```
pub struct FormatCompiler {
    registry: TagRegistry,
    options: CompilerOptions,
    placeholder_found: Vec<PlaceholderFoundHandler>,
    variable_found: Vec<VariableFoundHandler>,
    matchers: Mutex<HashMap<MatcherKey, Arc<TagMatcher>>>,
}

impl FormatCompiler {
    pub fn new() -> Self {
        FormatCompiler::with_options(CompilerOptions::default())
    }

    pub fn with_options(options: CompilerOptions) -> Self {
        FormatCompiler {
            registry: TagRegistry::built_in(),
            options,
            placeholder_found: Vec::new(),
            variable_found: Vec::new(),
            matchers: Mutex::new(HashMap::new()),
        }
    }

    /// A compiler for HTML output: substitutions are escaped unless written
    /// between triple braces.
    pub fn html() -> Self {
        FormatCompiler::with_options(CompilerOptions {
            allow_extension_tags: true,
            escape_html: true,
            ..CompilerOptions::default()
        })
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn tags(&self) -> &TagRegistry {
        &self.registry
    }

    /// Register a tag. Fails if the name is taken or is not a valid name.
    pub fn register(&mut self, definition: TagDefinition) -> Result<&mut Self, CompileError> {
        self.registry.register(definition)?;
        self.matchers.get_mut().unwrap_or_else(PoisonError::into_inner).clear();
        Ok(self)
    }

    pub fn on_placeholder_found<F>(&mut self, handler: F) -> &mut Self
    where F: Fn(&mut PlaceholderFoundArgs<'_>) + Send + Sync + 'static {
        self.placeholder_found.push(Box::new(handler));
        self
    }

    pub fn on_variable_found<F>(&mut self, handler: F) -> &mut Self
    where F: Fn(&mut VariableFoundArgs<'_>) + Send + Sync + 'static {
        self.variable_found.push(Box::new(handler));
        self
    }

    pub fn compile(&self, format: &str) -> Result<Template, CompileError> {
        let master = Arc::new(TagDefinition::master());
        let mut compilation = Compilation {
            compiler: self,
            text: format,
            contexts: vec![Context::new(master.name(), Vec::new())],
        };
        let (root, _) = compilation.build(master, ArgumentCollection::default(), &BTreeSet::new(), 0, 0)?;
        debug!(generators = root.count(), "compiled template");
        Ok(Template::new(Generator::Compound(root), &self.options))
    }

    fn matcher(&self, definition: &TagDefinition, closing: &BTreeSet<String>) -> Result<Arc<TagMatcher>, CompileError> {
        let key = MatcherKey {
            children: definition.child_tags().to_vec(),
            closing: closing.iter().cloned().collect(),
            extension: self.options.allow_extension_tags,
        };
        let mut matchers = self.matchers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(matcher) = matchers.get(&key) {
            trace!(tag = definition.name(), "tag matcher cache hit");
            return Ok(matcher.clone());
        }
        let matcher = Arc::new(TagMatcher::build(&self.registry, &key.children, &key.closing, key.extension)?);
        matchers.insert(key, matcher.clone());
        Ok(matcher)
    }
}

impl Default for FormatCompiler {
    fn default() -> Self {
        FormatCompiler::new()
    }
}

impl std::fmt::Debug for FormatCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatCompiler")
            .field("tags", &self.registry.names())
            .field("options", &self.options)
            .field("placeholder_found", &self.placeholder_found.len())
            .field("variable_found", &self.variable_found.len())
            .finish()
    }
}


struct Compilation<'c, 't> {
    compiler: &'c FormatCompiler,
    text: &'t str,
    contexts: Vec<Context>,
}

impl Compilation<'_, '_> {
    /// Build the body of `definition` starting at `start`. Returns the
    /// generator and the offset where compilation resumes.
    fn build(
        &mut self, definition: Arc<TagDefinition>, arguments: ArgumentCollection,
        enclosing: &BTreeSet<String>, start: usize, opened_at: usize
    ) -> Result<(CompoundGenerator, usize), CompileError> {
        let mut closing = enclosing.clone();
        closing.extend(definition.closing_tags().iter().cloned());
        let matcher = self.compiler.matcher(&definition, &closing)?;
        let mut generator = CompoundGenerator::new(definition.clone(), arguments);
        let text = self.text;
        let mut index = start;
        loop {
            let Some(found) = matcher.find_at(text, index) else {
                if !definition.closing_tags().is_empty() {
                    return Err(CompileError::MissingClosingTag {
                        name: definition.name().to_owned(),
                        location: Location::of(text, opened_at),
                    });
                }
                self.add_static(&mut generator, &text[index..]);
                return Ok((generator, text.len()));
            };
            self.add_static(&mut generator, &text[index..found.start]);
            let location = Location::of(text, found.start);
            match found.tag {
                TagMatch::Key { key, alignment, format } => {
                    let alignment = alignment
                        .map(|alignment| alignment.trim().parse::<i32>().ok()
                            .filter(|width| (width.unsigned_abs() as usize) < MAX_WIDTH)
                            .ok_or_else(|| CompileError::InvalidAlignment {
                                alignment: alignment.to_owned(),
                                location,
                            }))
                        .transpose()?;
                    let format = format.map(str::to_owned);
                    generator.add(self.key(key, alignment, format, found.is_extension));
                    index = found.end;
                },
                TagMatch::Comment => index = found.end,
                TagMatch::Close(name) => {
                    // closing an enclosing tag also ends this body; the
                    // enclosing tag consumes the marker
                    let resume = if name == definition.name() { found.end } else { found.start };
                    return Ok((generator, resume));
                },
                TagMatch::Open { name, arguments } => {
                    let Some(child) = self.compiler.registry.get(name).cloned() else {
                        return Err(CompileError::UnknownTag { name: name.to_owned(), location });
                    };
                    let arguments = bind(&child, arguments, location, self.contexts.clone())?;
                    if child.has_content() {
                        let pushed = self.push_context(&child, &arguments);
                        let (body, next) = self.build(child.clone(), arguments, &closing, found.end, found.start)?;
                        if pushed {
                            self.contexts.pop();
                        }
                        generator.add_tag(&child, Generator::Compound(body));
                        index = next;
                    } else {
                        generator.add_tag(&child, Generator::Inline(InlineGenerator::new(child.clone(), arguments)));
                        index = found.end;
                    }
                },
                TagMatch::Unknown(name) => {
                    let is_close = text[found.start..found.end].trim_start_matches('{').starts_with('/');
                    let name = name.to_owned();
                    return Err(if !self.compiler.registry.contains(&name) {
                        CompileError::UnknownTag { name, location }
                    } else if is_close || !matcher.allows(&name) {
                        CompileError::UnexpectedTag { name, location }
                    } else {
                        CompileError::MalformedTag { name, location }
                    });
                },
            }
        }
    }

    fn add_static(&self, generator: &mut CompoundGenerator, text: &str) {
        let text = if self.compiler.options.remove_newlines {
            text.replace("\r\n", "").replace('\n', "")
        } else {
            text.to_owned()
        };
        if !text.is_empty() {
            generator.add(Generator::Static(text));
        }
    }

    fn key(&self, key: &str, alignment: Option<i32>, format: Option<String>, is_extension: bool) -> Generator {
        let (key, format, is_variable) = match key.strip_prefix('@') {
            Some(name) => {
                let mut args = VariableFoundArgs {
                    name: name.to_owned(),
                    alignment,
                    format,
                    is_extension,
                    context: &self.contexts,
                };
                for handler in &self.compiler.variable_found {
                    handler(&mut args);
                }
                (args.name, FormatSpec::new(args.alignment, args.format), true)
            },
            None => {
                let mut args = PlaceholderFoundArgs {
                    key: key.to_owned(),
                    alignment,
                    format,
                    is_extension,
                    context: &self.contexts,
                };
                for handler in &self.compiler.placeholder_found {
                    handler(&mut args);
                }
                (args.key, FormatSpec::new(args.alignment, args.format), false)
            }
        };
        Generator::Key(KeyGenerator::new(key, format, is_variable, is_extension, self.contexts.clone()))
    }

    fn push_context(&mut self, definition: &TagDefinition, arguments: &ArgumentCollection) -> bool {
        let parameters = definition.child_context_parameters();
        if parameters.is_empty() {
            return false;
        }
        let parameters = parameters.iter()
            .map(|parameter| ContextParameter::new(parameter, arguments.key(parameter)))
            .collect();
        self.contexts.push(Context::new(definition.name(), parameters));
        true
    }
}

/// Pair argument tokens with the tag's parameters by position.
fn bind(
    definition: &TagDefinition, text: &str, location: Location, context: Vec<Context>
) -> Result<ArgumentCollection, CompileError> {
    let tokens = split_arguments(text);
    let parameters = definition.parameters();
    if tokens.len() > parameters.len() {
        return Err(CompileError::WrongArgumentCount {
            name: definition.name().to_owned(),
            expected: parameters.len(),
            found: tokens.len(),
            location,
        });
    }
    let mut bindings = Vec::with_capacity(parameters.len());
    for (position, parameter) in parameters.iter().enumerate() {
        let argument = tokens.get(position).map(|token| Argument::parse(token));
        if argument.is_none() && parameter.is_required() {
            return Err(CompileError::MissingArgument {
                name: definition.name().to_owned(),
                parameter: parameter.name().to_owned(),
                location,
            });
        }
        bindings.push((parameter.clone(), argument));
    }
    Ok(ArgumentCollection::new(bindings, context))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    fn render(template: &str, data: Value) -> String {
        FormatCompiler::new().compile(template).unwrap().render(&data).unwrap()
    }

    #[test]
    fn static_text_only() {
        assert_eq!(render("plain text", Value::Null), "plain text");
    }

    #[test]
    fn newlines_are_stripped_by_default() {
        assert_eq!(render("a\r\nb\nc", Value::Null), "abc");
        let compiler = FormatCompiler::with_options(CompilerOptions {
            remove_newlines: false,
            ..CompilerOptions::default()
        });
        let template = compiler.compile("a\nb").unwrap();
        assert_eq!(template.render(&Value::Null).unwrap(), "a\nb");
    }

    #[test]
    fn else_is_closed_by_the_enclosing_if() {
        let template = "{{#if ok}}yes{{else}}no{{/if}}!";
        assert_eq!(render(template, Value::from_iter([("ok", true)])), "yes!");
        assert_eq!(render(template, Value::from_iter([("ok", false)])), "no!");
    }

    #[test]
    fn elif_chains() {
        let template = "{{#if a}}A{{#elif b}}B{{#else}}C{{/if}}";
        assert_eq!(render(template, Value::from_iter([("a", 0), ("b", 1)])), "B");
        assert_eq!(render(template, Value::from_iter([("a", 0), ("b", 0)])), "C");
        assert_eq!(render(template, Value::from_iter([("a", 1), ("b", 1)])), "A");
    }

    #[test]
    fn argument_count_is_checked() {
        let compiler = FormatCompiler::new();
        assert!(matches!(
            compiler.compile("{{#if a b}}{{/if}}"),
            Err(CompileError::WrongArgumentCount { expected: 1, found: 2, .. })
        ));
        assert!(matches!(
            compiler.compile("{{#each}}{{/each}}"),
            Err(CompileError::MissingArgument { .. })
        ));
    }

    #[test]
    fn unclosed_tag_reports_opening_location() {
        match FormatCompiler::new().compile("ab\n  {{#each items}}x") {
            Err(CompileError::MissingClosingTag { name, location }) => {
                assert_eq!(name, "each");
                assert_eq!((location.line, location.column), (2, 3));
            },
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn closing_an_enclosing_tag_closes_the_current_one() {
        let data = Value::from_iter([("a", Value::Bool(true)), ("b", Value::from(vec![1, 2]))]);
        assert_eq!(render("{{#if a}}{{#each b}}[{{this}}]{{/if}}!", data.clone()), "[1][2]!");
        assert_eq!(
            render("{{#each b}}{{#with a}}<{{this}}>{{/each}}.", data),
            "<true><true>."
        );
    }

    #[test]
    fn closing_an_enclosing_tag_still_requires_its_own_close() {
        let error = FormatCompiler::new()
            .compile("{{#if a}}{{#if b}}{{/if}}")
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(error, CompileError::MissingClosingTag { .. }));
        assert_eq!(error.location().map(|l| l.offset), Some(0));
    }

    #[test]
    fn invalid_alignment_is_rejected() {
        assert!(matches!(
            FormatCompiler::new().compile("{{x,wide}}"),
            Err(CompileError::InvalidAlignment { .. })
        ));
        assert!(matches!(
            FormatCompiler::new().compile("{{x,1000000}}"),
            Err(CompileError::InvalidAlignment { .. })
        ));
        assert!(matches!(
            FormatCompiler::new().compile("{{x,-2000000000}}"),
            Err(CompileError::InvalidAlignment { .. })
        ));
        assert!(FormatCompiler::new().compile("{{x,999999}}").is_ok());
    }

    #[test]
    fn matchers_are_cached_per_context() {
        let compiler = FormatCompiler::new();
        compiler.compile("{{#if a}}{{/if}}{{#if b}}{{/if}}").unwrap();
        let cached = compiler.matchers.lock().unwrap().len();
        assert_eq!(cached, 2);
    }

    #[test]
    fn registering_clears_the_matcher_cache() {
        struct Plain;
        impl crate::TagBehavior for Plain {}

        let mut compiler = FormatCompiler::new();
        compiler.compile("{{x}}").unwrap();
        compiler.register(TagDefinition::inline("plain", Plain)).unwrap();
        assert!(compiler.matchers.lock().unwrap().is_empty());
        assert!(compiler.compile("{{#plain}}").is_ok());
    }

    #[test]
    fn placeholder_handlers_rewrite_keys() {
        let mut compiler = FormatCompiler::new();
        compiler.on_placeholder_found(|args| {
            args.key = args.key.to_uppercase();
            args.format = Some("F1".to_owned());
        });
        let template = compiler.compile("{{x}}").unwrap();
        let data = Value::from_iter([("X", 2)]);
        assert_eq!(template.render(&data).unwrap(), "2.0");
    }

    #[test]
    fn contexts_are_reported_for_looping_tags() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut compiler = FormatCompiler::new();
        let sink = seen.clone();
        compiler.on_placeholder_found(move |args| {
            let tags = args.context.iter()
                .map(|context| format!("{}:{}", context.tag, context.key("collection").unwrap_or("-")))
                .collect::<Vec<_>>();
            sink.lock().unwrap().push(tags.join(","));
        });
        compiler.compile("{{a}}{{#each items}}{{#if b}}{{c}}{{/if}}{{/each}}").unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![":-", ":-,each:items"]);
    }
}
