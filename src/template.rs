use crate::compiler::{CompilerOptions, FormatCompiler};
use crate::error::{CompileError, RenderError};
use crate::events::{KeyFoundArgs, KeyNotFoundArgs, RenderHooks, TagFormattedArgs, ValueRequestArgs};
use crate::format::NumberFormat;
use crate::generator::Generator;
use crate::{Scope, Value};


/// A compiled template.
///
/// Rendering never mutates the template, so one template can be rendered
/// from several threads at once. Render-time hooks are registered on the
/// template before it is shared.
#[derive(Debug)]
pub struct Template {
    root: Generator,
    hooks: RenderHooks,
    number_format: NumberFormat,
}

impl Template {
    /// Compile with the built-in tags and default options.
    pub fn from(input: &str) -> Result<Self, CompileError> {
        FormatCompiler::new().compile(input)
    }

    pub(crate) fn new(root: Generator, options: &CompilerOptions) -> Self {
        let mut hooks = RenderHooks::new();
        if options.escape_html {
            hooks.on_tag_formatted(|args| {
                if !args.is_extension {
                    args.substitute = html_escape(&args.substitute);
                }
            });
        }
        Template {
            root,
            hooks,
            number_format: options.number_format.clone(),
        }
    }

    pub fn render(&self, data: &Value) -> Result<String, RenderError> {
        self.render_with_format(data, &self.number_format)
    }

    /// Render using other number formatting symbols than the compiler's.
    pub fn render_with_format(&self, data: &Value, numbers: &NumberFormat) -> Result<String, RenderError> {
        let key_scope = Scope::with_hooks(data.clone(), &self.hooks, false);
        let context_scope = Scope::with_hooks(Value::empty_mapping(), &self.hooks, true);
        let mut writer = String::new();
        self.root.render(&mut writer, &key_scope, &context_scope, numbers)?;
        Ok(writer)
    }

    pub fn on_key_found<F>(&mut self, handler: F) -> &mut Self
    where F: Fn(&mut KeyFoundArgs<'_>) + Send + Sync + 'static {
        self.hooks.on_key_found(handler);
        self
    }

    pub fn on_key_not_found<F>(&mut self, handler: F) -> &mut Self
    where F: Fn(&mut KeyNotFoundArgs<'_>) + Send + Sync + 'static {
        self.hooks.on_key_not_found(handler);
        self
    }

    pub fn on_value_requested<F>(&mut self, handler: F) -> &mut Self
    where F: Fn(&mut ValueRequestArgs<'_>) + Send + Sync + 'static {
        self.hooks.on_value_requested(handler);
        self
    }

    /// Register a handler rewriting formatted substitutions before they are
    /// written. Handlers run after the HTML escaping of an HTML template.
    pub fn on_tag_formatted<F>(&mut self, handler: F) -> &mut Self
    where F: Fn(&mut TagFormattedArgs<'_>) + Send + Sync + 'static {
        self.hooks.on_tag_formatted(handler);
        self
    }
}


fn html_escape(input: &str) -> String {
    input.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
        .replace('/', "&#47;")
        .replace('=', "&#61;")
        .replace('`', "&#96;")
}
