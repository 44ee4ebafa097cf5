//! The compiled form of a template.
//!
//! A template compiles to a tree of generators. Rendering walks the tree,
//! writing into a single output string, against a key scope over the data
//! and a context scope over engine variables.

use std::sync::Arc;
use crate::argument::ArgumentCollection;
use crate::error::RenderError;
use crate::events::TagFormattedArgs;
use crate::format::{FormatSpec, NumberFormat};
use crate::{Context, Scope, TagDefinition};


#[derive(Debug)]
pub(crate) enum Generator {
    Static(String),
    Key(KeyGenerator),
    Inline(InlineGenerator),
    Compound(CompoundGenerator),
}

impl Generator {
    pub(crate) fn render(
        &self, writer: &mut String, key_scope: &Scope<'_>, context_scope: &Scope<'_>, numbers: &NumberFormat
    ) -> Result<(), RenderError> {
        match self {
            Generator::Static(text) => {
                writer.push_str(text);
                Ok(())
            },
            Generator::Key(key) => key.render(writer, key_scope, context_scope, numbers),
            Generator::Inline(inline) => inline.render(writer, key_scope, context_scope),
            Generator::Compound(compound) => compound.render(writer, key_scope, context_scope, numbers),
        }
    }

    /// Number of nodes in this subtree.
    pub(crate) fn count(&self) -> usize {
        match self {
            Generator::Compound(compound) => compound.count(),
            _ => 1,
        }
    }
}


/// A placeholder or variable substitution.
#[derive(Debug)]
pub(crate) struct KeyGenerator {
    key: String,
    format: FormatSpec,
    is_variable: bool,
    is_extension: bool,
    context: Vec<Context>,
}

impl KeyGenerator {
    pub(crate) fn new(
        key: String, format: FormatSpec, is_variable: bool, is_extension: bool, context: Vec<Context>
    ) -> Self {
        KeyGenerator { key, format, is_variable, is_extension, context }
    }

    fn render(
        &self, writer: &mut String, key_scope: &Scope<'_>, context_scope: &Scope<'_>, numbers: &NumberFormat
    ) -> Result<(), RenderError> {
        let scope = if self.is_variable { context_scope } else { key_scope };
        let value = scope.find_in(&self.key, self.is_extension, &self.context)?;
        let substitute = self.format.format(&value, numbers)
            .map_err(|source| RenderError::Format { key: self.key.clone(), source })?;
        let mut args = TagFormattedArgs {
            key: &self.key,
            substitute,
            is_extension: self.is_extension,
        };
        key_scope.hooks().tag_formatted(&mut args);
        writer.push_str(&args.substitute);
        Ok(())
    }
}


/// A tag without body.
#[derive(Debug)]
pub(crate) struct InlineGenerator {
    definition: Arc<TagDefinition>,
    arguments: ArgumentCollection,
}

impl InlineGenerator {
    pub(crate) fn new(definition: Arc<TagDefinition>, arguments: ArgumentCollection) -> Self {
        InlineGenerator { definition, arguments }
    }

    fn render(
        &self, writer: &mut String, key_scope: &Scope<'_>, context_scope: &Scope<'_>
    ) -> Result<(), RenderError> {
        let arguments = if self.definition.is_setter() {
            self.arguments.targets()
        } else {
            self.arguments.resolve(key_scope, context_scope)?
        };
        self.definition.write_text(writer, &arguments, context_scope)
    }
}


/// A tag with a body, split into the primary group and an optional
/// alternate generator (an `elif` or `else` branch).
#[derive(Debug)]
pub(crate) struct CompoundGenerator {
    definition: Arc<TagDefinition>,
    arguments: ArgumentCollection,
    primary: Vec<Generator>,
    secondary: Option<Box<Generator>>,
}

impl CompoundGenerator {
    pub(crate) fn new(definition: Arc<TagDefinition>, arguments: ArgumentCollection) -> Self {
        CompoundGenerator {
            definition,
            arguments,
            primary: Vec::new(),
            secondary: None,
        }
    }

    pub(crate) fn add(&mut self, generator: Generator) {
        self.primary.push(generator);
    }

    /// Add the generator of a nested tag, routing it to the alternate group
    /// when this tag asks for it.
    pub(crate) fn add_tag(&mut self, child: &TagDefinition, generator: Generator) {
        if self.definition.should_create_secondary_group(child) {
            self.secondary = Some(Box::new(generator));
        } else {
            self.primary.push(generator);
        }
    }

    pub(crate) fn count(&self) -> usize {
        1 + self.primary.iter().map(Generator::count).sum::<usize>()
            + self.secondary.as_ref().map_or(0, |secondary| secondary.count())
    }

    pub(crate) fn render(
        &self, writer: &mut String, key_scope: &Scope<'_>, context_scope: &Scope<'_>, numbers: &NumberFormat
    ) -> Result<(), RenderError> {
        let arguments = self.arguments.resolve(key_scope, context_scope)?;
        let passes = self.definition.child_contexts(key_scope, &arguments, context_scope)?;
        let primary = self.definition.should_generate_primary_group(&arguments);
        for pass in &passes {
            let pass_keys = pass.key_scope.as_ref().unwrap_or(key_scope);
            let pass_context = pass.context_scope.as_ref().unwrap_or(context_scope);
            if pass.buffered {
                let mut buffer = String::new();
                self.render_group(primary, &mut buffer, pass_keys, pass_context, numbers)?;
                writer.push_str(&self.definition.consolidate(buffer, &arguments));
            } else {
                self.render_group(primary, writer, pass_keys, pass_context, numbers)?;
            }
        }
        Ok(())
    }

    fn render_group(
        &self, primary: bool, writer: &mut String, key_scope: &Scope<'_>, context_scope: &Scope<'_>,
        numbers: &NumberFormat
    ) -> Result<(), RenderError> {
        if primary {
            for generator in &self.primary {
                generator.render(writer, key_scope, context_scope, numbers)?;
            }
        } else if let Some(secondary) = &self.secondary {
            secondary.render(writer, key_scope, context_scope, numbers)?;
        }
        Ok(())
    }
}
