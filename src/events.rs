//! Callback payloads for compile-time and render-time hooks.
//!
//! Handlers receive a mutable payload and may rewrite the fields marked as
//! rewritable. Handlers registered on the same hook run in registration
//! order, each one seeing the changes made by the previous ones.

use crate::{Context, Value};


/// A placeholder (`{{name}}`) was found while compiling.
///
/// `key`, `alignment` and `format` may be rewritten.
#[derive(Debug)]
pub struct PlaceholderFoundArgs<'a> {
    pub key: String,
    pub alignment: Option<i32>,
    pub format: Option<String>,
    pub is_extension: bool,
    pub context: &'a [Context],
}

/// A variable (`{{@name}}`) was found while compiling.
///
/// `name`, `alignment` and `format` may be rewritten.
#[derive(Debug)]
pub struct VariableFoundArgs<'a> {
    pub name: String,
    pub alignment: Option<i32>,
    pub format: Option<String>,
    pub is_extension: bool,
    pub context: &'a [Context],
}

/// A key was resolved while rendering. `value` may be substituted.
#[derive(Debug)]
pub struct KeyFoundArgs<'a> {
    pub key: &'a str,
    pub value: Value,
    pub is_variable: bool,
    pub is_extension: bool,
}

/// A key could not be resolved while rendering.
///
/// Setting `handled` makes the lookup succeed with `substitute`.
#[derive(Debug)]
pub struct KeyNotFoundArgs<'a> {
    pub key: &'a str,
    /// The member of the dotted key at which resolution stopped.
    pub missing_member: &'a str,
    pub is_variable: bool,
    pub is_extension: bool,
    pub context: &'a [Context],
    pub handled: bool,
    pub substitute: Value,
}

/// A value is being written without an explicit value, e.g. by `{{#set}}`.
///
/// `value` starts as the current value (or null) and may be replaced.
#[derive(Debug)]
pub struct ValueRequestArgs<'a> {
    pub key: &'a str,
    pub value: Value,
}

/// A placeholder or variable was formatted and is about to be written.
#[derive(Debug)]
pub struct TagFormattedArgs<'a> {
    pub key: &'a str,
    pub substitute: String,
    pub is_extension: bool,
}


pub(crate) type PlaceholderFoundHandler = Box<dyn for<'a> Fn(&mut PlaceholderFoundArgs<'a>) + Send + Sync>;
pub(crate) type VariableFoundHandler = Box<dyn for<'a> Fn(&mut VariableFoundArgs<'a>) + Send + Sync>;
type KeyFoundHandler = Box<dyn for<'a> Fn(&mut KeyFoundArgs<'a>) + Send + Sync>;
type KeyNotFoundHandler = Box<dyn for<'a> Fn(&mut KeyNotFoundArgs<'a>) + Send + Sync>;
type ValueRequestHandler = Box<dyn for<'a> Fn(&mut ValueRequestArgs<'a>) + Send + Sync>;
type TagFormattedHandler = Box<dyn for<'a> Fn(&mut TagFormattedArgs<'a>) + Send + Sync>;


/// Render-time callbacks shared by every scope of a render.
#[derive(Default)]
pub struct RenderHooks {
    key_found: Vec<KeyFoundHandler>,
    key_not_found: Vec<KeyNotFoundHandler>,
    value_requested: Vec<ValueRequestHandler>,
    tag_formatted: Vec<TagFormattedHandler>,
}

impl RenderHooks {
    pub const fn new() -> Self {
        RenderHooks {
            key_found: Vec::new(),
            key_not_found: Vec::new(),
            value_requested: Vec::new(),
            tag_formatted: Vec::new(),
        }
    }

    pub fn on_key_found<F>(&mut self, handler: F) -> &mut Self
    where F: Fn(&mut KeyFoundArgs<'_>) + Send + Sync + 'static {
        self.key_found.push(Box::new(handler));
        self
    }

    pub fn on_key_not_found<F>(&mut self, handler: F) -> &mut Self
    where F: Fn(&mut KeyNotFoundArgs<'_>) + Send + Sync + 'static {
        self.key_not_found.push(Box::new(handler));
        self
    }

    pub fn on_value_requested<F>(&mut self, handler: F) -> &mut Self
    where F: Fn(&mut ValueRequestArgs<'_>) + Send + Sync + 'static {
        self.value_requested.push(Box::new(handler));
        self
    }

    pub fn on_tag_formatted<F>(&mut self, handler: F) -> &mut Self
    where F: Fn(&mut TagFormattedArgs<'_>) + Send + Sync + 'static {
        self.tag_formatted.push(Box::new(handler));
        self
    }

    pub(crate) fn key_found(&self, args: &mut KeyFoundArgs<'_>) {
        for handler in &self.key_found {
            handler(args);
        }
    }

    pub(crate) fn has_key_found(&self) -> bool {
        !self.key_found.is_empty()
    }

    pub(crate) fn key_not_found(&self, args: &mut KeyNotFoundArgs<'_>) {
        for handler in &self.key_not_found {
            handler(args);
        }
    }

    pub(crate) fn value_requested(&self, args: &mut ValueRequestArgs<'_>) {
        for handler in &self.value_requested {
            handler(args);
        }
    }

    pub(crate) fn has_value_requested(&self) -> bool {
        !self.value_requested.is_empty()
    }

    pub(crate) fn tag_formatted(&self, args: &mut TagFormattedArgs<'_>) {
        for handler in &self.tag_formatted {
            handler(args);
        }
    }
}

impl std::fmt::Debug for RenderHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderHooks")
            .field("key_found", &self.key_found.len())
            .field("key_not_found", &self.key_not_found.len())
            .field("value_requested", &self.value_requested.len())
            .field("tag_formatted", &self.tag_formatted.len())
            .finish()
    }
}
