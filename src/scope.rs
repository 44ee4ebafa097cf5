use std::cell::RefCell;
use tracing::trace;
use crate::error::RenderError;
use crate::events::{KeyFoundArgs, KeyNotFoundArgs, RenderHooks, ValueRequestArgs};
use crate::{Context, Value};


static NO_HOOKS: RenderHooks = RenderHooks::new();

/// A chained lookup context over a [Value].
///
/// The first member of a dotted key is searched in this scope and then in
/// its parents; the remaining members are resolved strictly inside the
/// value found for the previous one. The member `this` is the scope's own
/// value.
///
/// Two chains exist during a render: the key scope over the data being
/// rendered (placeholders) and the context scope over engine variables
/// (`@name`). Children share their parent's hooks.
pub struct Scope<'a> {
    source: RefCell<Value>,
    parent: Option<&'a Scope<'a>>,
    hooks: &'a RenderHooks,
    is_variable: bool,
}

impl Scope<'static> {
    /// A key scope without hooks.
    pub fn new(source: Value) -> Self {
        Scope::with_hooks(source, &NO_HOOKS, false)
    }
}

impl<'a> Scope<'a> {
    pub fn with_hooks(source: Value, hooks: &'a RenderHooks, is_variable: bool) -> Self {
        Scope {
            source: RefCell::new(source),
            parent: None,
            hooks,
            is_variable,
        }
    }

    /// A child scope over an empty mapping.
    pub fn child(&self) -> Scope<'_> {
        self.child_over(Value::empty_mapping())
    }

    pub fn child_over(&self, source: Value) -> Scope<'_> {
        Scope {
            source: RefCell::new(source),
            parent: Some(self),
            hooks: self.hooks,
            is_variable: self.is_variable,
        }
    }

    pub fn hooks(&self) -> &RenderHooks {
        self.hooks
    }

    /// Whether the scope chain holds engine variables rather than data.
    pub fn is_variable(&self) -> bool {
        self.is_variable
    }

    /// A snapshot of the value wrapped by this scope.
    pub fn source(&self) -> Value {
        self.source.borrow().clone()
    }

    /// Resolve a possibly dotted name, raising the found and not-found
    /// hooks.
    pub fn find(&self, name: &str, is_extension: bool) -> Result<Value, RenderError> {
        self.find_in(name, is_extension, &[])
    }

    pub(crate) fn find_in(
        &self, name: &str, is_extension: bool, context: &[Context]
    ) -> Result<Value, RenderError> {
        match self.search(name) {
            Ok(value) => {
                if !self.hooks.has_key_found() {
                    return Ok(value);
                }
                let mut args = KeyFoundArgs {
                    key: name,
                    value,
                    is_variable: self.is_variable,
                    is_extension,
                };
                self.hooks.key_found(&mut args);
                Ok(args.value)
            },
            Err(member) => {
                let mut args = KeyNotFoundArgs {
                    key: name,
                    missing_member: member,
                    is_variable: self.is_variable,
                    is_extension,
                    context,
                    handled: false,
                    substitute: Value::Null,
                };
                self.hooks.key_not_found(&mut args);
                if args.handled {
                    trace!(key = name, "missing key substituted by handler");
                    Ok(args.substitute)
                } else {
                    Err(RenderError::KeyNotFound {
                        key: name.to_owned(),
                        member: member.to_owned(),
                    })
                }
            }
        }
    }

    /// Resolve a name without raising any hook.
    pub fn try_find(&self, name: &str) -> Option<Value> {
        self.search(name).ok()
    }

    /// Write a value at a possibly dotted name.
    ///
    /// The value is written in the scope where the first member already
    /// exists, or in the outermost scope of the chain if none holds it;
    /// missing intermediate members are created as empty mappings. Without an explicit value
    /// the value-requested hooks supply one, starting from the current
    /// value.
    pub fn set(&self, name: &str, value: Option<Value>) {
        let value = match value {
            Some(value) => value,
            None => {
                let current = self.try_find(name).unwrap_or_default();
                if self.hooks.has_value_requested() {
                    let mut args = ValueRequestArgs { key: name, value: current };
                    self.hooks.value_requested(&mut args);
                    args.value
                } else {
                    current
                }
            }
        };
        let members = name.split('.').collect::<Vec<_>>();
        let (target, path) = match members.split_first() {
            Some((&"this", rest)) => (self, rest),
            Some((first, _)) => (self.owner_of(first).unwrap_or_else(|| self.outermost()), &members[..]),
            None => (self, &members[..]),
        };
        trace!(key = name, is_variable = self.is_variable, "writing scope value");
        target.source.borrow_mut().assign(path, value);
    }

    /// Write a value into this scope only, shadowing any parent value.
    pub fn declare(&self, name: &str, value: Value) {
        self.source.borrow_mut().assign(&[name], value);
    }

    fn outermost(&self) -> &Scope<'a> {
        match self.parent {
            Some(parent) => parent.outermost(),
            None => self,
        }
    }

    fn owner_of(&self, member: &str) -> Option<&Scope<'a>> {
        if self.source.borrow().member(member).is_some() {
            Some(self)
        } else {
            self.parent.and_then(|parent| parent.owner_of(member))
        }
    }

    fn find_first(&self, member: &str) -> Option<Value> {
        let found = self.source.borrow().member(member);
        found.or_else(|| self.parent.and_then(|parent| parent.find_first(member)))
    }

    // the error is the member at which resolution stopped
    fn search<'n>(&self, name: &'n str) -> Result<Value, &'n str> {
        let mut members = name.split('.');
        let first = members.next().unwrap_or(name);
        let mut value = if first == "this" {
            self.source()
        } else {
            self.find_first(first).ok_or(first)?
        };
        for member in members {
            value = value.member(member).ok_or(member)?;
        }
        Ok(value)
    }
}

impl std::fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("source", &self.source.borrow())
            .field("is_variable", &self.is_variable)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
