use std::collections::HashMap;
use crate::error::RenderError;
use crate::tags::TagParameter;
use crate::{Context, Scope, Value};


/// A tag argument as written in the template.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// A dotted name resolved against the key scope.
    Placeholder(String),
    /// An `@name` resolved against the context scope.
    Variable(String),
    Text(String),
    Number(f64),
}

impl Argument {
    /// Classify a raw argument token by its shape.
    pub(crate) fn parse(token: &str) -> Argument {
        if let Some(name) = token.strip_prefix('@') {
            Argument::Variable(name.to_owned())
        } else if let Some(text) = unquote(token) {
            Argument::Text(text.to_owned())
        } else if is_number(token) {
            token.parse::<f64>()
                .map_or_else(|_| Argument::Placeholder(token.to_owned()), Argument::Number)
        } else {
            Argument::Placeholder(token.to_owned())
        }
    }

    /// The placeholder name backing the argument, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Argument::Placeholder(name) => Some(name),
            _ => None,
        }
    }

    pub fn value(&self, key_scope: &Scope<'_>, context_scope: &Scope<'_>) -> Result<Value, RenderError> {
        self.value_in(key_scope, context_scope, &[])
    }

    fn value_in(
        &self, key_scope: &Scope<'_>, context_scope: &Scope<'_>, context: &[Context]
    ) -> Result<Value, RenderError> {
        match self {
            Argument::Placeholder(name) => key_scope.find_in(name, false, context),
            Argument::Variable(name) => context_scope.find_in(name, false, context),
            Argument::Text(text) => Ok(Value::text(text)),
            Argument::Number(n) => Ok(number_value(*n)),
        }
    }

    // what a setter writes to: the name itself, not its value
    fn target(&self) -> Value {
        match self {
            Argument::Placeholder(name) | Argument::Variable(name) | Argument::Text(name) =>
                Value::text(name),
            Argument::Number(n) => Value::Text(n.to_string()),
        }
    }
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::Int(n as i64)
    } else {
        Value::Float(n)
    }
}

fn unquote(token: &str) -> Option<&str> {
    ['\'', '"'].iter().find_map(|&quote| {
        token.strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
    })
    .filter(|_| token.len() >= 2)
}

// [-+]?\d*\.?\d+
fn is_number(token: &str) -> bool {
    let unsigned = token.strip_prefix(['-', '+']).unwrap_or(token);
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    match fraction {
        Some(fraction) => digits(integer) && !fraction.is_empty() && digits(fraction),
        None => !integer.is_empty() && digits(integer),
    }
}


/// Resolved argument values of one tag occurrence, by parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(HashMap<String, Value>);

static NULL: Value = Value::Null;

impl Arguments {
    pub fn get(&self, parameter: &str) -> &Value {
        self.0.get(parameter).unwrap_or(&NULL)
    }

    pub fn contains(&self, parameter: &str) -> bool {
        self.0.contains_key(parameter)
    }

    pub fn insert(&mut self, parameter: &str, value: Value) {
        self.0.insert(parameter.to_owned(), value);
    }
}


/// The arguments bound to each parameter of a tag occurrence, in parameter
/// order. A missing argument means the parameter's default applies.
#[derive(Debug, Clone, Default)]
pub struct ArgumentCollection {
    bindings: Vec<(TagParameter, Option<Argument>)>,
    // contexts open where the tag occurs, for not-found hooks
    context: Vec<Context>,
}

impl ArgumentCollection {
    pub(crate) fn new(bindings: Vec<(TagParameter, Option<Argument>)>, context: Vec<Context>) -> Self {
        ArgumentCollection { bindings, context }
    }

    pub fn argument(&self, parameter: &str) -> Option<&Argument> {
        self.bindings.iter()
            .find(|(p, _)| p.name() == parameter)
            .and_then(|(_, argument)| argument.as_ref())
    }

    /// The placeholder name bound to a parameter, if any.
    pub fn key(&self, parameter: &str) -> Option<&str> {
        self.argument(parameter).and_then(Argument::key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Resolve every argument against the live scopes.
    pub fn resolve(&self, key_scope: &Scope<'_>, context_scope: &Scope<'_>) -> Result<Arguments, RenderError> {
        let mut arguments = Arguments::default();
        for (parameter, argument) in &self.bindings {
            let value = match argument {
                Some(argument) => argument.value_in(key_scope, context_scope, &self.context)?,
                None => parameter.default_value().cloned().unwrap_or_default(),
            };
            arguments.insert(parameter.name(), value);
        }
        Ok(arguments)
    }

    /// The names written by the arguments, for tags that write into scope.
    pub fn targets(&self) -> Arguments {
        let mut arguments = Arguments::default();
        for (parameter, argument) in &self.bindings {
            let value = match argument {
                Some(argument) => argument.target(),
                None => parameter.default_value().cloned().unwrap_or_default(),
            };
            arguments.insert(parameter.name(), value);
        }
        arguments
    }
}
