//! A Mustache-like template engine with tags, scopes and composite
//! formatting.
//!
//! A [FormatCompiler] turns template text into a [Template], which renders
//! against a [Value] built from JSON, YAML, serde types, plain Rust
//! collections or application types implementing [Reflect].
//!
//! Placeholders (`{{name}}`) are looked up in the data; variables
//! (`{{@name}}`) are looked up in a separate scope maintained by the
//! engine, for instance the loop `index`. Both accept an alignment and a
//! format string: `{{amount,8:F2}}`.
//!
//! Tags are written `{{#name args}}...{{/name}}`. The built-in tags are
//! `if`/`elif`/`else`, `each`, `with`, `index`, `set` and `newline`; more
//! can be registered through [TagDefinition] and [TagBehavior]. Comments
//! are written `{{#! ... }}`. Newlines in the template text are dropped
//! unless [CompilerOptions::remove_newlines] is turned off, use
//! `{{#newline}}` to write one.
//!
//!
//! # Samples
//!
//! ## Hello world
//!
//! ```
//! use stache::{Template, JsonValue, Value};
//!
//! let text = "hello, {{you}}!";
//! let data = r#"{
//!     "you": "world"
//! }"#;
//!
//! let template = Template::from(text).unwrap();
//! let json = serde_json::from_str::<JsonValue>(data).unwrap();
//!
//! let result = template.render(&Value::from(&json)).unwrap();
//!
//! assert_eq!(result, "hello, world!")
//! ```
//!
//! ## Conditionals
//!
//! ```
//! use stache::{Template, YamlValue, Value};
//!
//! let text = "Hello {{name}}, you have \
//!     {{#if count}}{{count}} items{{else}}no items{{/if}}.";
//!
//! let template = Template::from(text).unwrap();
//! let none = serde_yaml::from_str::<YamlValue>("{name: Ana, count: 0}").unwrap();
//! let some = serde_yaml::from_str::<YamlValue>("{name: Ana, count: 3}").unwrap();
//!
//! assert_eq!(template.render(&Value::from(&none)).unwrap(), "Hello Ana, you have no items.");
//! assert_eq!(template.render(&Value::from(&some)).unwrap(), "Hello Ana, you have 3 items.");
//! ```
//!
//! ## Hello team
//!
//! ```
//! use stache::{Template, YamlValue, Value};
//! let text = r#"
//!   {{#each team}}
//!   {{@index}}. hello, {{address}} {{name,-6}}!{{#newline}}
//!   {{/each}}
//! "#;
//! let data = r#"
//!   team:
//!     - name: john
//!       address: little
//!     - name: 42
//!       address: citizen
//! "#;
//!
//! let template = Template::from(text).unwrap();
//! let yaml = serde_yaml::from_str::<YamlValue>(data).unwrap();
//!
//! let result = template.render(&Value::from(&yaml)).unwrap();
//! assert_eq!(result, "    0. hello, little john  !\n    1. hello, citizen 42    !\n  ");
//! ```
//!
//! ## HTML
//!
//! ```
//! use stache::{FormatCompiler, Value};
//!
//! let template = FormatCompiler::html().compile("{{code}} or {{{code}}}").unwrap();
//! let data = Value::from_iter([("code", "<br>")]);
//!
//! assert_eq!(template.render(&data).unwrap(), "&lt;br&gt; or <br>");
//! ```
mod error;
mod value;
mod reflect;
mod json;
mod yaml;
mod events;
mod context;
mod scope;
mod argument;
mod tags;
mod format;
mod matcher;
mod generator;
mod compiler;
mod template;

pub use self::error::{CompileError, FormatError, Location, RenderError};
pub use self::value::{Mapping, Value};
pub use self::reflect::{Member, Reflect, Reflected};
pub use self::json::JsonValue;
pub use self::yaml::YamlValue;
pub use self::events::{
    KeyFoundArgs, KeyNotFoundArgs, PlaceholderFoundArgs, RenderHooks, TagFormattedArgs,
    ValueRequestArgs, VariableFoundArgs,
};
pub use self::context::{Context, ContextParameter};
pub use self::scope::Scope;
pub use self::argument::{Argument, ArgumentCollection, Arguments};
pub use self::tags::{is_truthy, NestedContext, TagBehavior, TagDefinition, TagParameter, TagRegistry};
pub use self::format::{FormatSpec, NumberFormat};
pub use self::compiler::{CompilerOptions, FormatCompiler};
pub use self::template::Template;
