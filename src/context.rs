/// A tag that introduced a new context while compiling, e.g. an `each`
/// loop over `items`.
///
/// The list of open contexts is handed to found and not-found hooks so they
/// can tell where a key occurs; it plays no part in value resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub tag: String,
    pub parameters: Vec<ContextParameter>,
}

/// A parameter of a context-creating tag and the placeholder bound to it,
/// if the argument was a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextParameter {
    pub parameter: String,
    pub key: Option<String>,
}

impl Context {
    pub fn new(tag: &str, parameters: Vec<ContextParameter>) -> Self {
        Context {
            tag: tag.to_owned(),
            parameters,
        }
    }

    pub fn key(&self, parameter: &str) -> Option<&str> {
        self.parameters.iter()
            .find(|p| p.parameter == parameter)
            .and_then(|p| p.key.as_deref())
    }
}

impl ContextParameter {
    pub fn new(parameter: &str, key: Option<&str>) -> Self {
        ContextParameter {
            parameter: parameter.to_owned(),
            key: key.map(str::to_owned),
        }
    }
}
