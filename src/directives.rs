use crate::error::{Result, YamlppError};
use crate::value::{Mapping, Value};

/// The closed set of directives the engine evaluates.
///
/// Recognition is by exact dotted-key match at the point a mapping is
/// walked; any other dotted key is an error, never a pass-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// `.import` — load another document into the namespace.
    Import,
    /// `.switch` — select one of several guarded alternatives.
    Switch,
    /// `.context` — introduce plain top-level bindings.
    Context,
    /// `.env` — look up a process environment variable.
    Env,
}

impl Directive {
    pub fn from_key(key: &str) -> Option<Directive> {
        match key {
            ".import" => Some(Directive::Import),
            ".switch" => Some(Directive::Switch),
            ".context" => Some(Directive::Context),
            ".env" => Some(Directive::Env),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Directive::Import => ".import",
            Directive::Switch => ".switch",
            Directive::Context => ".context",
            Directive::Env => ".env",
        }
    }
}

/// One occurrence of a directive: its name, the source line of the directive
/// key (when known), and its argument.
///
/// A scalar argument is the short form; a mapping argument is the long form,
/// whose keys are dotted option names such as `.filename` or `.cases`.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveEntry {
    pub name: String,
    pub line: Option<usize>,
    pub argument: Value,
}

impl DirectiveEntry {
    pub fn new(name: impl Into<String>, argument: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            line: None,
            argument: argument.into(),
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Long-form argument mapping, if this is the long form.
    pub fn options(&self) -> Option<&Mapping> {
        self.argument.as_mapping()
    }

    /// Named option out of a long-form argument.
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options().and_then(|map| map.get(key))
    }

    /// Attach this entry's line to an error.
    pub fn error(&self, err: YamlppError) -> YamlppError {
        err.with_line(self.line)
    }

    /// Named option that must be present, or a validation error in the
    /// `does not contain '<key>'` form.
    pub fn require_option(&self, key: &str) -> Result<&Value> {
        self.option(key).ok_or_else(|| {
            self.error(YamlppError::validation(format!(
                "'{}' does not contain '{key}'",
                self.name
            )))
        })
    }
}

/// What a directive handler hands back to the tree walk.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveOutput {
    /// Side effects only; the directive key simply disappears.
    Nothing,
    /// Entries to splice into the enclosing mapping in place of the key.
    Entries(Mapping),
    /// A value replacing the directive.
    Value(Value),
}
