//! ypp — a directive-driven preprocessor for YAML configuration documents.
//!
//! Documents may contain dotted directive keys (`.import`, `.switch`,
//! `.context`, `.env`) that the [`Interpreter`] evaluates into a final,
//! directive-free tree while attributing failures back to source lines.

pub mod directives;
pub mod error;
pub mod interpreter;
pub mod loader;
pub mod stack;
pub mod value;

pub use directives::{Directive, DirectiveEntry, DirectiveOutput};
pub use error::{ErrorKind, Result, YamlppError};
pub use interpreter::{Interpreter, Options};
pub use stack::Stack;
pub use value::{Mapping, Positioned, Value};
