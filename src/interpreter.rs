use std::env;
use std::path::{Path, PathBuf};

use crate::directives::{Directive, DirectiveEntry, DirectiveOutput};
use crate::error::{Result, YamlppError};
use crate::loader;
use crate::stack::Stack;
use crate::value::{Mapping, Value};

/// Construction options for [`Interpreter::open_with`].
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Base directory for resolving import filenames. Defaults to the
    /// document's own directory.
    pub source_dir: Option<PathBuf>,
    /// Render eagerly at construction instead of on first access.
    pub render: bool,
}

/// Rendering happens at most once per session; repeat access replays the
/// memoized outcome without re-running directive handlers.
#[derive(Debug, Clone)]
enum RenderState {
    Unrendered,
    Rendered(Value),
    Failed(YamlppError),
}

/// One evaluation session over one document.
///
/// Holds the positioned initial tree, the namespace of bindings produced by
/// directives, and the lazily rendered result. Imports construct nested
/// sessions rooted at the imported file; only the bindings chosen by the
/// import's form ever reach the importer.
#[derive(Debug)]
pub struct Interpreter {
    source_dir: PathBuf,
    stack: Stack,
    initial: Value,
    rendered: RenderState,
    import_chain: Vec<PathBuf>,
}

impl Interpreter {
    /// A bare session with an empty document, rooted at `source_dir`.
    /// Useful for driving [`Interpreter::handle_import`] directly.
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            stack: Stack::new(),
            initial: Value::Null,
            rendered: RenderState::Unrendered,
            import_chain: Vec::new(),
        }
    }

    /// Parse the document at `path`; imports resolve relative to its
    /// directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, Options::default())
    }

    /// Parse the document at `path` with explicit [`Options`]. With
    /// `render: true` the first directive failure surfaces here.
    pub fn open_with(path: impl AsRef<Path>, options: Options) -> Result<Self> {
        let path = path.as_ref();
        let initial = loader::load_file(path)?;
        let source_dir = match options.source_dir {
            Some(dir) => dir,
            None => path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
        };
        let mut interpreter = Self {
            source_dir,
            stack: Stack::new(),
            initial,
            rendered: RenderState::Unrendered,
            import_chain: path.canonicalize().ok().into_iter().collect(),
        };
        if options.render {
            interpreter.tree()?;
        }
        Ok(interpreter)
    }

    /// Parse an in-memory document.
    pub fn from_source(source: &str, source_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut interpreter = Self::new(source_dir);
        interpreter.initial = loader::load_str(source)?;
        Ok(interpreter)
    }

    /// Replace this session's document with the one at `path`, resetting the
    /// stack and any rendered result.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.initial = loader::load_file(path)?;
        self.source_dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        self.stack = Stack::new();
        self.rendered = RenderState::Unrendered;
        self.import_chain = path.canonicalize().ok().into_iter().collect();
        Ok(())
    }

    /// The positioned, structurally parsed document with directives intact.
    pub fn initial_tree(&self) -> &Value {
        &self.initial
    }

    /// Mutable access to the initial tree. Rendering validates against the
    /// structure as it stands when `tree` is first called, so edits made
    /// here are honored.
    pub fn initial_tree_mut(&mut self) -> &mut Value {
        &mut self.initial
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// The fully rendered, directive-free document.
    ///
    /// Evaluates all directives depth-first on first call and memoizes the
    /// outcome; a second call returns the same tree (or replays the same
    /// error) without re-running handlers or duplicating stack bindings.
    pub fn tree(&mut self) -> Result<&Value> {
        if matches!(self.rendered, RenderState::Unrendered) {
            let initial = self.initial.clone();
            self.rendered = match self.render_value(&initial) {
                Ok(value) => RenderState::Rendered(value),
                Err(err) => RenderState::Failed(err),
            };
        }
        match &self.rendered {
            RenderState::Rendered(value) => Ok(value),
            RenderState::Failed(err) => Err(err.clone()),
            RenderState::Unrendered => unreachable!("render ran above"),
        }
    }

    fn render_value(&mut self, value: &Value) -> Result<Value> {
        match value {
            Value::Mapping(map) => self.render_mapping(map),
            Value::Sequence(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.render_value(item)?);
                }
                Ok(Value::Sequence(out))
            }
            scalar => Ok(scalar.clone()),
        }
    }

    fn render_mapping(&mut self, map: &Mapping) -> Result<Value> {
        let sole_key = map.len() == 1;
        let mut out = Mapping::new();
        for (key, slot) in map.iter() {
            if let Some(directive) = Directive::from_key(key) {
                let entry =
                    DirectiveEntry::new(key.clone(), slot.value.clone()).with_line(slot.line);
                match self.dispatch(directive, &entry)? {
                    DirectiveOutput::Nothing => {}
                    DirectiveOutput::Entries(entries) => out.merge(entries),
                    DirectiveOutput::Value(Value::Mapping(result)) => out.merge(result),
                    DirectiveOutput::Value(result) => {
                        if sole_key {
                            return Ok(result);
                        }
                        return Err(entry.error(YamlppError::structure(format!(
                            "'{key}' produced a {} that cannot replace part of a mapping",
                            result.type_name()
                        ))));
                    }
                }
            } else if key.starts_with('.') {
                return Err(YamlppError::unknown_directive(key).with_line(Some(slot.line)));
            } else {
                let value = self.render_value(&slot.value)?;
                out.insert(key.clone(), slot.line, value);
            }
        }
        Ok(Value::Mapping(out))
    }

    fn dispatch(&mut self, directive: Directive, entry: &DirectiveEntry) -> Result<DirectiveOutput> {
        match directive {
            Directive::Import => self.handle_import(entry),
            Directive::Switch => self.handle_switch(entry),
            Directive::Context => self.handle_context(entry),
            Directive::Env => self.handle_env(entry),
        }
    }

    /// Resolve one `.import` occurrence against this session.
    ///
    /// Public so a caller can drive imports against a bare session; during
    /// rendering it is invoked through directive dispatch.
    pub fn handle_import(&mut self, entry: &DirectiveEntry) -> Result<DirectiveOutput> {
        // All option-shape errors fire before any file access.
        let spec = ImportSpec::from_entry(entry)?;
        let path = self.source_dir.join(&spec.filename);
        if !path.is_file() {
            return Err(entry.error(YamlppError::resolution(format!(
                "No match for import file '{}'",
                path.display()
            ))));
        }
        let canonical = path.canonicalize().map_err(|e| {
            entry.error(YamlppError::io(format!(
                "cannot resolve '{}': {e}",
                path.display()
            )))
        })?;
        if self.import_chain.contains(&canonical) {
            return Err(entry.error(YamlppError::circular_import(&canonical)));
        }

        let mut nested = Interpreter::open(&path)?;
        nested.import_chain = self.import_chain.clone();
        nested.import_chain.push(canonical);
        let tree = nested.tree()?.clone();
        // The nested session's stack is dropped here: nothing from the
        // module leaks except what the import form binds below.

        match spec.binding {
            ImportBinding::Namespace => {
                let name = Path::new(&spec.filename)
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or(&spec.filename)
                    .to_string();
                self.stack.bind(name, tree);
                Ok(DirectiveOutput::Nothing)
            }
            ImportBinding::Alias(alias) => {
                self.stack.bind(alias, tree);
                Ok(DirectiveOutput::Nothing)
            }
            ImportBinding::Exposes(names) => {
                let module = tree.as_mapping().ok_or_else(|| {
                    entry.error(YamlppError::structure(format!(
                        "cannot expose names from '{}': module is not a mapping",
                        spec.filename
                    )))
                })?;
                let mut entries = Mapping::new();
                for name in &names {
                    let slot = module.slot(name).ok_or_else(|| {
                        entry.error(YamlppError::resolution(format!(
                            "Cannot import item '{name}' from '{}'",
                            spec.filename
                        )))
                    })?;
                    self.stack.bind(name.clone(), slot.value.clone());
                    // Exposed entries keep the imported file's own lines.
                    entries.insert(name.clone(), slot.line, slot.value.clone());
                }
                Ok(DirectiveOutput::Entries(entries))
            }
        }
    }

    fn handle_switch(&mut self, entry: &DirectiveEntry) -> Result<DirectiveOutput> {
        if entry.options().is_none() {
            return Err(entry.error(YamlppError::structure(
                "'.switch' expects an option mapping",
            )));
        }
        let cases = entry.require_option(".cases")?.clone();
        let selected = match cases {
            Value::Sequence(items) => self.select_guarded_case(&items, entry)?,
            Value::Mapping(map) => self.select_keyed_case(&map, entry)?,
            other => {
                return Err(entry.error(YamlppError::structure(format!(
                    "'.cases' must be a sequence or a mapping, not {}",
                    other.type_name()
                ))));
            }
        };
        let rendered = self.render_value(&selected)?;
        Ok(DirectiveOutput::Value(rendered))
    }

    /// Sequence form: the first case whose `.when` binding is truthy wins;
    /// a case without `.when` always matches.
    fn select_guarded_case(&self, items: &[Value], entry: &DirectiveEntry) -> Result<Value> {
        for item in items {
            let case = item.as_mapping().ok_or_else(|| {
                entry.error(YamlppError::structure(
                    "each entry of '.cases' must be a mapping",
                ))
            })?;
            let matched = match case.get(".when") {
                Some(guard) => {
                    let name = guard.as_str().ok_or_else(|| {
                        entry.error(YamlppError::structure("'.when' must be a binding name"))
                    })?;
                    self.stack.get(name).map(Value::is_truthy).unwrap_or(false)
                }
                None => true,
            };
            if matched {
                return case.get(".then").cloned().ok_or_else(|| {
                    entry.error(YamlppError::validation(
                        "selected case does not contain '.then'",
                    ))
                });
            }
        }
        Err(entry.error(YamlppError::validation("'.switch' has no matching case")))
    }

    /// Mapping form: `.cases` keys are matched against the stringified value
    /// of the `.on` binding, with `.default` as fallback.
    fn select_keyed_case(&self, map: &Mapping, entry: &DirectiveEntry) -> Result<Value> {
        let on = entry.require_option(".on")?;
        let name = on.as_str().ok_or_else(|| {
            entry.error(YamlppError::structure("'.on' must be a binding name"))
        })?;
        let bound = self.stack.get(name).ok_or_else(|| {
            entry.error(YamlppError::resolution(format!("no binding named '{name}'")))
        })?;
        let key = bound.scalar_string().ok_or_else(|| {
            entry.error(YamlppError::structure(format!(
                "'.on' binding '{name}' is not a scalar"
            )))
        })?;
        map.get(&key)
            .or_else(|| map.get(".default"))
            .cloned()
            .ok_or_else(|| {
                entry.error(YamlppError::validation(format!(
                    "no matching case for '{key}'"
                )))
            })
    }

    /// `.context` entries become plain keys of the enclosing mapping; they
    /// get no scoping effect beyond that.
    fn handle_context(&mut self, entry: &DirectiveEntry) -> Result<DirectiveOutput> {
        let map = entry
            .options()
            .ok_or_else(|| entry.error(YamlppError::structure("'.context' expects a mapping")))?
            .clone();
        match self.render_mapping(&map)? {
            Value::Mapping(entries) => Ok(DirectiveOutput::Entries(entries)),
            other => Err(entry.error(YamlppError::structure(format!(
                "'.context' must produce a mapping, not {}",
                other.type_name()
            )))),
        }
    }

    fn handle_env(&mut self, entry: &DirectiveEntry) -> Result<DirectiveOutput> {
        let (name, default) = match &entry.argument {
            Value::Str(name) => (name.clone(), None),
            Value::Mapping(options) => {
                for key in options.keys() {
                    if !matches!(key.as_str(), ".name" | ".default") {
                        return Err(entry.error(YamlppError::structure(format!(
                            "unknown option '{key}' for '.env'"
                        ))));
                    }
                }
                let name = entry
                    .require_option(".name")?
                    .as_str()
                    .ok_or_else(|| {
                        entry.error(YamlppError::structure("'.name' must be a string"))
                    })?
                    .to_string();
                (name, entry.option(".default").cloned())
            }
            other => {
                return Err(entry.error(YamlppError::structure(format!(
                    "'.env' expects a variable name or an option mapping, not {}",
                    other.type_name()
                ))));
            }
        };
        match env::var(&name) {
            Ok(value) => Ok(DirectiveOutput::Value(Value::Str(value))),
            Err(_) => default.map(DirectiveOutput::Value).ok_or_else(|| {
                entry.error(YamlppError::resolution(format!(
                    "environment variable '{name}' is not set"
                )))
            }),
        }
    }
}

#[derive(Debug)]
enum ImportBinding {
    Namespace,
    Alias(String),
    Exposes(Vec<String>),
}

#[derive(Debug)]
struct ImportSpec {
    filename: String,
    binding: ImportBinding,
}

impl ImportSpec {
    fn from_entry(entry: &DirectiveEntry) -> Result<Self> {
        match &entry.argument {
            Value::Str(filename) => Ok(Self {
                filename: filename.clone(),
                binding: ImportBinding::Namespace,
            }),
            Value::Mapping(options) => {
                for key in options.keys() {
                    if !matches!(key.as_str(), ".filename" | ".as" | ".exposes") {
                        return Err(entry.error(YamlppError::structure(format!(
                            "unknown option '{key}' for '.import'"
                        ))));
                    }
                }
                let filename = entry
                    .require_option(".filename")?
                    .as_str()
                    .ok_or_else(|| {
                        entry.error(YamlppError::structure("'.filename' must be a string"))
                    })?
                    .to_string();
                let alias = options.get(".as");
                let exposes = options.get(".exposes");
                if alias.is_some() && exposes.is_some() {
                    return Err(entry.error(YamlppError::structure(
                        "'.as' and '.exposes' are mutually exclusive",
                    )));
                }
                let binding = if let Some(alias) = alias {
                    let alias = alias.as_str().ok_or_else(|| {
                        entry.error(YamlppError::structure("'.as' must be a string"))
                    })?;
                    ImportBinding::Alias(alias.to_string())
                } else if let Some(exposes) = exposes {
                    let items = exposes.as_sequence().ok_or_else(|| {
                        entry.error(YamlppError::structure("'.exposes' expects a list"))
                    })?;
                    let mut names = Vec::with_capacity(items.len());
                    for item in items {
                        let name = item.as_str().ok_or_else(|| {
                            entry.error(YamlppError::structure(
                                "'.exposes' entries must be plain names",
                            ))
                        })?;
                        names.push(name.to_string());
                    }
                    ImportBinding::Exposes(names)
                } else {
                    ImportBinding::Namespace
                };
                Ok(Self { filename, binding })
            }
            other => Err(entry.error(YamlppError::structure(format!(
                "'.import' expects a filename or an option mapping, not {}",
                other.type_name()
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn render(source: &str) -> Result<Value> {
        let mut i = Interpreter::from_source(source, ".")?;
        i.tree().cloned()
    }

    #[test]
    fn test_directive_free_render_is_identity() {
        let source = "\
name: demo
items:
  - 1
  - 2
nested:
  deep: true
";
        let mut i = Interpreter::from_source(source, ".").unwrap();
        let initial = i.initial_tree().clone();
        assert_eq!(i.tree().unwrap(), &initial);
    }

    #[test]
    fn test_unknown_directive_fails_with_line() {
        let err = render("ok: 1\n.mystery: 2\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownDirective);
        assert_eq!(err.line, Some(2));
        assert!(err.to_string().contains(".mystery"));
    }

    #[test]
    fn test_context_splices_plain_entries() {
        let source = "\
.context:
  foo: 1
  bar: two
tail: end
";
        let tree = render(source).unwrap();
        assert_eq!(tree.get("foo"), Some(&Value::Int(1)));
        assert_eq!(tree.get("bar"), Some(&Value::from("two")));
        assert_eq!(tree.get("tail"), Some(&Value::from("end")));
        assert!(tree.get(".context").is_none());
    }

    #[test]
    fn test_context_does_not_touch_the_stack() {
        let mut i = Interpreter::from_source(".context:\n  foo: 1\n", ".").unwrap();
        i.tree().unwrap();
        assert!(i.stack().is_empty());
    }

    #[test]
    fn test_env_short_form() {
        env::set_var("YPP_TEST_ENV_SHORT", "hit");
        let tree = render("home: {.env: YPP_TEST_ENV_SHORT}\n").unwrap();
        assert_eq!(tree.get("home"), Some(&Value::from("hit")));
    }

    #[test]
    fn test_env_long_form_default() {
        let source = "\
port:
  .env:
    .name: YPP_TEST_ENV_SURELY_UNSET
    .default: 8080
";
        let tree = render(source).unwrap();
        assert_eq!(tree.get("port"), Some(&Value::Int(8080)));
    }

    #[test]
    fn test_env_missing_without_default() {
        let err = render("x: {.env: YPP_TEST_ENV_ALSO_UNSET}\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Resolution);
        assert!(err.to_string().contains("YPP_TEST_ENV_ALSO_UNSET"));
    }

    #[test]
    fn test_scalar_result_among_siblings_is_an_error() {
        env::set_var("YPP_TEST_ENV_SIBLING", "v");
        let source = "\
block:
  .env: YPP_TEST_ENV_SIBLING
  other: 1
";
        let err = render(source).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Structure);
    }

    #[test]
    fn test_switch_guarded_default_case() {
        let source = "\
server:
  .switch:
    .cases:
      - .when: debug
        .then:
          port: 8080
      - .then:
          port: 80
";
        let tree = render(source).unwrap();
        assert_eq!(tree.get("server").unwrap().get("port"), Some(&Value::Int(80)));
    }

    #[test]
    fn test_switch_guard_matches_truthy_binding() {
        let source = "\
server:
  .switch:
    .cases:
      - .when: debug
        .then:
          port: 8080
      - .then:
          port: 80
";
        let mut i = Interpreter::from_source(source, ".").unwrap();
        // Imports are the only way bindings normally appear; simulate one.
        let mut module = Mapping::new();
        module.insert("level", 1, Value::from("high"));
        i.stack.bind("debug", Value::Mapping(module));
        let tree = i.tree().unwrap();
        assert_eq!(tree.get("server").unwrap().get("port"), Some(&Value::Int(8080)));
    }

    #[test]
    fn test_switch_missing_cases_names_option_and_line() {
        let source = "\
server:
  .switch:
    .branches: []
";
        let err = render(source).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.to_string().contains("not contain '.cases'"));
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_switch_no_matching_case() {
        let source = "\
x:
  .switch:
    .cases:
      - .when: never
        .then: 1
";
        let err = render(source).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.to_string().contains("no matching case"));
    }

    #[test]
    fn test_switch_keyed_form() {
        let source = "\
greeting:
  .switch:
    .on: lang
    .cases:
      en: hello
      fr: bonjour
      .default: '?'
";
        let mut i = Interpreter::from_source(source, ".").unwrap();
        i.stack.bind("lang", Value::from("fr"));
        let tree = i.tree().unwrap();
        assert_eq!(tree.get("greeting"), Some(&Value::from("bonjour")));
    }

    #[test]
    fn test_switch_keyed_form_falls_back_to_default() {
        let source = "\
greeting:
  .switch:
    .on: lang
    .cases:
      en: hello
      .default: '?'
";
        let mut i = Interpreter::from_source(source, ".").unwrap();
        i.stack.bind("lang", Value::from("de"));
        let tree = i.tree().unwrap();
        assert_eq!(tree.get("greeting"), Some(&Value::from("?")));
    }

    #[test]
    fn test_render_failure_is_memoized() {
        let mut i = Interpreter::from_source("x:\n  .switch: {}\n", ".").unwrap();
        let first = i.tree().unwrap_err();
        let second = i.tree().unwrap_err();
        assert_eq!(first, second);
    }

    #[test]
    fn test_import_spec_rejects_unknown_option() {
        let mut arg = Mapping::new();
        arg.insert(".filename", 1, Value::from("m.ypp"));
        arg.insert(".frm", 2, Value::from("x"));
        let entry = DirectiveEntry::new(".import", arg);
        let err = ImportSpec::from_entry(&entry).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Structure);
        assert!(err.to_string().contains(".frm"));
    }

    #[test]
    fn test_import_spec_alias_and_exposes_conflict() {
        let mut arg = Mapping::new();
        arg.insert(".filename", 1, Value::from("m.ypp"));
        arg.insert(".as", 2, Value::from("m"));
        arg.insert(".exposes", 3, Value::Sequence(vec![Value::from("a")]));
        let entry = DirectiveEntry::new(".import", arg);
        let err = ImportSpec::from_entry(&entry).unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }
}
