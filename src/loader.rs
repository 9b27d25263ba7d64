use std::collections::HashMap;
use std::fs;
use std::path::Path;

use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use crate::error::{Result, YamlppError};
use crate::value::{Mapping, Value};

/// Parse a YAML document into a positioned [`Value`] tree.
///
/// Every mapping key records the 1-based line it was declared on. Plain
/// scalars are typed (null/bool/int/float), quoted and block scalars stay
/// strings, and anchors/aliases are resolved by copying.
pub fn load_str(source: &str) -> Result<Value> {
    let mut builder = TreeBuilder::default();
    let mut parser = Parser::new_from_str(source);
    parser
        .load(&mut builder, false)
        .map_err(|e| YamlppError::parse(format!("invalid YAML: {e}")))?;
    if let Some(err) = builder.error {
        return Err(err);
    }
    Ok(builder.root.unwrap_or(Value::Null))
}

/// Read and parse a file.
pub fn load_file(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)
        .map_err(|e| YamlppError::io(format!("cannot read '{}': {e}", path.display())))?;
    load_str(&source)
}

enum Frame {
    Sequence {
        items: Vec<Value>,
        anchor: usize,
    },
    Mapping {
        map: Mapping,
        pending_key: Option<(String, usize)>,
        anchor: usize,
    },
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Frame>,
    root: Option<Value>,
    anchors: HashMap<usize, Value>,
    error: Option<YamlppError>,
}

impl TreeBuilder {
    fn fail(&mut self, err: YamlppError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Route a completed node into the enclosing container, or make it the
    /// document root.
    fn emit(&mut self, value: Value, mark: Marker) {
        match self.stack.last_mut() {
            Some(Frame::Sequence { items, .. }) => items.push(value),
            Some(Frame::Mapping { map, pending_key, .. }) => match pending_key.take() {
                Some((key, line)) => map.insert(key, line, value),
                None => match value.scalar_string() {
                    Some(key) => *pending_key = Some((key, mark.line())),
                    None => self.fail(
                        YamlppError::parse("mapping keys must be scalars")
                            .with_line(Some(mark.line())),
                    ),
                },
            },
            None => self.root = Some(value),
        }
    }

    fn scalar(value: String, style: TScalarStyle) -> Value {
        if style != TScalarStyle::Plain {
            return Value::Str(value);
        }
        match value.as_str() {
            "" | "~" | "null" | "Null" | "NULL" => return Value::Null,
            "true" | "True" | "TRUE" => return Value::Bool(true),
            "false" | "False" | "FALSE" => return Value::Bool(false),
            _ => {}
        }
        if let Ok(i) = value.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = value.parse::<f64>() {
            return Value::Float(f);
        }
        Value::Str(value)
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, event: Event, mark: Marker) {
        if self.error.is_some() {
            return;
        }
        match event {
            Event::Scalar(value, style, anchor, ..) => {
                let value = Self::scalar(value, style);
                if anchor != 0 {
                    self.anchors.insert(anchor, value.clone());
                }
                self.emit(value, mark);
            }
            Event::Alias(anchor) => match self.anchors.get(&anchor) {
                Some(value) => {
                    let value = value.clone();
                    self.emit(value, mark);
                }
                None => self.fail(
                    YamlppError::parse("alias refers to an unknown anchor")
                        .with_line(Some(mark.line())),
                ),
            },
            Event::SequenceStart(anchor, ..) => {
                self.stack.push(Frame::Sequence {
                    items: Vec::new(),
                    anchor,
                });
            }
            Event::SequenceEnd => {
                if let Some(Frame::Sequence { items, anchor }) = self.stack.pop() {
                    let value = Value::Sequence(items);
                    if anchor != 0 {
                        self.anchors.insert(anchor, value.clone());
                    }
                    self.emit(value, mark);
                }
            }
            Event::MappingStart(anchor, ..) => {
                self.stack.push(Frame::Mapping {
                    map: Mapping::new(),
                    pending_key: None,
                    anchor,
                });
            }
            Event::MappingEnd => {
                if let Some(Frame::Mapping { map, anchor, .. }) = self.stack.pop() {
                    let value = Value::Mapping(map);
                    if anchor != 0 {
                        self.anchors.insert(anchor, value.clone());
                    }
                    self.emit(value, mark);
                }
            }
            Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd
            | Event::Nothing => {}
        }
    }
}
