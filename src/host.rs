//! Scripting host boundary
//!
//! The host resolves modules by name and calls methods on them with
//! dynamically typed arguments. Objects returned to scripts (the module
//! itself, client handles) implement [`HostObject`]; plain data crosses the
//! boundary as [`Value`].

use crate::document::{Binary, Document, Value};
use crate::error::{Error, Result, ScriptError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Something a script can call methods on
pub trait HostObject: Send + Sync {
    /// Method names in the host's casing
    fn methods(&self) -> &'static [&'static str];

    /// Call `method` with positional arguments
    fn invoke(&self, method: &str, args: Arguments) -> std::result::Result<Exported, ScriptError>;
}

/// Return value of a host call
#[derive(Clone)]
pub enum Exported {
    Value(Value),
    Object(Arc<dyn HostObject>),
}

impl Exported {
    /// Script-visible `null`
    pub fn null() -> Self {
        Exported::Value(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Exported::Value(Value::Null))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Exported::Value(v) => Some(v),
            Exported::Object(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Exported::Value(v) => Some(v),
            Exported::Object(_) => None,
        }
    }

    pub fn into_object(self) -> Option<Arc<dyn HostObject>> {
        match self {
            Exported::Object(o) => Some(o),
            Exported::Value(_) => None,
        }
    }
}

impl fmt::Debug for Exported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exported::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Exported::Object(o) => f.debug_tuple("Object").field(&o.methods()).finish(),
        }
    }
}

impl From<Value> for Exported {
    fn from(value: Value) -> Self {
        Exported::Value(value)
    }
}

/// Positional call arguments with typed accessors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Vec<Value>,
}

impl Arguments {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn required(&self, index: usize) -> Result<&Value> {
        self.values
            .get(index)
            .ok_or_else(|| Error::InvalidArgument(format!("missing argument {}", index)))
    }

    fn mismatch(index: usize, expected: &str, got: &Value) -> Error {
        Error::InvalidArgument(format!(
            "argument {} must be {}, got {}",
            index,
            expected,
            got.type_name()
        ))
    }

    pub fn string(&self, index: usize) -> Result<&str> {
        let value = self.required(index)?;
        value
            .as_str()
            .ok_or_else(|| Self::mismatch(index, "a string", value))
    }

    pub fn integer(&self, index: usize) -> Result<i64> {
        let value = self.required(index)?;
        value
            .as_i64()
            .ok_or_else(|| Self::mismatch(index, "an integer", value))
    }

    /// Integer, `default` when absent or null
    pub fn integer_or(&self, index: usize, default: i64) -> Result<i64> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(default),
            Some(_) => self.integer(index),
        }
    }

    pub fn binary(&self, index: usize) -> Result<&Binary> {
        let value = self.required(index)?;
        value
            .as_binary()
            .ok_or_else(|| Self::mismatch(index, "a binary value", value))
    }

    pub fn document(&self, index: usize) -> Result<Document> {
        let value = self.required(index)?;
        value
            .as_document()
            .cloned()
            .ok_or_else(|| Self::mismatch(index, "an object", value))
    }

    /// Document, empty when absent or null
    pub fn document_or_empty(&self, index: usize) -> Result<Document> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(Document::new()),
            Some(_) => self.document(index),
        }
    }

    /// Array whose items are all documents
    pub fn documents(&self, index: usize) -> Result<Vec<Document>> {
        let value = self.required(index)?;
        let items = value
            .as_array()
            .ok_or_else(|| Self::mismatch(index, "an array", value))?;

        items
            .iter()
            .map(|item| {
                item.as_document().cloned().ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "argument {} must contain only objects, found {}",
                        index,
                        item.type_name()
                    ))
                })
            })
            .collect()
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

/// Modules registered with the host, by import name
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn HostObject>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` under `name`. Names are registered once.
    pub fn register(&mut self, name: &str, module: Arc<dyn HostObject>) -> Result<()> {
        if self.modules.contains_key(name) {
            return Err(Error::Config(format!("module '{}' is already registered", name)));
        }
        info!(module = name, methods = module.methods().len(), "Registered module");
        self.modules.insert(name.to_string(), module);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn HostObject>> {
        self.modules.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Fail a dispatch for a method the object does not have
pub(crate) fn unknown_method(object: &str, method: &str) -> ScriptError {
    Error::InvalidArgument(format!("{} has no method '{}'", object, method)).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl HostObject for Echo {
        fn methods(&self) -> &'static [&'static str] {
            &["echo"]
        }

        fn invoke(&self, method: &str, args: Arguments) -> std::result::Result<Exported, ScriptError> {
            match method {
                "echo" => Ok(Value::from(args.string(0)?).into()),
                other => Err(unknown_method("Echo", other)),
            }
        }
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let mut registry = ModuleRegistry::new();
        registry.register("x/echo", Arc::new(Echo)).unwrap();
        assert!(registry.register("x/echo", Arc::new(Echo)).is_err());
        assert_eq!(registry.names(), vec!["x/echo"]);
    }

    #[test]
    fn test_dispatch_through_registry() {
        let mut registry = ModuleRegistry::new();
        registry.register("x/echo", Arc::new(Echo)).unwrap();

        let module = registry.get("x/echo").unwrap();
        let out = module
            .invoke("echo", Arguments::new(vec![Value::from("hi")]))
            .unwrap();
        assert_eq!(out.as_value(), Some(&Value::from("hi")));

        let err = module.invoke("shout", Arguments::default()).unwrap_err();
        assert_eq!(err.name, "TypeError");
    }

    #[test]
    fn test_argument_accessors() {
        let args = Arguments::new(vec![
            Value::from("db"),
            Value::Float(5.0),
            Value::Null,
            Value::Array(vec![Value::Document(Document::new())]),
        ]);

        assert_eq!(args.string(0).unwrap(), "db");
        assert_eq!(args.integer(1).unwrap(), 5);
        assert!(args.document_or_empty(2).unwrap().is_empty());
        assert_eq!(args.integer_or(7, 0).unwrap(), 0);
        assert_eq!(args.documents(3).unwrap().len(), 1);

        let err = args.document(0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: argument 0 must be an object, got string"
        );
        assert!(args.string(9).is_err());
    }

    #[test]
    fn test_huge_float_is_not_an_integer_argument() {
        let args = Arguments::new(vec![Value::Float(1e20)]);
        let err: ScriptError = args.integer_or(0, 0).unwrap_err().into();
        assert_eq!(err.name, "TypeError");
    }
}
