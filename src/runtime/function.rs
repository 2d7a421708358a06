//! Callables, call signatures, and argument binding

use std::fmt;
use std::sync::Arc;

use super::error::{CallError, CallResult};
use super::value::{ObjectId, Value};

/// Arguments supplied to a call
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Positional arguments, in order
    pub positional: Vec<Value>,
    /// Keyword arguments, in the order given
    pub keyword: Vec<(String, Value)>,
}

impl Args {
    /// Empty argument list
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional-only argument list
    pub fn positional(values: Vec<Value>) -> Self {
        Self {
            positional: values,
            keyword: Vec::new(),
        }
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Append a keyword argument
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }

    /// First positional argument, used for dispatch routing
    pub fn first(&self) -> Option<&Value> {
        self.positional.first()
    }
}

/// Declared parameter
#[derive(Debug, Clone)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Default used when the caller omits the argument
    pub default: Option<Value>,
}

/// Ordered parameter list of a callable
#[derive(Debug, Clone, Default)]
pub struct Signature {
    parameters: Vec<Parameter>,
}

impl Signature {
    /// Signature with no parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Required parameters named in order
    pub fn from_names(names: &[&str]) -> Self {
        names.iter().fold(Self::new(), |sig, name| sig.param(*name))
    }

    /// Append a required parameter
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Append a parameter with a default
    pub fn param_with_default(
        mut self,
        name: impl Into<String>,
        default: impl Into<Value>,
    ) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    /// Declared parameters
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Whether a parameter named `name` exists
    pub fn contains(&self, name: &str) -> bool {
        self.parameters.iter().any(|param| param.name == name)
    }

    /// Bind `args` to parameters, applying defaults for omitted ones.
    pub fn bind(&self, function: &str, args: &Args) -> CallResult<BoundArguments> {
        let binding_error = |detail: String| CallError::Binding {
            function: function.to_string(),
            detail,
        };

        if args.positional.len() > self.parameters.len() {
            return Err(binding_error(format!(
                "takes {} positional argument(s) but {} were given",
                self.parameters.len(),
                args.positional.len()
            )));
        }

        let mut slots: Vec<Option<Value>> = vec![None; self.parameters.len()];
        for (slot, value) in slots.iter_mut().zip(&args.positional) {
            *slot = Some(value.clone());
        }

        for (name, value) in &args.keyword {
            let index = self
                .parameters
                .iter()
                .position(|param| &param.name == name)
                .ok_or_else(|| binding_error(format!("unexpected keyword argument '{name}'")))?;
            if slots[index].is_some() {
                return Err(binding_error(format!("multiple values for argument '{name}'")));
            }
            slots[index] = Some(value.clone());
        }

        let mut entries = Vec::with_capacity(slots.len());
        for (param, slot) in self.parameters.iter().zip(slots) {
            let value = match (slot, &param.default) {
                (Some(value), _) => value,
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    return Err(binding_error(format!(
                        "missing required argument '{}'",
                        param.name
                    )));
                }
            };
            entries.push((param.name.clone(), value));
        }

        Ok(BoundArguments { entries })
    }
}

/// Parameter name → argument value, in declaration order
#[derive(Debug, Clone, Default)]
pub struct BoundArguments {
    entries: Vec<(String, Value)>,
}

impl BoundArguments {
    /// Value bound to `name`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
    }

    /// Whether `name` is bound
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over bindings in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of bound parameters
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is bound
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Native implementation of a callable
pub type NativeFn = Arc<dyn Fn(&Args) -> CallResult<Value> + Send + Sync>;

/// Handle to a callable
pub type FunctionRef = Arc<Function>;

/// A named callable with a signature
pub struct Function {
    id: ObjectId,
    name: String,
    signature: Signature,
    body: NativeFn,
}

impl Function {
    /// Create a callable from a native body
    pub fn new<F>(name: impl Into<String>, signature: Signature, body: F) -> FunctionRef
    where
        F: Fn(&Args) -> CallResult<Value> + Send + Sync + 'static,
    {
        Arc::new(Self {
            id: ObjectId::new(),
            name: name.into(),
            signature,
            body: Arc::new(body),
        })
    }

    /// Object identity
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Invoke the body
    pub fn call(&self, args: &Args) -> CallResult<Value> {
        (self.body)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish()
    }
}
