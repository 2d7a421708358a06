//! Type-dispatching callables
//!
//! A dispatch table routes a call to one of several implementations by the
//! type of its first positional argument. Overloads are kept in registration
//! order and consulted first-match; the default handles everything else.

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use super::Args;
use super::error::CallResult;
use super::function::FunctionRef;
use super::value::{ObjectId, TypeTag, Value};

/// Handle to a dispatch table
pub type DispatchRef = Arc<DispatchTable>;

/// Ordered type → implementation table with a default
pub struct DispatchTable {
    id: ObjectId,
    name: String,
    default: FunctionRef,
    overloads: Vec<(TypeTag, FunctionRef)>,
}

impl DispatchTable {
    /// New table whose only implementation is `default`
    pub fn new(name: impl Into<String>, default: FunctionRef) -> Self {
        Self {
            id: ObjectId::new(),
            name: name.into(),
            default,
            overloads: Vec::new(),
        }
    }

    /// Register an implementation for `tag`.
    ///
    /// Re-registering a tag replaces its implementation in place.
    pub fn register(mut self, tag: TypeTag, implementation: FunctionRef) -> Self {
        match self.overloads.iter_mut().find(|(existing, _)| *existing == tag) {
            Some(entry) => entry.1 = implementation,
            None => self.overloads.push((tag, implementation)),
        }
        self
    }

    /// Freeze into a shareable handle
    pub fn into_ref(self) -> DispatchRef {
        Arc::new(self)
    }

    /// Object identity
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fallback implementation
    pub fn default_implementation(&self) -> &FunctionRef {
        &self.default
    }

    /// Registered overloads in registration order
    pub fn overloads(&self) -> &[(TypeTag, FunctionRef)] {
        &self.overloads
    }

    /// Implementation selected for `args`
    pub fn resolve(&self, args: &Args) -> &FunctionRef {
        let Some(tag) = args.first().map(Value::type_tag) else {
            return &self.default;
        };
        self.overloads
            .iter()
            .find(|(registered, _)| *registered == tag)
            .map(|(_, implementation)| implementation)
            .unwrap_or(&self.default)
    }

    /// Route and invoke
    pub fn call(&self, args: &Args) -> CallResult<Value> {
        self.resolve(args).call(args)
    }

    /// Build a new table by passing every implementation, default included,
    /// through `transform`. Routing order is preserved.
    pub fn transform<F, E>(&self, mut transform: F) -> Result<DispatchTable, E>
    where
        F: FnMut(&FunctionRef) -> Result<FunctionRef, E>,
    {
        let default = transform(&self.default)?;
        let mut overloads = Vec::with_capacity(self.overloads.len());
        for (tag, implementation) in &self.overloads {
            overloads.push((*tag, transform(implementation)?));
        }
        Ok(DispatchTable {
            id: ObjectId::new(),
            name: self.name.clone(),
            default,
            overloads,
        })
    }

    /// Infallible form of [`DispatchTable::transform`]
    pub fn map<F>(&self, mut transform: F) -> DispatchTable
    where
        F: FnMut(&FunctionRef) -> FunctionRef,
    {
        match self.transform(|implementation| Ok::<_, Infallible>(transform(implementation))) {
            Ok(table) => table,
            Err(never) => match never {},
        }
    }

    /// Whether both tables route every type to the identical implementation
    pub fn same_implementations(&self, other: &DispatchTable) -> bool {
        self.default.id() == other.default.id()
            && self.overloads.len() == other.overloads.len()
            && self
                .overloads
                .iter()
                .zip(&other.overloads)
                .all(|((a_tag, a), (b_tag, b))| a_tag == b_tag && a.id() == b.id())
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("default", &self.default.name())
            .field(
                "overloads",
                &self.overloads.iter().map(|(tag, _)| *tag).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::function::{Function, Signature};

    fn constant(name: &str, out: &'static str) -> FunctionRef {
        Function::new(name, Signature::from_names(&["x"]), move |_| Ok(Value::from(out)))
    }

    fn describe() -> DispatchTable {
        DispatchTable::new("describe", constant("describe_any", "any"))
            .register(TypeTag::Int, constant("describe_int", "int"))
            .register(TypeTag::Str, constant("describe_str", "str"))
    }

    #[test]
    fn test_routes_by_first_argument_type() {
        let table = describe();
        assert_eq!(table.call(&Args::new().arg(3)).unwrap(), Value::from("int"));
        assert_eq!(table.call(&Args::new().arg("x")).unwrap(), Value::from("str"));
        assert_eq!(table.call(&Args::new().arg(true)).unwrap(), Value::from("any"));
        assert_eq!(table.call(&Args::new()).unwrap(), Value::from("any"));
    }

    #[test]
    fn test_transform_preserves_order_and_default() {
        let table = describe();
        let copy = table.map(|implementation| implementation.clone());
        assert_ne!(copy.id(), table.id());
        assert!(copy.same_implementations(&table));

        let tags: Vec<TypeTag> = copy.overloads().iter().map(|(tag, _)| *tag).collect();
        assert_eq!(tags, vec![TypeTag::Int, TypeTag::Str]);

        let replaced = table.map(|_| constant("other", "other"));
        assert!(!replaced.same_implementations(&table));
        assert_eq!(replaced.call(&Args::new().arg(1)).unwrap(), Value::from("other"));
    }

    #[test]
    fn test_reregistering_replaces_in_place() {
        let table = describe().register(TypeTag::Int, constant("again", "again"));
        assert_eq!(table.overloads().len(), 2);
        assert_eq!(table.overloads()[0].0, TypeTag::Int);
        assert_eq!(table.call(&Args::new().arg(1)).unwrap(), Value::from("again"));
    }
}
