use crate::runtime::environment::Environment;
use crate::runtime::error::{LookupError, LookupResult};
use crate::runtime::value::Value;

const LOCALS_SEGMENT: &str = "<locals>";

/// Follow a dotted path of member names starting at `root`.
///
/// Classes are walked through their method tables and maps through their
/// keys. An empty path returns `root`.
pub fn walk_qualname(root: &Value, name: &str) -> LookupResult<Value> {
    let mut current = root.clone();
    if name.is_empty() {
        return Ok(current);
    }
    for part in name.split('.') {
        if part == LOCALS_SEGMENT {
            return Err(LookupError::NonAddressable(name.to_string()));
        }
        let next = match &current {
            Value::Class(class) => class.method(part),
            Value::Map(map) => map.get(part),
            _ => None,
        };
        current = next.ok_or_else(|| LookupError::NotFound(part.to_string()))?;
    }
    Ok(current)
}

/// Resolve `Head.rest.of.path`, looking `Head` up in `env`.
pub fn resolve_qualname(env: &Environment, name: &str) -> LookupResult<Value> {
    let (head, rest) = name.split_once('.').unwrap_or((name, ""));
    if head == LOCALS_SEGMENT {
        return Err(LookupError::NonAddressable(name.to_string()));
    }
    let root = env
        .get(head)
        .ok_or_else(|| LookupError::NotFound(head.to_string()))?;
    walk_qualname(&root, rest).map_err(|err| match err {
        LookupError::NonAddressable(_) => LookupError::NonAddressable(name.to_string()),
        other => other,
    })
}
