//! Enforcement scope: reversible installation of contract wrappers
//!
//! Activation walks every supplied namespace once. Contracted functions are
//! rebound to wrappers, dispatch tables get a copy whose implementations are
//! wrapped, and classes have their contracted methods patched in place.
//! Everything is computed first and applied afterwards, so a provider
//! failure leaves namespaces and classes untouched.
//!
//! Deactivation walks the namespaces again and puts back the originals the
//! identity registry recorded. Wrappers stay cached on the scope, so the
//! same wrapper object is reinstalled on the next activation.

use std::sync::Arc;
use tracing::debug;

use super::EnforcementConfig;
use super::class::ClassRef;
use super::condition::Conditions;
use super::dispatch::DispatchRef;
use super::environment::Namespace;
use super::error::{ScopeError, ScopeResult};
use super::function::FunctionRef;
use super::guard::ReentrancyGuard;
use super::provider::ConditionProvider;
use super::registry::{IdentityRegistry, WrapperCache};
use super::value::Value;
use super::wrapper::EnforcementWrapper;

/// Hook deciding what "invoke the real implementation" means for a wrapper
pub type Interceptor = Arc<dyn Fn(&FunctionRef) -> FunctionRef + Send + Sync>;

struct MethodPatch {
    class: ClassRef,
    name: String,
    value: Value,
}

#[derive(Default)]
struct ActivationPlan {
    rebinds: Vec<Vec<(String, Value)>>,
    patches: Vec<MethodPatch>,
}

/// Installs contract wrappers into namespaces and restores them exactly.
pub struct EnforcementScope {
    envs: Vec<Arc<dyn Namespace>>,
    provider: Arc<dyn ConditionProvider>,
    interceptor: Interceptor,
    config: EnforcementConfig,
    guard: Arc<ReentrancyGuard>,
    registry: IdentityRegistry,
    cache: WrapperCache,
    patched: Vec<ClassRef>,
    active: bool,
}

impl EnforcementScope {
    /// Scope over no namespaces, using `provider` for contracts
    pub fn new(provider: Arc<dyn ConditionProvider>) -> Self {
        Self {
            envs: Vec::new(),
            provider,
            interceptor: Arc::new(|function: &FunctionRef| function.clone()),
            config: EnforcementConfig::default(),
            guard: Arc::new(ReentrancyGuard::new()),
            registry: IdentityRegistry::new(),
            cache: WrapperCache::new(),
            patched: Vec::new(),
            active: false,
        }
    }

    /// Add a namespace to instrument
    pub fn with_environment<N>(mut self, env: N) -> Self
    where
        N: Namespace + 'static,
    {
        self.envs.push(Arc::new(env));
        self
    }

    /// Add several namespaces, in order
    pub fn with_environments<N, I>(self, envs: I) -> Self
    where
        N: Namespace + 'static,
        I: IntoIterator<Item = N>,
    {
        envs.into_iter().fold(self, Self::with_environment)
    }

    /// Substitute what wrappers invoke in place of the original
    pub fn with_interceptor<F>(mut self, interceptor: F) -> Self
    where
        F: Fn(&FunctionRef) -> FunctionRef + Send + Sync + 'static,
    {
        self.interceptor = Arc::new(interceptor);
        self
    }

    /// Apply configuration
    pub fn with_config(mut self, config: EnforcementConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration
    pub fn config(&self) -> &EnforcementConfig {
        &self.config
    }

    /// Whether wrappers are currently installed
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether `value` is a wrapper installed by this scope
    pub fn is_instrumented(&self, value: &Value) -> bool {
        self.registry.is_wrapper(value)
    }

    /// Original behind an installed wrapper
    pub fn original_of(&self, value: &Value) -> Option<Value> {
        self.registry.lookup_original(value).cloned()
    }

    /// Install wrappers into every namespace.
    pub fn activate(&mut self) -> ScopeResult<()> {
        if self.active {
            return Err(ScopeError::AlreadyActive);
        }

        let registered = self.registry.clone();
        let plan = match self.plan_activation() {
            Ok(plan) => plan,
            Err(err) => {
                self.registry = registered;
                return Err(err);
            }
        };

        let mut rebound = 0;
        for (env, rebinds) in self.envs.iter().zip(plan.rebinds) {
            rebound += rebinds.len();
            for (name, value) in rebinds {
                env.rebind(&name, value);
            }
        }
        for patch in &plan.patches {
            patch.class.set_method(&patch.name, patch.value.clone());
            if !self.patched.iter().any(|class| class.id() == patch.class.id()) {
                self.patched.push(patch.class.clone());
            }
        }

        self.active = true;
        debug!(
            environments = self.envs.len(),
            rebound,
            methods_patched = plan.patches.len(),
            wrappers = self.registry.len(),
            "enforcement scope activated"
        );
        Ok(())
    }

    /// Restore every namespace and patched class. Never fails.
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }

        let mut restores = Vec::with_capacity(self.envs.len());
        for env in &self.envs {
            let mut env_restores = Vec::new();
            for (name, value) in env.entries() {
                if let Some(original) = self.unwrap_value(&value) {
                    env_restores.push((name, original));
                }
            }
            restores.push(env_restores);
        }

        let mut restored = 0;
        for (env, env_restores) in self.envs.iter().zip(restores) {
            restored += env_restores.len();
            for (name, value) in env_restores {
                env.rebind(&name, value);
            }
        }
        for class in std::mem::take(&mut self.patched) {
            self.unpatch_class(&class);
        }

        self.registry.clear();
        self.active = false;
        debug!(restored, "enforcement scope deactivated");
    }

    /// Activate, returning a guard that deactivates when dropped.
    pub fn enter(&mut self) -> ScopeResult<ActiveScope<'_>> {
        self.activate()?;
        Ok(ActiveScope { scope: self })
    }

    /// Run `body` with wrappers installed.
    ///
    /// Deactivation happens however `body` exits, unwinding included.
    pub fn run<T, F>(&mut self, body: F) -> ScopeResult<T>
    where
        F: FnOnce() -> T,
    {
        let active = self.enter()?;
        let out = body();
        drop(active);
        Ok(out)
    }

    /// Wrapper for `function`, or `function` itself when it has no contract.
    ///
    /// Repeated calls return the same wrapper; wrapping a wrapper returns it
    /// unchanged. The wrapper counts as instrumented until the next
    /// deactivation; a failed activation leaves it registered.
    pub fn wrap(&mut self, function: &FunctionRef) -> ScopeResult<FunctionRef> {
        self.wrap_fn(function, None)
    }

    fn plan_activation(&mut self) -> ScopeResult<ActivationPlan> {
        let mut plan = ActivationPlan::default();
        let envs = self.envs.clone();
        for env in &envs {
            let mut rebinds = Vec::new();
            for (name, value) in env.entries() {
                match &value {
                    Value::Dispatch(table) => {
                        if let Some(wrapped) = self.wrap_dispatch(table)? {
                            rebinds.push((name, wrapped));
                        }
                    }
                    Value::Function(function) => {
                        let wrapped = self.wrap_fn(function, None)?;
                        if wrapped.id() != function.id() {
                            rebinds.push((name, Value::Function(wrapped)));
                        }
                    }
                    Value::Class(class) => self.plan_class(class, &mut plan.patches)?,
                    _ => {}
                }
            }
            plan.rebinds.push(rebinds);
        }
        Ok(plan)
    }

    fn plan_class(&mut self, class: &ClassRef, patches: &mut Vec<MethodPatch>) -> ScopeResult<()> {
        let conditions = self
            .provider
            .class_conditions_for(class)
            .map_err(|source| ScopeError::Provider {
                target: class.name().to_string(),
                source,
            })?;
        if !conditions.has_any() {
            return Ok(());
        }

        for (name, member) in class.methods() {
            let Value::Function(method) = &member else {
                continue;
            };
            let Some(method_conditions) = conditions.method(&name) else {
                continue;
            };
            let wrapped = self.wrap_fn(method, Some(method_conditions.clone()))?;
            if wrapped.id() != method.id() {
                patches.push(MethodPatch {
                    class: class.clone(),
                    name,
                    value: Value::Function(wrapped),
                });
            }
        }
        Ok(())
    }

    fn wrap_fn(
        &mut self,
        function: &FunctionRef,
        conditions: Option<Conditions>,
    ) -> ScopeResult<FunctionRef> {
        let id = function.id();
        let value = Value::Function(function.clone());

        if let Some(Value::Function(wrapper)) = self.cache.wrapper_for(id).cloned() {
            self.registry.register(&Value::Function(wrapper.clone()), value);
            return Ok(wrapper);
        }
        if let Some(original) = self.cache.original_of(id).cloned() {
            self.registry.register(&value, original);
            return Ok(function.clone());
        }
        if conditions.is_none() && self.cache.is_passthrough(id) {
            return Ok(function.clone());
        }

        let from_provider = conditions.is_none();
        let conditions = match conditions {
            Some(conditions) => conditions,
            None => self
                .provider
                .conditions_for(function)
                .map_err(|source| ScopeError::Provider {
                    target: function.name().to_string(),
                    source,
                })?,
        };
        if !conditions.has_any() {
            if from_provider {
                self.cache.insert_passthrough(id);
            }
            return Ok(function.clone());
        }

        debug!(
            function = function.name(),
            preconditions = conditions.pre.len(),
            postconditions = conditions.post.len(),
            "instrumenting function"
        );
        let target = (self.interceptor)(function);
        let globals = self.provider.globals_for(function);
        let wrapper = EnforcementWrapper::new(
            function.clone(),
            target,
            conditions,
            globals,
            self.guard.clone(),
        )
        .with_trace_calls(self.config.trace_calls)
        .into_function();

        let wrapper_value = Value::Function(wrapper.clone());
        self.cache.insert(&value, &wrapper_value);
        self.registry.register(&wrapper_value, value);
        Ok(wrapper)
    }

    fn wrap_dispatch(&mut self, table: &DispatchRef) -> ScopeResult<Option<Value>> {
        let value = Value::Dispatch(table.clone());

        if let Some(wrapped) = self.cache.wrapper_for(table.id()).cloned() {
            if let Value::Dispatch(cached) = &wrapped {
                self.register_implementations(cached);
            }
            self.registry.register(&wrapped, value);
            return Ok(Some(wrapped));
        }
        if let Some(original) = self.cache.original_of(table.id()).cloned() {
            self.registry.register(&value, original);
            return Ok(None);
        }

        let wrapped = table.transform(|implementation| self.wrap_fn(implementation, None))?;
        if wrapped.same_implementations(table) {
            return Ok(None);
        }

        debug!(dispatch = table.name(), "instrumenting dispatch table");
        let wrapped = Value::Dispatch(wrapped.into_ref());
        self.cache.insert(&value, &wrapped);
        self.registry.register(&wrapped, value);
        Ok(Some(wrapped))
    }

    // Registry entries for the implementation wrappers inside a cached table.
    fn register_implementations(&mut self, table: &DispatchRef) {
        let implementations = std::iter::once(table.default_implementation())
            .chain(table.overloads().iter().map(|(_, implementation)| implementation));
        for implementation in implementations {
            if let Some(original) = self.cache.original_of(implementation.id()).cloned() {
                self.registry
                    .register(&Value::Function(implementation.clone()), original);
            }
        }
    }

    fn unwrap_value(&self, value: &Value) -> Option<Value> {
        if let Some(original) = self.registry.lookup_original(value) {
            return Some(original.clone());
        }
        match value {
            Value::Dispatch(table) => {
                let restored = table.map(|implementation| self.restore_fn(implementation));
                if restored.same_implementations(table) {
                    None
                } else {
                    Some(Value::Dispatch(restored.into_ref()))
                }
            }
            Value::Class(class) => {
                self.unpatch_class(class);
                None
            }
            _ => None,
        }
    }

    fn restore_fn(&self, function: &FunctionRef) -> FunctionRef {
        match self.registry.lookup_original(&Value::Function(function.clone())) {
            Some(Value::Function(original)) => original.clone(),
            _ => function.clone(),
        }
    }

    fn unpatch_class(&self, class: &ClassRef) {
        for (name, member) in class.methods() {
            if let Some(original) = self.registry.lookup_original(&member) {
                class.set_method(&name, original.clone());
            }
        }
    }
}

impl Drop for EnforcementScope {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// An activated scope; deactivates on drop.
pub struct ActiveScope<'a> {
    scope: &'a mut EnforcementScope,
}

impl ActiveScope<'_> {
    /// Whether `value` is a wrapper installed by this scope
    pub fn is_instrumented(&self, value: &Value) -> bool {
        self.scope.is_instrumented(value)
    }

    /// Original behind an installed wrapper
    pub fn original_of(&self, value: &Value) -> Option<Value> {
        self.scope.original_of(value)
    }
}

impl Drop for ActiveScope<'_> {
    fn drop(&mut self) {
        self.scope.deactivate();
    }
}
