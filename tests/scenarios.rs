//! End-to-end contract scenarios
//!
//! Each test builds a small module namespace, registers contracts in a
//! catalog, and calls through the installed wrappers.

use enforced::runtime::{
    Args, CallError, Class, ClassConditions, Condition, Conditions, ContractCatalog,
    DispatchTable, EnforcementScope, Environment, Function, FunctionRef, PostconditionFailed,
    Signature, SourceLocation, TypeTag, Value,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn int_arg(args: &Args) -> i64 {
    args.first().and_then(Value::as_int).unwrap_or_default()
}

fn half() -> FunctionRef {
    Function::new("half", Signature::from_names(&["x"]), |args| {
        Ok(Value::Int(int_arg(args).div_euclid(2)))
    })
}

fn half_conditions() -> Conditions {
    Conditions::new(Signature::from_names(&["x"]))
        .require(Condition::new(
            "x % 2 == 0",
            SourceLocation::new("numbers.rs", 4),
            |b| Ok(b.int("x")? % 2 == 0),
        ))
        .ensure(Condition::new(
            "__return__ * 2 == x",
            SourceLocation::new("numbers.rs", 5),
            |b| {
                let ret = b.return_value().and_then(Value::as_int).unwrap_or_default();
                Ok(ret * 2 == b.int("x")?)
            },
        ))
}

#[test]
fn half_checks_even_inputs() {
    let original = half();
    let module = Environment::new().with("half", original.clone());
    let catalog = Arc::new(ContractCatalog::new());
    catalog.register_function(&original, half_conditions());

    let mut scope = EnforcementScope::new(catalog).with_environment(module.clone());
    let active = scope.enter().expect("activation");

    let wrapped = module.get("half").unwrap();
    assert!(active.is_instrumented(&wrapped));
    assert_eq!(wrapped.call(&Args::new().arg(4)).unwrap(), Value::Int(2));

    let err = wrapped.call(&Args::new().arg(3)).unwrap_err();
    match err {
        CallError::Precondition(failure) => {
            assert_eq!(failure.location, SourceLocation::new("numbers.rs", 4));
        }
        other => panic!("expected precondition failure, got {other:?}"),
    }

    drop(active);
    assert!(module.get("half").unwrap().is_identical(&Value::Function(original)));
}

fn push_conditions() -> Conditions {
    Conditions::new(Signature::from_names(&["lst", "value"]))
        .mutable("lst")
        .ensure(Condition::new(
            "len(lst) == len(__old__.lst) + 1",
            SourceLocation::new("lists.rs", 12),
            |b| {
                let now = b.value("lst")?.as_list().map(|l| l.len()).unwrap_or_default();
                let before = b
                    .old("lst")
                    .and_then(Value::as_list)
                    .map(|l| l.len())
                    .unwrap_or_default();
                Ok(now == before + 1)
            },
        ))
}

fn run_push(push: FunctionRef) -> Result<Value, CallError> {
    let module = Environment::new().with("push", push.clone());
    let catalog = Arc::new(ContractCatalog::new());
    catalog.register_function(&push, push_conditions());

    let mut scope = EnforcementScope::new(catalog).with_environment(module.clone());
    scope
        .run(|| {
            let items = Value::list(vec![Value::Int(1)]);
            module
                .get("push")
                .unwrap()
                .call(&Args::new().arg(items).arg(2))
        })
        .expect("activation")
}

#[test]
fn push_postcondition_sees_pre_call_snapshot() {
    let append = Function::new("push", Signature::from_names(&["lst", "value"]), |args| {
        let list = args.positional[0].as_list().cloned().expect("list argument");
        list.push(args.positional[1].clone());
        Ok(Value::None)
    });
    assert_eq!(run_push(append).unwrap(), Value::None);

    let noop = Function::new("push", Signature::from_names(&["lst", "value"]), |_| Ok(Value::None));
    let err = run_push(noop).unwrap_err();
    assert_eq!(
        err,
        CallError::Postcondition(PostconditionFailed::Violated {
            location: SourceLocation::new("lists.rs", 12),
        })
    );
}

#[test]
fn class_method_is_patched_in_place_and_restored() {
    let withdraw = Function::new("withdraw", Signature::from_names(&["self", "amount"]), |args| {
        Ok(args.positional[1].clone())
    });
    let balance = Function::new("balance", Signature::from_names(&["self"]), |_| Ok(Value::Int(0)));
    let account = Class::new("Account")
        .with_method("withdraw", withdraw.clone())
        .with_method("balance", balance.clone())
        .into_ref();
    let module = Environment::new().with("Account", account.clone());

    let catalog = Arc::new(ContractCatalog::new());
    catalog.register_class(
        &account,
        ClassConditions::new().with_method(
            "withdraw",
            Conditions::new(Signature::from_names(&["self", "amount"])).require(Condition::new(
                "amount > 0",
                SourceLocation::new("bank.rs", 20),
                |b| Ok(b.int("amount")? > 0),
            )),
        ),
    );

    let mut scope = EnforcementScope::new(catalog).with_environment(module.clone());
    scope.activate().unwrap();

    // The environment still binds the very same class object.
    assert!(module.get("Account").unwrap().is_identical(&Value::Class(account.clone())));

    let patched = account.method("withdraw").unwrap();
    assert!(scope.is_instrumented(&patched));
    assert!(account.method("balance").unwrap().is_identical(&Value::Function(balance.clone())));
    assert_eq!(account.invoke("withdraw", &Args::new().arg(0).arg(5)).unwrap(), Value::Int(5));
    assert!(account
        .invoke("withdraw", &Args::new().arg(0).arg(-5))
        .unwrap_err()
        .is_precondition());

    scope.deactivate();
    assert!(account.method("withdraw").unwrap().is_identical(&Value::Function(withdraw)));
    assert!(account.method("balance").unwrap().is_identical(&Value::Function(balance)));
    assert!(!scope.is_instrumented(&patched));
}

#[test]
fn dispatch_routes_before_and_after_wrapping() {
    let fallback =
        Function::new("area_any", Signature::from_names(&["shape"]), |_| Ok(Value::Int(-1)));
    let square = Function::new("area_int", Signature::from_names(&["shape"]), |args| {
        let side = int_arg(args);
        Ok(Value::Int(side * side))
    });
    let named = Function::new("area_str", Signature::from_names(&["shape"]), |args| {
        let len = args.first().and_then(Value::as_str).map(str::len).unwrap_or_default();
        Ok(Value::Int(len as i64))
    });
    let area = DispatchTable::new("area", fallback.clone())
        .register(TypeTag::Int, square.clone())
        .register(TypeTag::Str, named.clone())
        .into_ref();
    let module = Environment::new().with("area", area.clone());

    let catalog = Arc::new(ContractCatalog::new());
    catalog.register_function(
        &square,
        Conditions::new(Signature::from_names(&["shape"])).require(Condition::new(
            "shape >= 0",
            SourceLocation::new("shapes.rs", 30),
            |b| Ok(b.int("shape")? >= 0),
        )),
    );

    let route = |value: &Value, arg: Value| value.call(&Args::new().arg(arg));
    let before = module.get("area").unwrap();
    assert_eq!(route(&before, Value::Int(3)).unwrap(), Value::Int(9));
    assert_eq!(route(&before, Value::Int(-3)).unwrap(), Value::Int(9));

    let mut scope = EnforcementScope::new(catalog).with_environment(module.clone());
    scope.activate().unwrap();

    let wrapped = module.get("area").unwrap();
    assert!(!wrapped.is_identical(&before));
    assert!(scope.is_instrumented(&wrapped));
    assert_eq!(route(&wrapped, Value::Int(3)).unwrap(), Value::Int(9));
    assert_eq!(route(&wrapped, Value::from("abcd")).unwrap(), Value::Int(4));
    assert_eq!(route(&wrapped, Value::Bool(true)).unwrap(), Value::Int(-1));
    assert!(route(&wrapped, Value::Int(-3)).unwrap_err().is_precondition());

    let table = wrapped.as_dispatch().unwrap();
    assert!(table.default_implementation().id() == fallback.id());
    assert!(table.overloads()[1].1.id() == named.id());
    assert!(table.overloads()[0].1.id() != square.id());

    scope.deactivate();
    let after = module.get("area").unwrap();
    assert!(after.is_identical(&Value::Dispatch(area)));
    assert_eq!(route(&after, Value::Int(-3)).unwrap(), Value::Int(9));
}

#[test]
fn implementation_errors_bypass_postconditions() {
    let post_runs = Arc::new(AtomicUsize::new(0));
    let seen = post_runs.clone();
    let parse = Function::new("parse", Signature::from_names(&["text"]), |args| {
        match args.first().and_then(Value::as_str).map(str::parse::<i64>) {
            Some(Ok(num)) => Ok(Value::Int(num)),
            _ => Err(CallError::raised("invalid literal")),
        }
    });
    let module = Environment::new().with("parse", parse.clone());
    let catalog = Arc::new(ContractCatalog::new());
    catalog.register_function(
        &parse,
        Conditions::new(Signature::from_names(&["text"])).ensure(Condition::new(
            "__return__ >= 0",
            SourceLocation::new("parse.rs", 2),
            move |b| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(b.return_value().and_then(Value::as_int).unwrap_or_default() >= 0)
            },
        )),
    );

    let mut scope = EnforcementScope::new(catalog).with_environment(module.clone());
    let outcome = scope
        .run(|| {
            let parse = module.get("parse").unwrap();
            let ok = parse.call(&Args::new().arg("12"));
            let negative = parse.call(&Args::new().arg("-4"));
            let bad = parse.call(&Args::new().arg("twelve"));
            (ok, negative, bad)
        })
        .unwrap();

    assert_eq!(outcome.0.unwrap(), Value::Int(12));
    assert!(outcome.1.unwrap_err().is_postcondition());
    assert_eq!(outcome.2.unwrap_err(), CallError::raised("invalid literal"));
    assert_eq!(post_runs.load(Ordering::SeqCst), 2);
}
