use kyute_store::{
    memoize, meta_reducer_fn, reducer_fn, select,
    stream::{BehaviorSubject, Observable, ObserverFn, Subscription},
    Action, Error, Lifecycle, Reducer, RootReducer, SelectorArg, Store, StoreConfig, Value, INIT, UPDATE,
};
use serde_json::json;
use std::{cell::RefCell, rc::Rc};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Integer slice starting at 0, incremented by `INC`.
fn counter() -> Reducer {
    reducer_fn(|state, action| {
        if action.is("INC") {
            Ok(Value::Int(state.as_i64().unwrap_or(0) + 1))
        } else if state.is_undefined() {
            Ok(Value::Int(0))
        } else {
            Ok(state.clone())
        }
    })
}

/// Slice replaced by the `value` field of `SET` actions.
fn setter() -> Reducer {
    reducer_fn(|state, action| {
        if action.is("SET") {
            Ok(action.get("value"))
        } else {
            Ok(state.clone())
        }
    })
}

fn collect<T: Clone + 'static>(obs: &Observable<T>) -> (Rc<RefCell<Vec<T>>>, Subscription) {
    let values = Rc::new(RefCell::new(Vec::new()));
    let sink = values.clone();
    let sub = obs.subscribe_fn(move |v: &T| sink.borrow_mut().push(v.clone()));
    (values, sub)
}

fn set(value: serde_json::Value) -> Action {
    Action::new("SET").with("value", Value::from_json(value))
}

#[test]
fn nested_projection_suppresses_equal_values() {
    init_tracing();
    let store = Store::builder().reducer("a", setter()).build();
    let (values, _sub) = collect(&store.select2("a", "b"));

    store.dispatch(set(json!({"b": 1}))).unwrap();
    store.dispatch(set(json!({"b": 1}))).unwrap();
    store.dispatch(set(json!({"b": 2}))).unwrap();

    assert_eq!(*values.borrow(), vec![Value::Undefined, Value::Int(1), Value::Int(2)]);
}

#[test]
fn counter_increments() {
    init_tracing();
    let store = Store::builder().reducer("counter", counter()).build();
    assert_eq!(store.snapshot().to_json(), json!({"counter": 0}));
    store.dispatch(Action::new("INC")).unwrap();
    assert_eq!(store.snapshot().to_json(), json!({"counter": 1}));
}

#[test]
fn projections_emit_current_value_on_subscription() {
    init_tracing();
    let store = Store::builder().reducer("counter", counter()).build();
    store.dispatch(Action::new("INC")).unwrap();
    let projection = store.select1("counter");

    let (first, _a) = collect(&projection);
    let (second, _b) = collect(&projection);
    store.dispatch(Action::new("INC")).unwrap();

    assert_eq!(*first.borrow(), vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(*second.borrow(), vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn unrelated_actions_do_not_reemit() {
    init_tracing();
    let store = Store::builder().reducer("counter", counter()).reducer("a", setter()).build();
    let (values, _sub) = collect(&store.select1("counter"));
    for _ in 0..3 {
        store.dispatch(Action::new("NOOP")).unwrap();
    }
    store.dispatch(set(json!("x"))).unwrap();
    assert_eq!(*values.borrow(), vec![Value::Int(0)]);
}

#[test]
fn adding_and_removing_reducers_changes_the_schema() {
    init_tracing();
    let store = Store::builder().reducer("a", counter()).build();
    let (b_values, _sub) = collect(&store.select1("b"));

    store.add_reducer("b", counter()).unwrap();
    assert_eq!(store.snapshot().to_json(), json!({"a": 0, "b": 0}));
    store.dispatch(Action::new("INC")).unwrap();
    assert_eq!(store.snapshot().to_json(), json!({"a": 1, "b": 1}));

    store.remove_reducer("b").unwrap();
    assert_eq!(store.snapshot().to_json(), json!({"a": 1}));
    assert_eq!(
        *b_values.borrow(),
        vec![Value::Undefined, Value::Int(0), Value::Int(1), Value::Undefined]
    );
    assert_eq!(store.reducer_generation(), 3);
}

#[test]
fn reducer_with_initial_state() {
    init_tracing();
    let store = Store::default();
    store
        .add_reducer_with_initial_state("counter", counter(), Value::Int(41))
        .unwrap();
    store.dispatch(Action::new("INC")).unwrap();
    assert_eq!(store.snapshot().property("counter"), Value::Int(42));
}

#[test]
fn initial_state_from_config() {
    init_tracing();
    let config = StoreConfig::from_json(r#"{"initial_state": {"counter": 10}}"#).unwrap();
    let store = Store::builder().with_config(config).reducer("counter", counter()).build();
    store.dispatch(Action::new("INC")).unwrap();
    assert_eq!(store.snapshot().to_json(), json!({"counter": 11}));
}

#[test]
fn same_actions_produce_same_state() {
    init_tracing();
    let run = || {
        let store = Store::builder().reducer("counter", counter()).reducer("a", setter()).build();
        store.dispatch(Action::new("INC")).unwrap();
        store.dispatch(set(json!({"x": [1, 2]}))).unwrap();
        store.dispatch(Action::new("INC")).unwrap();
        store.snapshot()
    };
    assert_eq!(run(), run());
}

#[test]
fn stores_are_independent() {
    init_tracing();
    let first = Store::builder().reducer("counter", counter()).build();
    let second = Store::builder().reducer("counter", counter()).build();
    let (values, _sub) = collect(&second.select1("counter"));

    first.dispatch(Action::new("INC")).unwrap();
    first.dispatch(Action::new("INC")).unwrap();

    assert_eq!(first.snapshot().property("counter"), Value::Int(2));
    assert_eq!(second.snapshot().property("counter"), Value::Int(0));
    assert_eq!(*values.borrow(), vec![Value::Int(0)]);
}

#[test]
fn invalid_selectors_fail_before_subscription() {
    init_tracing();
    let store = Store::default();
    assert!(matches!(
        store.select(Value::Int(1), &[]),
        Err(Error::UnexpectedSelectorType { found: "number" })
    ));
    assert!(matches!(
        store.select(SelectorArg::map(|s| s.clone()), &["x"]),
        Err(Error::MapFnWithPath { .. })
    ));
}

#[test]
fn select_with_function_and_path() {
    init_tracing();
    let store = Store::builder().reducer("a", setter()).build();
    let (by_path, _a) = collect(&store.select("a", &["b", "c"]).unwrap());
    let (by_fn, _b) = collect(&store.select(SelectorArg::map(|s| s.property("a")), &[]).unwrap());

    store.dispatch(set(json!({"b": {"c": true}}))).unwrap();

    assert_eq!(*by_path.borrow(), vec![Value::Undefined, Value::Bool(true)]);
    assert_eq!(by_fn.borrow().len(), 2);
    assert_eq!(by_fn.borrow()[1].to_json(), json!({"b": {"c": true}}));
}

#[test]
fn memoized_projection() {
    init_tracing();
    let store = Store::builder().reducer("items", setter()).reducer("counter", counter()).build();
    let total = memoize(
        |s: &Value| s.property("items"),
        |items: &Value| {
            items
                .as_list()
                .map(|l| l.iter().filter_map(Value::as_i64).sum::<i64>())
                .unwrap_or(0)
        },
    );
    let (values, _sub) = collect(&store.select_with(total.clone().into_fn()));

    store
        .dispatch(Action::new("SET").with("value", vec![Value::Int(1), Value::Int(2)]))
        .unwrap();
    store.dispatch(Action::new("INC")).unwrap();
    store.dispatch(Action::new("INC")).unwrap();

    assert_eq!(*values.borrow(), vec![0, 3]);
    assert_eq!(total.recomputations(), 2);
}

#[test]
fn reentrant_dispatch_is_folded_after_current_emission() {
    init_tracing();
    let store = Store::builder().reducer("counter", counter()).build();
    let log = Rc::new(RefCell::new(Vec::new()));

    let first_log = log.clone();
    let dispatcher = store.sink();
    let _a = store.select1("counter").subscribe_fn(move |v: &Value| {
        first_log.borrow_mut().push(("first", v.clone()));
        if *v == Value::Int(1) {
            dispatcher.dispatch(Action::new("INC")).unwrap();
        }
    });
    let second_log = log.clone();
    let _b = store
        .select1("counter")
        .subscribe_fn(move |v: &Value| second_log.borrow_mut().push(("second", v.clone())));

    store.dispatch(Action::new("INC")).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            ("first", Value::Int(0)),
            ("second", Value::Int(0)),
            ("first", Value::Int(1)),
            ("second", Value::Int(1)),
            ("first", Value::Int(2)),
            ("second", Value::Int(2)),
        ]
    );
}

#[test]
fn unsubscribe_from_within_emission() {
    init_tracing();
    let store = Store::builder().reducer("counter", counter()).build();
    let values = Rc::new(RefCell::new(Vec::new()));
    let handle: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

    let sink = values.clone();
    let own = handle.clone();
    let sub = store.select1("counter").subscribe_fn(move |v: &Value| {
        sink.borrow_mut().push(v.clone());
        if *v == Value::Int(1) {
            if let Some(sub) = own.borrow().as_ref() {
                sub.unsubscribe();
            }
        }
    });
    *handle.borrow_mut() = Some(sub.clone());

    let (others, _other) = collect(&store.select1("counter"));
    store.dispatch(Action::new("INC")).unwrap();
    store.dispatch(Action::new("INC")).unwrap();

    assert!(sub.is_closed());
    assert_eq!(*values.borrow(), vec![Value::Int(0), Value::Int(1)]);
    assert_eq!(*others.borrow(), vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
}

#[test]
fn scanned_actions_follow_state() {
    init_tracing();
    let store = Store::builder().reducer("counter", counter()).build();
    let log = Rc::new(RefCell::new(Vec::new()));

    let state_log = log.clone();
    let _a = store
        .state()
        .as_observable()
        .subscribe_fn(move |s: &Value| state_log.borrow_mut().push(format!("state {}", s.to_json())));
    let action_log = log.clone();
    let _b = store
        .scanned_actions()
        .subscribe_fn(move |a: &Action| action_log.borrow_mut().push(format!("action {}", a.kind())));

    store.dispatch(Action::new("INC")).unwrap();
    store.add_reducer("other", counter()).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            r#"state {"counter":0}"#.to_string(),
            r#"state {"counter":1}"#.to_string(),
            "action INC".to_string(),
            r#"state {"counter":1,"other":0}"#.to_string(),
            format!("action {UPDATE}"),
        ]
    );
}

#[test]
fn dispatched_actions_stream() {
    init_tracing();
    let store = Store::default();
    let (actions, _sub) = collect(&store.actions());
    store.dispatch(Action::new("A")).unwrap();
    store.dispatch(Action::new("B")).unwrap();
    let kinds: Vec<_> = actions.borrow().iter().map(|a| a.kind().to_string()).collect();
    assert_eq!(kinds, vec!["A", "B"]);
}

#[test]
fn meta_reducers_see_every_action() {
    init_tracing();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let store = Store::builder()
        .reducer("counter", counter())
        .meta_reducer(meta_reducer_fn(move |inner: RootReducer| {
            let log = log.clone();
            let reducer: RootReducer = Rc::new(move |state: &Value, action: &Action| {
                log.borrow_mut().push(action.kind().to_string());
                inner(state, action)
            });
            reducer
        }))
        .build();
    store.dispatch(Action::new("INC")).unwrap();
    assert_eq!(*seen.borrow(), vec![INIT.to_string(), "INC".to_string()]);
}

#[test]
fn reducer_error_terminates_projections() {
    init_tracing();
    let store = Store::builder()
        .reducer("counter", counter())
        .reducer(
            "strict",
            reducer_fn(|state, action| {
                if action.is("FORBIDDEN") {
                    anyhow::bail!("FORBIDDEN is not allowed");
                }
                Ok(state.clone())
            }),
        )
        .build();

    let values = Rc::new(RefCell::new(Vec::new()));
    let errors = Rc::new(RefCell::new(Vec::new()));
    let (v, e) = (values.clone(), errors.clone());
    let _sub = store.select1("counter").subscribe(
        ObserverFn::new(move |x: &Value| v.borrow_mut().push(x.clone()))
            .on_error(move |err: &Error| e.borrow_mut().push(err.to_string())),
    );

    store.dispatch(Action::new("INC")).unwrap();
    store.dispatch(Action::new("FORBIDDEN")).unwrap();

    assert_eq!(*values.borrow(), vec![Value::Int(0), Value::Int(1)]);
    assert_eq!(errors.borrow().len(), 1);
    assert_eq!(store.lifecycle(), Lifecycle::Erred);
    assert!(matches!(
        store.dispatch(Action::new("INC")),
        Err(Error::Terminated(Lifecycle::Erred))
    ));
    // the last good state is kept
    assert_eq!(store.snapshot().property("counter"), Value::Int(1));
}

#[test]
fn completion_propagates_to_projections() {
    init_tracing();
    let store = Store::builder().reducer("counter", counter()).build();
    let completed = Rc::new(RefCell::new(false));
    let flag = completed.clone();
    let sub = store
        .select1("counter")
        .subscribe(ObserverFn::new(|_: &Value| {}).on_complete(move || *flag.borrow_mut() = true));

    store.signal_completion();

    assert!(*completed.borrow());
    assert!(sub.is_closed());
    assert_eq!(store.lifecycle(), Lifecycle::Completed);
    assert!(matches!(
        store.dispatch(Action::new("INC")),
        Err(Error::Terminated(Lifecycle::Completed))
    ));
    assert!(matches!(
        store.add_reducer("late", counter()),
        Err(Error::Terminated(Lifecycle::Completed))
    ));
}

#[test]
fn failure_propagates_to_projections() {
    init_tracing();
    let store = Store::builder().reducer("counter", counter()).build();
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();
    let _sub = store
        .select1("counter")
        .subscribe(ObserverFn::new(|_: &Value| {}).on_error(move |err: &Error| sink.borrow_mut().push(err.clone())));

    store.signal_failure(anyhow::anyhow!("connection lost"));

    assert!(matches!(errors.borrow()[0], Error::Upstream(_)));
    assert_eq!(store.lifecycle(), Lifecycle::Erred);
}

#[test]
fn late_subscribers_to_terminated_store() {
    init_tracing();
    let store = Store::builder().reducer("counter", counter()).build();
    store.signal_completion();

    let completed = Rc::new(RefCell::new(false));
    let flag = completed.clone();
    let sub = store
        .select1("counter")
        .subscribe(ObserverFn::new(|_: &Value| {}).on_complete(move || *flag.borrow_mut() = true));
    assert!(*completed.borrow());
    assert!(sub.is_closed());
}

#[test]
fn reselecting_matches_nested_select() {
    init_tracing();
    let store = Store::builder().reducer("a", setter()).build();
    let (chained, _a) = collect(&store.select1("a").select1("b"));
    let (nested, _b) = collect(&store.select2("a", "b"));

    store.dispatch(set(json!({"b": 1}))).unwrap();
    store.dispatch(set(json!({"b": 1, "c": 0}))).unwrap();
    store.dispatch(set(json!({"b": 2}))).unwrap();
    store.dispatch(set(json!("not a map"))).unwrap();

    assert_eq!(
        *nested.borrow(),
        vec![Value::Undefined, Value::Int(1), Value::Int(2), Value::Undefined]
    );
    assert_eq!(*chained.borrow(), *nested.borrow());
}

#[test]
fn function_selector_is_deterministic_over_replayed_snapshots() {
    init_tracing();
    let store = Store::builder().reducer("counter", counter()).reducer("a", setter()).build();
    let (snapshots, _sub) = collect(&store.state().as_observable());
    store.dispatch(Action::new("INC")).unwrap();
    store.dispatch(set(json!({"items": [1, 2]}))).unwrap();
    store.dispatch(Action::new("NOOP")).unwrap();
    store.dispatch(Action::new("INC")).unwrap();
    let snapshots = snapshots.borrow().clone();

    let replay = || {
        let (first, rest) = snapshots.split_first().unwrap();
        let source = BehaviorSubject::new(first.clone());
        let selector = select(
            SelectorArg::map(|s| {
                let count = s.property("counter").as_i64().unwrap_or(0);
                let items = s.property("a").property("items").as_list().map(|l| l.len()).unwrap_or(0);
                Value::from(format!("{count}/{items}"))
            }),
            &[],
        )
        .unwrap();
        let (values, _sub) = collect(&selector.project(&source.as_observable()));
        for snapshot in rest {
            source.next(snapshot.clone());
        }
        let values = values.borrow().clone();
        values
    };

    let first = replay();
    assert_eq!(first, replay());
    assert_eq!(
        first,
        vec![Value::from("0/0"), Value::from("1/0"), Value::from("1/2"), Value::from("2/2")]
    );
}

#[test]
fn signed_zeros_are_the_same_number() {
    init_tracing();
    let store = Store::builder().reducer("x", setter()).build();
    let (values, _sub) = collect(&store.select1("x"));
    for v in [0.5, 0.0, -0.0] {
        store.dispatch(Action::new("SET").with("value", v)).unwrap();
    }
    assert_eq!(
        *values.borrow(),
        vec![Value::Undefined, Value::Float(0.5), Value::Float(0.0)]
    );
}
