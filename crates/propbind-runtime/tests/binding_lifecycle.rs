use std::cell::RefCell;
use std::rc::Rc;

use propbind_core::{BindingError, KeyPath, ObjectId};
use propbind_runtime::{BindingRegistry, ObservableObject};
use serde_json::{Value, json};

fn user(name: &str) -> Rc<ObservableObject> {
    ObservableObject::shared(json!({"profile": {"displayName": name}}))
}

#[test]
fn title_scenario() {
    let owner = ObservableObject::shared(json!({"title": null}));
    let user_model = user("Ada");
    let registry = BindingRegistry::new(&owner);

    registry
        .bind("title", &user_model, "profile.displayName")
        .unwrap();
    assert_eq!(owner.get("title"), Some(json!("Ada")));

    user_model.set("profile.displayName", "Grace").unwrap();
    assert_eq!(owner.get("title"), Some(json!("Grace")));

    registry.unbind("title");
    user_model.set("profile.displayName", "Ada").unwrap();
    assert_eq!(owner.get("title"), Some(json!("Grace")));
}

#[test]
fn every_change_is_applied_in_order() {
    let owner = ObservableObject::shared(json!({}));
    let counter = ObservableObject::shared(json!({"n": 0}));
    let registry = BindingRegistry::new(&owner);
    registry.bind("count", &counter, "n").unwrap();

    let history = Rc::new(RefCell::new(Vec::new()));
    let h = Rc::clone(&history);
    let owner_view = Rc::clone(&owner);
    let _spy = {
        use propbind_core::KeyValueObserving;
        owner.add_observer(
            &KeyPath::parse("count").unwrap(),
            Rc::new(move |v: &Value| {
                // The owner already holds the delivered value when observers run.
                assert_eq!(owner_view.get("count").as_ref(), Some(v));
                h.borrow_mut().push(v.clone());
            }),
        )
    };

    for n in 1..=5 {
        counter.set("n", n).unwrap();
        assert_eq!(owner.get("count"), Some(json!(n)));
    }
    assert_eq!(
        *history.borrow(),
        (1..=5).map(|n| json!(n)).collect::<Vec<_>>()
    );
}

#[test]
fn rebind_removes_old_observation() {
    let owner = ObservableObject::shared(json!({}));
    let first = user("Ada");
    let second = ObservableObject::shared(json!({"name": "Linus"}));
    let registry = BindingRegistry::new(&owner);

    registry.bind("title", &first, "profile.displayName").unwrap();
    registry.bind("title", &second, "name").unwrap();
    assert_eq!(owner.get("title"), Some(json!("Linus")));
    assert_eq!(first.observer_count(), 0);
    assert_eq!(second.observer_count(), 1);
    assert_eq!(registry.binding_count(), 1);

    first.set("profile.displayName", "Grace").unwrap();
    assert_eq!(owner.get("title"), Some(json!("Linus")));

    second.set("name", "Ken").unwrap();
    assert_eq!(owner.get("title"), Some(json!("Ken")));
}

#[test]
fn rebind_same_target_new_path() {
    let owner = ObservableObject::shared(json!({}));
    let target = ObservableObject::shared(json!({"a": 1, "b": 2}));
    let registry = BindingRegistry::new(&owner);

    registry.bind("value", &target, "a").unwrap();
    let old_token = registry.binding("value").unwrap().token;
    registry.bind("value", &target, "b").unwrap();
    let new_token = registry.binding("value").unwrap().token;
    assert_ne!(old_token, new_token);
    assert_eq!(target.observer_count(), 1);

    target.set("a", 10).unwrap();
    assert_eq!(owner.get("value"), Some(json!(2)));
    target.set("b", 20).unwrap();
    assert_eq!(owner.get("value"), Some(json!(20)));
}

#[test]
fn two_names_same_source_update_in_sequence() {
    let owner = ObservableObject::shared(json!({}));
    let target = user("Ada");
    let registry = BindingRegistry::new(&owner);
    registry.bind("title", &target, "profile.displayName").unwrap();
    registry.bind("subtitle", &target, "profile.displayName").unwrap();

    let order = Rc::new(RefCell::new(Vec::new()));
    for name in ["title", "subtitle"] {
        let order = Rc::clone(&order);
        use propbind_core::KeyValueObserving;
        owner.add_observer(
            &KeyPath::parse(name).unwrap(),
            Rc::new(move |v: &Value| order.borrow_mut().push((name, v.clone()))),
        );
    }

    target.set("profile.displayName", "Grace").unwrap();
    assert_eq!(owner.get("title"), Some(json!("Grace")));
    assert_eq!(owner.get("subtitle"), Some(json!("Grace")));
    assert_eq!(
        *order.borrow(),
        vec![("title", json!("Grace")), ("subtitle", json!("Grace"))]
    );
}

#[test]
fn unbind_one_of_two_shared_names() {
    let owner = ObservableObject::shared(json!({}));
    let target = user("Ada");
    let registry = BindingRegistry::new(&owner);
    registry.bind("title", &target, "profile.displayName").unwrap();
    registry.bind("subtitle", &target, "profile.displayName").unwrap();

    registry.unbind("title");
    target.set("profile.displayName", "Grace").unwrap();
    assert_eq!(owner.get("title"), Some(json!("Ada")));
    assert_eq!(owner.get("subtitle"), Some(json!("Grace")));
}

#[test]
fn unbind_during_delivery_suppresses_pending_write() {
    let owner = ObservableObject::shared(json!({}));
    let target = user("Ada");
    let registry = Rc::new(BindingRegistry::new(&owner));
    registry.bind("first", &target, "profile.displayName").unwrap();
    registry.bind("second", &target, "profile.displayName").unwrap();

    // Writing `first` into the owner unbinds `second` while its
    // notification is already scheduled on the target.
    let weak_registry = Rc::downgrade(&registry);
    {
        use propbind_core::KeyValueObserving;
        owner.add_observer(
            &KeyPath::parse("first").unwrap(),
            Rc::new(move |_: &Value| {
                if let Some(registry) = weak_registry.upgrade() {
                    registry.unbind("second");
                }
            }),
        );
    }

    target.set("profile.displayName", "Grace").unwrap();
    assert_eq!(owner.get("first"), Some(json!("Grace")));
    assert_eq!(owner.get("second"), Some(json!("Ada")));
    assert_eq!(registry.failure_count(), 0);
}

#[test]
fn dropping_registry_unsubscribes_everything() {
    let owner = ObservableObject::shared(json!({}));
    let a = user("Ada");
    let b = user("Grace");
    {
        let registry = BindingRegistry::new(&owner);
        registry.bind("a", &a, "profile.displayName").unwrap();
        registry.bind("b", &b, "profile.displayName").unwrap();
        assert_eq!(a.observer_count() + b.observer_count(), 2);
    }
    assert_eq!(a.observer_count(), 0);
    assert_eq!(b.observer_count(), 0);

    a.set("profile.displayName", "Zed").unwrap();
    assert_eq!(owner.get("a"), Some(json!("Ada")));
}

#[test]
fn unbind_all_reports_count() {
    let owner = ObservableObject::shared(json!({}));
    let target = user("Ada");
    let registry = BindingRegistry::new(&owner);
    registry.bind("a", &target, "profile").unwrap();
    registry.bind("b", &target, "profile.displayName").unwrap();
    assert_eq!(registry.bound_names(), ["a", "b"]);

    assert_eq!(registry.unbind_all(), 2);
    assert_eq!(registry.unbind_all(), 0);
    assert!(registry.is_empty());
    assert_eq!(registry.active_observations(), 0);
    assert_eq!(target.observer_count(), 0);
}

#[test]
fn released_target_turns_into_noop() {
    let owner = ObservableObject::shared(json!({}));
    let registry = BindingRegistry::new(&owner);
    let target = user("Ada");
    let id = ObjectId::of(&target);
    registry.bind("title", &target, "profile.displayName").unwrap();
    drop(target);

    assert!(!registry.binding("title").unwrap().target_alive);
    registry.evaluate(&KeyPath::parse("profile.displayName").unwrap(), id, &json!("late"));
    assert_eq!(owner.get("title"), Some(json!("Ada")));

    registry.unbind("title");
    assert!(!registry.is_bound("title"));
    assert_eq!(registry.failure_count(), 0);
}

#[test]
fn registry_does_not_keep_target_alive() {
    let owner = ObservableObject::shared(json!({}));
    let registry = BindingRegistry::new(&owner);
    let target = user("Ada");
    let weak = Rc::downgrade(&target);
    registry.bind("title", &target, "profile.displayName").unwrap();
    drop(target);
    assert!(weak.upgrade().is_none());
}

#[test]
fn registry_does_not_keep_owner_alive() {
    let owner = ObservableObject::shared(json!({}));
    let weak_owner = Rc::downgrade(&owner);
    let registry = BindingRegistry::new(&owner);
    let target = user("Ada");
    registry.bind("title", &target, "profile.displayName").unwrap();
    drop(owner);
    assert!(weak_owner.upgrade().is_none());

    let failures = Rc::new(RefCell::new(Vec::new()));
    let f = Rc::clone(&failures);
    registry.on_failure(move |err| f.borrow_mut().push(err.clone()));
    target.set("profile.displayName", "Grace").unwrap();
    assert_eq!(*failures.borrow(), vec![BindingError::OwnerReleased]);
}

#[test]
fn chained_bindings_propagate() {
    let model = user("Ada");
    let view_model = ObservableObject::shared(json!({}));
    let view = ObservableObject::shared(json!({}));

    let vm_bindings = BindingRegistry::new(&view_model);
    vm_bindings
        .bind("displayName", &model, "profile.displayName")
        .unwrap();
    let view_bindings = BindingRegistry::new(&view);
    view_bindings
        .bind("label.text", &view_model, "displayName")
        .unwrap();
    assert_eq!(view.get("label.text"), Some(json!("Ada")));

    model.set("profile.displayName", "Grace").unwrap();
    assert_eq!(view.get("label.text"), Some(json!("Grace")));
}

#[test]
fn parent_replacement_reaches_nested_binding() {
    let owner = ObservableObject::shared(json!({}));
    let target = user("Ada");
    let registry = BindingRegistry::new(&owner);
    registry.bind("title", &target, "profile.displayName").unwrap();

    target
        .set("profile", json!({"displayName": "Grace", "age": 36}))
        .unwrap();
    assert_eq!(owner.get("title"), Some(json!("Grace")));

    target.set("profile", Value::Null).unwrap();
    assert_eq!(owner.get("title"), Some(Value::Null));
}

#[test]
fn notification_write_failure_uses_failure_channel() {
    let owner = ObservableObject::shared(json!({"slot": {}}));
    let target = ObservableObject::shared(json!({"v": 1}));
    let registry = BindingRegistry::new(&owner);
    registry.bind("slot.value", &target, "v").unwrap();

    let failures = Rc::new(RefCell::new(Vec::new()));
    let f = Rc::clone(&failures);
    registry.on_failure(move |err| f.borrow_mut().push(err.to_string()));

    // Break the owner's shape so the next write cannot land.
    owner.set("slot", "scalar").unwrap();
    target.set("v", 2).unwrap();

    assert_eq!(registry.failure_count(), 1);
    assert_eq!(failures.borrow().len(), 1);
    assert!(failures.borrow()[0].contains("slot.value"));
    assert!(registry.is_bound("slot.value"));
}

#[test]
fn rejected_rebind_leaves_old_binding_live() {
    let owner = ObservableObject::shared(json!({"slot": {}}));
    let a = ObservableObject::shared(json!({"v": 1}));
    let b = ObservableObject::shared(json!({"w": 2}));
    let registry = BindingRegistry::new(&owner);
    registry.bind("slot.value", &a, "v").unwrap();

    owner.set("slot", "scalar").unwrap();
    let err = registry.bind("slot.value", &b, "w").unwrap_err();
    assert!(matches!(err, BindingError::WriteFailed { .. }));
    assert!(registry.is_bound("slot.value"));
    assert_eq!(a.observer_count(), 1);
    assert_eq!(b.observer_count(), 0);

    owner.set("slot", json!({})).unwrap();
    a.set("v", 3).unwrap();
    assert_eq!(owner.get("slot.value"), Some(json!(3)));
}
