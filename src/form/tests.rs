use super::*;
use futures::executor::block_on;
use serde::Serialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

fn values(value: FieldValue) -> FieldValues {
    match value {
        FieldValue::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn signup_form() -> FormController {
    FormController::new(FormOptions::with_fields([
        FieldDefinition::new("email")
            .label("Email")
            .required(true)
            .rules(Schema::string().required().email()),
        FieldDefinition::new("age")
            .label("Age")
            .field_type(FieldType::Number)
            .default_value(18)
            .rules(Schema::number().min(18)),
    ]))
    .expect("form should build")
}

fn counting_form(calls: Arc<AtomicUsize>) -> FormController {
    let options = FormOptions::with_fields([FieldDefinition::new("email")
        .label("Email")
        .rules(Schema::string().required())])
    .on_submit(move |_, _| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    });
    FormController::new(options).expect("form should build")
}

#[test]
fn invalid_on_submit_fields_block_the_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let form = counting_form(calls.clone());

    let submitted = block_on(form.submit_form()).expect("submit");
    assert!(!submitted);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let email = form.field_state("email").expect("state");
    assert_eq!(email.errors, [FieldError::from("Email is a required field")]);
    assert!(!form.form_state().expect("form state").valid);
    assert_eq!(form.submit_state().expect("submit state"), SubmitState::Failed);
    assert_eq!(form.submit_count().expect("count"), 1);
}

#[test]
fn valid_forms_run_the_handler_with_current_values() {
    let seen = Arc::new(Mutex::new(None));
    let captured = seen.clone();
    let options = FormOptions::with_fields([FieldDefinition::new("email")
        .rules(Schema::string().required())])
    .on_submit(move |values, _| {
        let captured = captured.clone();
        async move {
            *captured.lock().expect("lock") = Some(values);
            Ok(true)
        }
    });
    let form = FormController::new(options).expect("form");
    form.set_value("email", "user@example.com").expect("set");

    assert!(block_on(form.submit_form()).expect("submit"));
    assert_eq!(
        seen.lock().expect("lock").clone(),
        Some(values(json!({ "email": "user@example.com" })))
    );
    assert_eq!(form.submit_state().expect("state"), SubmitState::Succeeded);
}

#[test]
fn empty_required_email_yields_exactly_one_error() {
    let form = signup_form();
    form.set_value("email", "").expect("set");

    assert!(!block_on(form.submit_form()).expect("submit"));
    let email = form.field_state("email").expect("state");
    assert_eq!(email.errors.len(), 1);
    assert!(email.invalid);
    assert!(form.form_state().expect("form").invalid);
}

#[test]
fn untouched_defaults_are_pristine() {
    let form = signup_form();
    let age = form.field_state("age").expect("state");
    assert!(!age.dirty);
    assert!(age.pristine);
    assert_eq!(form.value("age").expect("value"), Some(json!(18)));
}

#[test]
fn writes_update_dirty_and_pristine() {
    let form = signup_form();
    form.set_value("age", 21).expect("set");
    let age = form.field_state("age").expect("state");
    assert!(age.dirty);
    assert!(!age.pristine);
    assert!(form.form_state().expect("form").dirty);

    form.set_value("age", 18).expect("set back");
    let age = form.field_state("age").expect("state");
    assert!(!age.dirty);
    assert!(!age.pristine);
}

#[test]
fn reset_restores_initial_values_and_states() {
    let form = signup_form();
    form.set_value("email", "bad").expect("set");
    form.set_value("age", 3).expect("set");
    form.on_blur("email").expect("blur");
    form.validate_all().expect("validate");
    form.add_global_error("server down").expect("global");

    form.reset().expect("reset");

    assert_eq!(
        form.current_values().expect("values"),
        form.initial_values().expect("initial")
    );
    for state in form.fields_states().expect("states").values() {
        assert_eq!(state, &FieldState::default());
    }
    let form_state = form.form_state().expect("form");
    assert_eq!(form_state, FormState::default());
    assert_eq!(form.submit_state().expect("state"), SubmitState::Idle);
}

#[test]
fn reset_values_are_independent_of_the_initial_copy() {
    let form = FormController::new(FormOptions::with_fields([
        FieldDefinition::new("tags").default_value(json!(["a"]))
    ]))
    .expect("form");
    form.set_value("tags.1", "b").expect("set");
    form.reset().expect("reset");
    form.set_value("tags.0", "z").expect("set");
    assert_eq!(
        form.initial_values().expect("initial"),
        values(json!({ "tags": ["a"] }))
    );
}

#[test]
fn out_of_range_array_writes_are_rejected() {
    let form = FormController::new(FormOptions::with_fields([
        FieldDefinition::new("tags").default_value(json!(["a", "b"]))
    ]))
    .expect("form");
    assert_eq!(
        form.set_value("tags.100", "x"),
        Err(FormError::InvalidPath("tags.100".to_string()))
    );
    assert_eq!(form.value("tags").expect("tags"), Some(json!(["a", "b"])));
    assert!(form.field_state("tags").expect("tags").pristine);
}

#[test]
fn repeated_validation_is_stable() {
    let form = signup_form();
    form.set_value("age", 12).expect("set");
    let first = form.validate_field("age", true).expect("validate");
    let errors = form.field_state("age").expect("state").errors;
    let second = form.validate_field("age", true).expect("validate");
    assert_eq!(first, Some(1));
    assert_eq!(first, second);
    assert_eq!(errors, form.field_state("age").expect("state").errors);
}

#[test]
fn fields_without_rules_report_no_count() {
    let form = FormController::new(FormOptions::with_fields(["note"])).expect("form");
    assert_eq!(form.validate_field("note", true).expect("validate"), None);
    assert!(form.validate_all().expect("validate all"));
}

#[test]
fn unknown_field_errors_become_global() {
    let form = signup_form();
    form.set_multi_fields_errors([("unknownField", ["bad"])])
        .expect("set errors");

    let form_state = form.form_state().expect("form");
    assert_eq!(form_state.global_errors, [FieldError::from("bad")]);
    assert_eq!(form_state.errors, [FieldError::from("bad")]);
    assert!(form_state.invalid);
    for state in form.fields_states().expect("states").values() {
        assert!(state.errors.is_empty());
    }
}

#[test]
fn multi_field_errors_reach_known_fields() {
    let form = signup_form();
    form.set_multi_fields_errors([
        ("email", vec!["taken"]),
        ("age", vec!["too young", "really"]),
    ])
    .expect("set errors");

    assert_eq!(
        form.form_state().expect("form").errors,
        ["taken", "too young", "really"].map(FieldError::from)
    );
    assert_eq!(
        form.field_state("age").expect("age").error,
        Some(FieldError::from("too young"))
    );

    form.clear_errors().expect("clear");
    assert!(form.form_state().expect("form").valid);
}

#[test]
fn setting_errors_on_unknown_fields_is_rejected() {
    let form = signup_form();
    assert_eq!(
        form.set_field_errors("missing", ["bad"]),
        Err(FormError::UnknownField("missing".to_string()))
    );
}

#[test]
fn dotted_fields_are_stored_as_nested_objects() {
    let form = FormController::new(FormOptions::with_fields(["address.city"])).expect("form");
    form.set_value("address.city", "Erbil").expect("set");

    let current = form.current_values().expect("values");
    assert_eq!(current, values(json!({ "address": { "city": "Erbil" } })));
    assert!(form.field_state("address.city").expect("state").dirty);
}

#[test]
fn parent_writes_reach_nested_field_watchers() {
    let form = FormController::new(FormOptions::with_fields(["address.city"])).expect("form");
    form.set_value("address", json!({ "city": "Duhok" }))
        .expect("set parent");
    assert!(form.field_state("address.city").expect("state").dirty);
}

#[test]
fn on_blur_validates_only_blur_fields() {
    let form = FormController::new(FormOptions::with_fields([
        FieldDefinition::new("name")
            .validation_mode(ValidationMode::OnBlur)
            .rules(Schema::string().required()),
        FieldDefinition::new("code").rules(Schema::string().required()),
    ]))
    .expect("form");

    form.on_blur("code").expect("blur code");
    assert!(form.field_state("code").expect("code").errors.is_empty());
    assert!(form.field_state("code").expect("code").touched);
    assert!(form.form_state().expect("form").touched);

    form.on_blur("name").expect("blur name");
    assert_eq!(form.field_state("name").expect("name").errors.len(), 1);
}

#[test]
fn value_update_fields_validate_on_every_write() {
    let form = FormController::new(FormOptions::with_fields([FieldDefinition::new("qty")
        .validation_mode(ValidationMode::OnValueUpdate)
        .rules(Schema::number().positive())]))
    .expect("form");

    form.set_value("qty", -2).expect("set");
    assert!(form.field_state("qty").expect("qty").invalid);
    form.set_value("qty", 2).expect("set");
    assert!(form.field_state("qty").expect("qty").valid);
}

#[test]
fn mount_validates_on_mount_fields() {
    let form = FormController::new(FormOptions::with_fields([
        FieldDefinition::new("title")
            .validation_mode(ValidationMode::OnMount)
            .rules(Schema::string().required()),
        FieldDefinition::new("body").rules(Schema::string().required()),
    ]))
    .expect("form");

    assert!(!form.mount().expect("mount"));
    assert_eq!(form.field_state("title").expect("title").errors.len(), 1);
    assert!(form.field_state("body").expect("body").errors.is_empty());
}

#[test]
fn external_watchers_stop_when_dropped() {
    let form = signup_form();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = form
        .watch("age", move |path, value| {
            sink.lock()
                .expect("lock")
                .push((path.to_string(), value.clone()));
        })
        .expect("watch");

    form.set_value("age", 30).expect("set");
    form.set_value("email", "a@b.co").expect("set");
    drop(subscription);
    form.set_value("age", 40).expect("set");

    assert_eq!(
        seen.lock().expect("lock").as_slice(),
        [("age".to_string(), json!(30))]
    );
}

#[test]
fn reset_notifies_watchers_of_changed_values() {
    let form = signup_form();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let _age = form
        .watch("age", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .expect("watch");

    form.reset().expect("reset unchanged");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    form.set_value("age", 19).expect("set");
    form.reset().expect("reset");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn dispose_releases_field_watchers_until_remount() {
    let form = signup_form();
    assert!(form.is_watching().expect("watching"));

    form.dispose().expect("dispose");
    assert!(!form.is_watching().expect("watching"));
    form.set_value("age", 50).expect("set");
    assert!(form.field_state("age").expect("age").pristine);

    form.mount().expect("mount");
    form.set_value("age", 51).expect("set");
    assert!(!form.field_state("age").expect("age").pristine);
}

#[test]
fn unwatched_forms_never_derive_field_state() {
    let options = FormOptions {
        watch_field_values: false,
        ..FormOptions::with_fields(["name"])
    };
    let form = FormController::new(options).expect("form");
    form.set_value("name", "x").expect("set");
    assert!(!form.is_watching().expect("watching"));
    assert!(!form.field_state("name").expect("name").dirty);
}

#[test]
fn submit_handlers_can_report_server_errors() {
    let options = FormOptions::with_fields(["email"]).on_submit(|_, context| async move {
        context.set_multi_fields_errors([("email", ["already registered"])])?;
        Ok(false)
    });
    let form = FormController::new(options).expect("form");

    assert!(!block_on(form.submit_form()).expect("submit"));
    assert_eq!(form.submit_state().expect("state"), SubmitState::Failed);
    assert_eq!(
        form.field_state("email").expect("email").error,
        Some(FieldError::from("already registered"))
    );
}

#[test]
fn global_errors_are_cleared_when_submitting_again() {
    let form = signup_form();
    form.set_value("email", "user@example.com").expect("set");
    form.add_global_error("stale").expect("global");

    assert!(block_on(form.submit_form()).expect("submit"));
    assert!(form.form_state().expect("form").global_errors.is_empty());
}

#[test]
fn submit_with_propagates_handler_errors() {
    let form = FormController::new(FormOptions::with_fields(["email"])).expect("form");

    let result = block_on(form.submit_with(|_, _| async {
        Err::<(), _>(FormError::SubmitFailed("timeout".to_string()))
    }));
    assert_eq!(result, Err(FormError::SubmitFailed("timeout".to_string())));
    assert_eq!(form.submit_state().expect("state"), SubmitState::Failed);

    let echoed = block_on(form.submit_with(|values, _| async move { Ok(values.len()) }))
        .expect("submit");
    assert_eq!(echoed, Some(1));
}

#[test]
fn first_error_only_can_be_disabled() {
    let options = FormOptions {
        first_error_only: false,
        ..FormOptions::with_fields([FieldDefinition::new("code")
            .rules(Schema::string().min_length(5).matches(regex::Regex::new("^[0-9]+$").expect("regex")))])
    };
    let form = FormController::new(options).expect("form");
    form.set_value("code", "ab").expect("set");
    assert_eq!(form.validate_field("code", true).expect("validate"), Some(2));
}

#[test]
fn closure_rules_receive_the_field_label() {
    let form = FormController::new(FormOptions::with_fields([FieldDefinition::new("pin")
        .label("PIN")
        .rules(rule_fn(|label, value| match value.as_str() {
            Some(pin) if pin.len() == 4 => Ok(()),
            _ => Err(vec![format!("{label} needs four digits")]),
        }))]))
    .expect("form");

    form.validate_all().expect("validate");
    assert_eq!(
        form.field_state("pin").expect("pin").errors,
        [FieldError::from("PIN needs four digits")]
    );
}

#[test]
fn duplicate_and_malformed_fields_are_rejected() {
    let duplicate = FormController::new(FormOptions::with_fields(["a", "a"]));
    assert_eq!(
        duplicate.err(),
        Some(FormError::DuplicateField("a".to_string()))
    );

    let malformed = FormController::new(FormOptions::with_fields(["a..b"]));
    assert!(matches!(malformed.err(), Some(FormError::InvalidPath(_))));
}

#[test]
fn initial_values_merge_over_defaults() {
    let options = FormOptions::with_fields([
        FieldDefinition::new("name").default_value("anon"),
        FieldDefinition::new("address.city").default_value("Baghdad"),
    ])
    .values(values(json!({ "address": { "city": "Basra", "zip": "61001" } })));
    let form = FormController::new(options).expect("form");

    assert_eq!(
        form.current_values().expect("values"),
        values(json!({ "name": "anon", "address": { "city": "Basra", "zip": "61001" } }))
    );
}

#[test]
fn metadata_accessors_follow_declarations() {
    let form = signup_form();
    assert_eq!(form.field_names(), ["email", "age"]);
    assert_eq!(form.fields_labels().get("age").map(String::as_str), Some("Age"));
    assert_eq!(form.required_fields_names().get("email"), Some(&true));
    assert_eq!(form.required_fields_names().get("age"), Some(&false));
    assert_eq!(form.field_type("age").expect("type"), FieldType::Number);
    assert_eq!(
        form.validation_mode("age").expect("mode"),
        ValidationMode::OnSubmit
    );
}

#[allow(dead_code)]
#[derive(Serialize, FormFields)]
struct Invoice {
    #[form(label = "Customer", required)]
    customer: String,
    amount: f64,
    paid: bool,
}

#[test]
fn derived_models_seed_fields_and_values() {
    let invoice = Invoice {
        customer: "Zainab".to_string(),
        amount: 25.0,
        paid: false,
    };
    let form = FormController::new(FormOptions::from_model(&invoice).expect("options"))
        .expect("form");

    assert_eq!(form.field_names(), ["customer", "amount", "paid"]);
    assert_eq!(form.field_type("paid").expect("type"), FieldType::Checkbox);
    assert!(form.is_required("customer").expect("required"));
    assert_eq!(form.value("customer").expect("value"), Some(json!("Zainab")));
}

#[test]
fn forms_are_independent_and_shareable_across_threads() {
    let first = signup_form();
    let second = signup_form();
    assert_ne!(first.form_id().expect("id"), second.form_id().expect("id"));

    let handle = first.clone();
    thread::spawn(move || handle.set_value("age", 44))
        .join()
        .expect("thread")
        .expect("set");
    assert_eq!(first.value("age").expect("value"), Some(json!(44)));
    assert_eq!(second.value("age").expect("value"), Some(json!(18)));
}
