//! Integration tests for triggers and rollback

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Timelike;

use moose_core::{record, Class, ClassBuilder, Instance, MooseError, MooseResult, PropertySpec, Type, Value};

fn check_times(appointment: &Instance, _: &Value, _: &Value, _: &str) -> MooseResult<()> {
    let start = appointment.get("start")?;
    let end = appointment.get("end")?;
    if let (Some(start), Some(end)) = (start.as_date(), end.as_date()) {
        if start >= end {
            return Err(MooseError::custom(format!(
                "Start time is greater than end time for appointment {}",
                appointment.get("name")?
            )));
        }
    }
    Ok(())
}

fn appointment() -> Class {
    ClassBuilder::new("Appointment")
        .final_class()
        .has("name", PropertySpec::rw(Type::String))
        .has("start", PropertySpec::rw(Type::Date).required().trigger(check_times))
        .has("end", PropertySpec::rw(Type::Date).required().trigger(check_times))
        .build()
        .unwrap()
}

#[test]
fn test_failed_trigger_restores_value() {
    let dentist = appointment()
        .new_instance(record! {
            "name" => "Dentist",
            "start" => "2018-09-09 12:00:00",
            "end" => "2018-09-09 13:00:00",
        })
        .unwrap();

    let err = dentist.set("start", "2018-09-09 14:00:00").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Start time is greater than end time for appointment Dentist"
    );

    let start = dentist.get("start").unwrap().as_date().unwrap();
    assert_eq!(start.hour(), 12);
}

#[test]
fn test_trigger_failure_aborts_construction() {
    let err = appointment()
        .new_instance(record! {
            "name" => "Backwards",
            "start" => "2018-09-09 14:00:00",
            "end" => "2018-09-09 13:00:00",
        })
        .unwrap_err();
    assert!(matches!(err, MooseError::Custom(_)));
}

#[test]
fn test_successful_write_keeps_new_value() {
    let dentist = appointment()
        .new_instance(record! {
            "start" => "2018-09-09 12:00:00",
            "end" => "2018-09-09 13:00:00",
        })
        .unwrap();

    dentist.set("end", "2018-09-09 15:30:00").unwrap();
    assert_eq!(dentist.get("end").unwrap().as_date().unwrap().hour(), 15);
}

#[test]
fn test_failed_delete_restores_value() {
    let guarded = ClassBuilder::new("Guarded")
        .has(
            "note",
            PropertySpec::rw(Type::String).trigger(|_, new, _, _| {
                if new.is_absent() {
                    Err(MooseError::custom("note cannot be cleared"))
                } else {
                    Ok(())
                }
            }),
        )
        .build()
        .unwrap();

    let g = guarded.new_instance(record! { "note" => "keep me" }).unwrap();
    let err = g.delete("note").unwrap_err();
    assert_eq!(err.to_string(), "note cannot be cleared");
    assert_eq!(g.get("note").unwrap(), Value::from("keep me"));
}

#[test]
fn test_trigger_receives_old_value_and_name() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let log = seen.clone();
    let counter = ClassBuilder::new("Counter")
        .has(
            "count",
            PropertySpec::rw(Type::Number)
                .default_value(0)
                .trigger(move |_, new, old, name| {
                    log.lock().push((name.to_string(), new.clone(), old.clone()));
                    Ok(())
                }),
        )
        .build()
        .unwrap();

    let c = counter.construct(Value::Undefined).unwrap();
    c.set("count", 5).unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], ("count".to_string(), Value::Number(0.0), Value::Undefined));
    assert_eq!(seen[1], ("count".to_string(), Value::Number(5.0), Value::Number(0.0)));
}

#[test]
fn test_trigger_may_read_owner() {
    let reads = Arc::new(AtomicUsize::new(0));
    let counter = reads.clone();
    let class = ClassBuilder::new("Reader")
        .has(
            "value",
            PropertySpec::rw(Type::Number).trigger(move |owner, new, _, name| {
                assert_eq!(&owner.get(name)?, new);
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .build()
        .unwrap();

    let r = class.new_instance(record! { "value" => 1 }).unwrap();
    r.set("value", 2).unwrap();
    assert_eq!(reads.load(Ordering::SeqCst), 2);
}

#[test]
fn test_checks_run_before_storage() {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    let class = ClassBuilder::new("Strict")
        .has(
            "n",
            PropertySpec::rw(Type::Number)
                .required()
                .default_value(1)
                .trigger(move |_, _, _, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
        )
        .build()
        .unwrap();

    let s = class.construct(Value::Undefined).unwrap();
    assert!(s.set("n", "not a number").is_err());
    assert!(s.set("n", Value::Null).is_err());
    assert_eq!(s.get("n").unwrap(), Value::Number(1.0));
    // Only the construction-time trigger fired
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}
