//! Integration tests for validated methods

use std::time::Duration;

use moose_core::{
    record, Access, ClassBuilder, Instance, Method, MethodSpec, MooseError, MooseResult,
    PropertySpec, Signature, Type, TypeSpec, Value,
};

fn number_field(input: &Value, name: &str) -> MooseResult<f64> {
    let object = input
        .as_object()
        .ok_or_else(|| MooseError::custom("expected an input object"))?;
    Ok(object.get(name)?.as_f64().unwrap_or_default())
}

#[test]
fn test_basic_method() {
    let method = Method::wrap(
        MethodSpec::new("times_thirty", |_, input| {
            Ok(Value::from(number_field(&input, "num")? * 30.0))
        })
        .input(Signature::fields([(
            "num",
            PropertySpec::ro(Type::Number).required(),
        )]))
        .output(Type::Number),
    )
    .unwrap();

    let err = method.call(record! { "num" => "bad number" }).unwrap_err();
    assert_eq!(err.to_string(), "String cannot be converted to a number");

    let err = method.call(Value::Undefined).unwrap_err();
    assert_eq!(err.to_string(), "Property \"num\" of \"input\" required");

    let err = method.call(record! { "num" => 5, "foo" => "bar" }).unwrap_err();
    assert_eq!(err.to_string(), "Unknown parameter \"foo\" passed to \"input\"");

    assert_eq!(method.call(record! { "num" => 4 }).unwrap(), Value::Number(120.0));
}

#[test]
fn test_input_less_and_output_less() {
    let twenty_one = Method::wrap(
        MethodSpec::new("twenty_one", |_, _| Ok(Value::from("21"))).output(Type::Number),
    )
    .unwrap();
    assert_eq!(twenty_one.call(Value::Undefined).unwrap(), Value::Number(21.0));

    let nothing = Method::wrap(MethodSpec::new("nothing", |_, _| Ok(Value::Undefined))).unwrap();
    assert!(nothing.call(Value::Undefined).unwrap().is_undefined());
}

#[test]
fn test_output_is_validated() {
    let broken = Method::wrap(
        MethodSpec::new("broken", |_, _| Ok(Value::from("not a number"))).output(Type::Number),
    )
    .unwrap();
    let err = broken.call(Value::Undefined).unwrap_err();
    assert!(matches!(err, MooseError::InvalidNumber { .. }));
}

#[test]
fn test_output_fields_compile_to_output_class() {
    let split = Method::wrap(
        MethodSpec::new("split", |_, input| {
            let whole = input.as_f64().unwrap_or_default();
            Ok(record! { "int" => whole.trunc(), "frac" => whole.fract() }.into())
        })
        .input(Type::Number)
        .output(Signature::fields([
            ("int", PropertySpec::new().isa(Type::Number).required()),
            ("frac", PropertySpec::new().isa(Type::Number).required()),
        ])),
    )
    .unwrap();

    let result = split.call(2.5).unwrap();
    let result = result.as_object().unwrap();
    assert_eq!(result.class().name(), "output");
    assert_eq!(result.get("int").unwrap(), Value::Number(2.0));
    assert_eq!(result.get("frac").unwrap(), Value::Number(0.5));
    assert!(split.input_class().is_none());
    assert_eq!(split.output_type().unwrap().name(), "output");
}

#[test]
fn test_method_metadata() {
    let method = Method::wrap(
        MethodSpec::new("times_twenty_one", |_, input| {
            Ok(Value::from(number_field(&input, "num")? * 21.0))
        })
        .input(Signature::fields([(
            "num",
            PropertySpec::new().isa(Type::Number).required().default_value(1),
        )]))
        .output(Type::Number),
    )
    .unwrap();

    assert_eq!(method.call(record! { "num" => 10 }).unwrap(), Value::Number(210.0));
    assert_eq!(method.call(Value::Undefined).unwrap(), Value::Number(21.0));

    let input = method.input_class().unwrap();
    assert_eq!(input.property("num").unwrap().access(), Access::ReadOnly);
    assert!(!method.is_deferred());
}

#[test]
fn test_class_methods_use_receiver() {
    let get_grades_above = Method::wrap(
        MethodSpec::new("get_grades_above", |this: Option<&Instance>, threshold| {
            let this = this.ok_or_else(|| MooseError::custom("no receiver"))?;
            let threshold = threshold.as_f64().unwrap_or_default();
            let grades = this.get("grades")?;
            let above: Vec<Value> = grades
                .as_array()
                .map(|a| a.to_vec())
                .unwrap_or_default()
                .into_iter()
                .filter(|g| g.as_f64().map_or(false, |g| g >= threshold))
                .collect();
            Ok(Value::List(above))
        })
        .input(Type::Number)
        .output(TypeSpec::array_of(Type::Number)),
    )
    .unwrap();

    let student = ClassBuilder::new("Student")
        .final_class()
        .has("name", PropertySpec::ro(Type::String).required())
        .has(
            "grades",
            PropertySpec::rw(TypeSpec::array_of(Type::Number))
                .required()
                .default_with(|| Value::List(vec![])),
        )
        .method(get_grades_above)
        .build()
        .unwrap();

    assert!(student.new_instance(record! { "name" => "Testy" }).is_ok());

    let testy = student
        .new_instance(record! { "name" => "Testy McTesterson", "grades" => vec![1, 2, 3] })
        .unwrap();
    let above = testy.call("get_grades_above", 2).unwrap();
    assert_eq!(above.as_array().unwrap().len(), 2);
    assert_eq!(above.type_name(), "TypedArray<Number>");
}

#[test]
fn test_inherited_and_overridden_methods() {
    let speak = |word: &'static str| {
        Method::wrap(MethodSpec::new("speak", move |_, _| Ok(Value::from(word)))).unwrap()
    };
    let animal = ClassBuilder::new("Animal").method(speak("...")).build().unwrap();
    let dog = ClassBuilder::new("Dog").extends(&animal).method(speak("Woof")).build().unwrap();
    let puppy = ClassBuilder::new("Puppy").extends(&dog).build().unwrap();

    let a = animal.construct(Value::Undefined).unwrap();
    let p = puppy.construct(Value::Undefined).unwrap();
    assert_eq!(a.call("speak", Value::Undefined).unwrap(), Value::from("..."));
    assert_eq!(p.call("speak", Value::Undefined).unwrap(), Value::from("Woof"));
    assert_eq!(puppy.method_names(), vec!["speak"]);
}

#[tokio::test]
async fn test_deferred_method() {
    let method = Method::wrap(
        MethodSpec::deferred("later", |_, _| async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, MooseError>(Value::from("101"))
        })
        .output(Type::Number),
    )
    .unwrap();

    assert!(method.is_deferred());
    assert_eq!(method.call_async(Value::Undefined).await.unwrap(), Value::Number(101.0));

    let err = method.call(Value::Undefined).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Method \"later\" has a deferred body and must be awaited"
    );
}

#[tokio::test]
async fn test_deferred_class_method() {
    let deposit = Method::wrap(
        MethodSpec::deferred("deposit", |this: Option<Instance>, amount: Value| async move {
            let this = this.ok_or_else(|| MooseError::custom("no receiver"))?;
            tokio::task::yield_now().await;
            let balance = this.get("balance")?.as_f64().unwrap_or_default();
            this.set("balance", balance + amount.as_f64().unwrap_or_default())?;
            this.get("balance")
        })
        .input(Type::Number)
        .output(Type::Number),
    )
    .unwrap();

    let account = ClassBuilder::new("Account")
        .has("balance", PropertySpec::rw(Type::Number).default_value(0))
        .method(deposit)
        .build()
        .unwrap();

    let acc = account.construct(Value::Undefined).unwrap();
    let balance = acc.call_async("deposit", "25").await.unwrap();
    assert_eq!(balance, Value::Number(25.0));

    // Immediate bodies also work through the awaiting path
    let plain = Method::wrap(MethodSpec::new("plain", |_, v| Ok(v)).input(Type::String)).unwrap();
    assert_eq!(plain.call_async(7).await.unwrap(), Value::from("7"));
}
