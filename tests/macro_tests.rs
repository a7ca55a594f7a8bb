use valuestream::{subtype, value, Kind, ObjectMap, Value, ValueType};

#[test]
fn test_value_macro_null() {
    let v = value!(null);
    assert_eq!(v, Value::null());
    assert!(v.is_null());
}

#[test]
fn test_value_macro_booleans() {
    assert_eq!(value!(true).kind, Kind::Bool(true));
    assert_eq!(value!(false).kind, Kind::Bool(false));
}

#[test]
fn test_value_macro_numbers() {
    assert_eq!(value!(42).kind, Kind::Int(42));
    assert_eq!(value!(3.5).kind, Kind::Real(3.5));
    assert_eq!(value!(-123).kind, Kind::Int(-123));
    assert_eq!(value!(u64::MAX).kind, Kind::UInt(u64::MAX));

    // unsigned values that fit i64 are stored signed
    assert_eq!(value!(7u64).kind, Kind::Int(7));
}

#[test]
fn test_value_macro_strings() {
    assert_eq!(value!("hello world").as_str(), Some("hello world"));
    assert_eq!(value!("").value_type(), ValueType::Str);
    assert_eq!(value!("").subtype, subtype::NORMAL);
}

#[test]
fn test_value_macro_arrays() {
    let v = value!([1, "two", [3.0], null]);
    let items = v.as_array().unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(items[1], Value::from("two"));
    assert_eq!(items[2], Value::from(vec![Value::from(3.0)]));
    assert!(items[3].is_null());

    assert_eq!(value!([]), Value::array());
    assert_eq!(value!([1, 2,]), value!([1, 2]));
}

#[test]
fn test_value_macro_objects() {
    let v = value!({
        "name": "Alice",
        "age": 30,
        "address": {"city": "Oslo", "zip": "0150"}
    });
    let object = v.as_object().unwrap();
    let keys: Vec<_> = object.keys().filter_map(Value::as_str).collect();
    assert_eq!(keys, ["name", "age", "address"]);
    assert_eq!(v.get("age"), Some(&Value::from(30)));
    assert_eq!(
        v.get("address").and_then(|a| a.get("city")),
        Some(&Value::from("Oslo"))
    );

    assert_eq!(value!({}), Value::from(ObjectMap::new()));
}

#[test]
fn test_value_macro_expressions() {
    let count = 3;
    let tags = vec![Value::from("a"), Value::from("b")];
    let v = value!({
        "count": count,
        "tags": (Value::from(tags.clone())),
        "negative": (-count),
        "blob": (Value::blob(vec![1u8, 2]))
    });
    assert_eq!(v.get("count"), Some(&Value::from(3)));
    assert_eq!(v.get("tags"), Some(&Value::from(tags)));
    assert_eq!(v.get("negative").and_then(Value::as_i64), Some(-3));
    assert_eq!(v.get("blob").map(|b| b.subtype), Some(subtype::BLOB));
}

#[test]
fn test_value_macro_duplicate_keys_keep_last() {
    let v = value!({"a": 1, "b": 2, "a": 3});
    let object = v.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert_eq!(v.get("a"), Some(&Value::from(3)));
}
