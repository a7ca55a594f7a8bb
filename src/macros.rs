/// Builds a [`Value`](crate::Value) from a JSON-like literal.
///
/// ```rust
/// use valuestream::{value, Value};
///
/// let v = value!({"a": 1, "b": [true, null]});
/// assert_eq!(v.get("a"), Some(&Value::from(1)));
/// ```
#[macro_export]
macro_rules! value {
    (null) => {
        $crate::Value::null()
    };

    (true) => {
        $crate::Value::from(true)
    };

    (false) => {
        $crate::Value::from(false)
    };

    ([]) => {
        $crate::Value::array()
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::from(vec![$($crate::value!($elem)),*])
    };

    ({}) => {
        $crate::Value::object()
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let mut object = $crate::ObjectMap::new();
        $(
            object.insert($crate::Value::from($key), $crate::value!($value));
        )*
        $crate::Value::from(object)
    }};

    // Anything with a `From` conversion: numbers, strings, variables
    ($e:expr) => {
        $crate::Value::from($e)
    };
}

#[cfg(test)]
mod tests {
    use crate::{Kind, ObjectMap, Value};

    #[test]
    fn test_value_macro_primitives() {
        assert_eq!(value!(null), Value::null());
        assert_eq!(value!(true), Value::from(true));
        assert_eq!(value!(false), Value::from(false));
        assert_eq!(value!(42), Value::new(Kind::Int(42)));
        assert_eq!(value!(3.5), Value::new(Kind::Real(3.5)));
        assert_eq!(value!("hello"), Value::from("hello"));
    }

    #[test]
    fn test_value_macro_arrays() {
        assert_eq!(value!([]), Value::array());

        let arr = value!([1, 2, 3]);
        let items = arr.as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2], Value::from(3));
    }

    #[test]
    fn test_value_macro_objects() {
        assert_eq!(value!({}), Value::from(ObjectMap::new()));

        let obj = value!({
            "name": "Alice",
            "tags": ["a", "b"],
            "age": 30
        });
        let map = obj.as_object().unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get_str("name"), Some(&Value::from("Alice")));
        assert_eq!(map.get_str("tags").and_then(Value::as_array).map(Vec::len), Some(2));
    }
}
