//! Marshalling tests against the recording heap

use super::*;
use crate::error::Error;
use crate::host::{Host, ObjectKind, RecordingHost};
use proptest::prelude::*;

fn host() -> RecordingHost {
    let host = RecordingHost::new();
    host.initialize().unwrap();
    host
}

mod scalar_tests {
    use super::*;

    #[test]
    fn test_numbers_keep_their_nature() {
        let host = host();
        let marshal = Marshaller::for_host(&host);
        assert_eq!(marshal.scalar(&3_i32).unwrap().kind(), ObjectKind::Int);
        assert_eq!(marshal.scalar(&3_u8).unwrap().kind(), ObjectKind::Int);
        assert_eq!(marshal.scalar(&3.0_f32).unwrap().kind(), ObjectKind::Float);
        assert_eq!(marshal.scalar("three").unwrap().kind(), ObjectKind::Str);
        assert_eq!(host.live_objects(), 0);
    }

    #[test]
    fn test_wide_integers_are_checked() {
        let host = host();
        let marshal = Marshaller::for_host(&host);
        assert_eq!(marshal.scalar(&42_u64).unwrap().borrow().extract::<i64>().unwrap(), 42);
        assert_eq!(
            marshal.scalar(&u64::MAX).unwrap_err(),
            Error::IntegerOverflow {
                value: u64::MAX.to_string()
            }
        );
    }

    #[test]
    fn test_bool_promotes_singleton() {
        let host = host();
        let marshal = Marshaller::for_host(&host);
        let before = host.refcount(host.boolean(true));
        let value = marshal.scalar(&true).unwrap();
        assert_eq!(value.raw(), host.boolean(true));
        assert_eq!(value.refcount(), before + 1);
        drop(value);
        assert_eq!(host.refcount(host.boolean(true)), before);
        assert!(host.violations().is_empty());
    }

    #[test]
    fn test_option_none_is_runtime_none() {
        let host = host();
        let value = Marshaller::for_host(&host).scalar(&None::<f64>).unwrap();
        assert!(value.borrow().is_none());
    }

    #[test]
    fn test_existing_objects_pass_through() {
        let host = host();
        let marshal = Marshaller::for_host(&host);
        let label = marshal.scalar("label").unwrap();
        let list = marshal.sequence(&[label.borrow()]).unwrap();
        assert_eq!(label.refcount(), 2);
        drop(list);
        assert_eq!(label.refcount(), 1);
    }
}

mod container_tests {
    use super::*;

    #[test]
    fn test_nested_sequences() {
        let host = host();
        let rows = vec![vec![1, 2, 3], vec![4, 5, 6]];
        let grid = Marshaller::for_host(&host).sequence_of_sequences(&rows).unwrap();
        assert_eq!(grid.kind(), ObjectKind::List);
        assert_eq!(grid.borrow().extract::<Vec<Vec<i64>>>().unwrap(), vec![vec![1, 2, 3], vec![4, 5, 6]]);
        drop(grid);
        assert_eq!(host.live_objects(), 0);
    }

    #[test]
    fn test_pair_is_a_tuple() {
        let host = host();
        let pair = Marshaller::for_host(&host).scalar(&(0.5, "right")).unwrap();
        assert_eq!(pair.kind(), ObjectKind::Tuple);
        let (value, label): (f64, String) = pair.borrow().extract().unwrap();
        assert_eq!(value, 0.5);
        assert_eq!(label, "right");
    }

    #[test]
    fn test_failure_midway_releases_converted_items() {
        let host = host();
        let marshal = Marshaller::for_host(&host);
        // Two elements succeed, the third fails.
        host.limit_allocations(Some(2));
        let err = marshal.sequence(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidHandle { reason: Some(ref reason), .. } if reason.starts_with("MemoryError")));
        host.limit_allocations(None);
        assert_eq!(host.live_objects(), 0);

        // Every element succeeds, creating the list fails.
        host.limit_allocations(Some(3));
        assert!(marshal.sequence(&[1.0, 2.0, 3.0]).is_err());
        host.limit_allocations(None);
        assert_eq!(host.live_objects(), 0);
        assert!(host.violations().is_empty());
    }

    #[test]
    fn test_extract_type_mismatch() {
        let host = host();
        let text = Marshaller::for_host(&host).scalar("x").unwrap();
        assert_eq!(
            text.borrow().extract::<f64>().unwrap_err(),
            Error::TypeMismatch {
                expected: "float",
                found: ObjectKind::Str,
                reason: None,
            }
        );
    }
}

mod buffer_tests {
    use super::*;

    #[test]
    fn test_buffer_finalizes_in_push_order() {
        let host = host();
        let marshal = Marshaller::for_host(&host);
        let mut buffer = marshal.args();
        buffer.push(&[1.0, 2.0]).unwrap().push("r--").unwrap().push(&7_i64).unwrap();
        assert_eq!(buffer.len(), 3);

        let tuple = buffer.into_tuple().unwrap();
        assert_eq!(tuple.kind(), ObjectKind::Tuple);
        let view = tuple.borrow();
        assert_eq!(view.len().unwrap(), 3);
        assert_eq!(view.item(1).unwrap().borrow().extract::<String>().unwrap(), "r--");
        assert_eq!(view.item(2).unwrap().borrow().extract::<i64>().unwrap(), 7);
    }

    #[test]
    fn test_unconsumed_buffer_releases_items() {
        let host = host();
        let marshal = Marshaller::for_host(&host);
        {
            let mut buffer = marshal.args();
            buffer.push(&[1, 2, 3]).unwrap().push("label").unwrap();
            assert!(host.live_objects() > 0);
        }
        assert_eq!(host.live_objects(), 0);
        assert!(host.violations().is_empty());
    }

    #[test]
    fn test_push_borrowed_takes_a_reference() {
        let host = host();
        let marshal = Marshaller::for_host(&host);
        let axes = marshal.scalar("axes").unwrap();
        let mut buffer = marshal.args();
        buffer.push_borrowed(axes.borrow());
        assert_eq!(axes.refcount(), 2);
        let list = buffer.into_list().unwrap();
        assert_eq!(list.kind(), ObjectKind::List);
        drop(list);
        assert_eq!(axes.refcount(), 1);
    }

    #[test]
    fn test_empty_buffer_is_empty_tuple() {
        let host = host();
        let marshal = Marshaller::for_host(&host);
        let tuple = marshal.empty_tuple().unwrap();
        assert!(tuple.borrow().is_empty().unwrap());
        assert!(marshal.args().is_empty());
    }
}

mod keyword_tests {
    use super::*;

    const FILL_BETWEEN: CoercionTable = &[("alpha", Coercion::Float)];
    const ARROW: CoercionTable = &[
        ("width", Coercion::Float),
        ("length_includes_head", Coercion::Bool),
    ];

    #[test]
    fn test_unlisted_keys_stay_strings() {
        let host = host();
        let marshal = Marshaller::for_host(&host);
        let dict = marshal
            .keyword_map(&keywords([("color", "red"), ("alpha", "0.3")]), &[])
            .unwrap();
        assert_eq!(dict.kind(), ObjectKind::Dict);
        assert_eq!(dict.borrow().len().unwrap(), 2);
    }

    #[test]
    fn test_coercion_table_lookup() {
        assert_eq!(coercion_for(FILL_BETWEEN, "alpha"), Coercion::Float);
        assert_eq!(coercion_for(FILL_BETWEEN, "color"), Coercion::Str);
        assert_eq!(coercion_for(ARROW, "length_includes_head"), Coercion::Bool);
    }

    #[test]
    fn test_unparsable_float_is_typed_error() {
        let host = host();
        let err = Marshaller::for_host(&host)
            .keyword_map(&keywords([("alpha", "transparent")]), FILL_BETWEEN)
            .unwrap_err();
        assert_eq!(
            err,
            Error::KeywordCoercion {
                key: "alpha".to_string(),
                value: "transparent".to_string(),
                expected: Coercion::Float,
            }
        );
        assert_eq!(host.live_objects(), 0);
    }

    #[test]
    fn test_dict_builder_mixes_typed_values() {
        let host = host();
        let marshal = Marshaller::for_host(&host);
        let mut dict = marshal.dict().unwrap();
        dict.set("dpi", &100_i64)
            .unwrap()
            .set("figsize", &[6.0, 4.0])
            .unwrap()
            .extend(&keywords([("format", "png")]), &[])
            .unwrap();
        let dict = dict.finish();
        assert_eq!(dict.borrow().len().unwrap(), 3);
        drop(dict);
        assert_eq!(host.live_objects(), 0);
    }
}

proptest! {
    #[test]
    fn prop_float_vectors_round_trip(values in prop::collection::vec(-1e12f64..1e12, 0..64)) {
        let host = host();
        let list = Marshaller::for_host(&host).sequence(&values).unwrap();
        prop_assert_eq!(list.borrow().extract::<Vec<f64>>().unwrap(), values);
    }

    #[test]
    fn prop_integer_vectors_round_trip(values in prop::collection::vec(any::<i64>(), 0..64)) {
        let host = host();
        let list = Marshaller::for_host(&host).sequence(&values).unwrap();
        prop_assert_eq!(list.borrow().extract::<Vec<i64>>().unwrap(), values);
    }

    #[test]
    fn prop_strings_round_trip(values in prop::collection::vec(".{0,12}", 0..16)) {
        let host = host();
        let list = Marshaller::for_host(&host).sequence(&values).unwrap();
        prop_assert_eq!(list.borrow().extract::<Vec<String>>().unwrap(), values);
        drop(list);
        prop_assert_eq!(host.live_objects(), 0);
    }

    #[test]
    fn prop_float_keywords_coerce(value in -1e6f64..1e6) {
        let host = host();
        let text = value.to_string();
        let mut dict = Marshaller::for_host(&host).dict().unwrap();
        dict.extend(&keywords([("alpha", text.as_str())]), &[("alpha", Coercion::Float)]).unwrap();
        prop_assert_eq!(dict.finish().borrow().len().unwrap(), 1);
    }
}
