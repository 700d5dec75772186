use proptest::prelude::*;
use vscp_codec::{build, parse, ParameterMap};

fn key_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z0-9_.]{0,11}"
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_.,:; -]{0,16}"
}

fn map_strategy() -> impl Strategy<Value = ParameterMap> {
    prop::collection::vec((key_strategy(), value_strategy()), 0..12)
        .prop_map(|pairs| pairs.into_iter().collect::<ParameterMap>())
}

proptest! {
    #[test]
    fn build_then_parse_is_identity(map in map_strategy()) {
        let wire = build(&map).unwrap();
        prop_assert!(wire.starts_with('?'));
        prop_assert_eq!(parse(&wire, true), map);
    }

    #[test]
    fn parse_never_panics(raw in "\\PC{0,64}") {
        let _ = parse(&raw, false);
    }
}

#[test]
fn init_request_serializes_in_protocol_order() {
    let params = ParameterMap::new()
        .with("type", "INIT")
        .with("app", "DemoApp")
        .with("db", "1.0")
        .with("api", "1.2");
    assert_eq!(
        build(&params).unwrap(),
        "?type=INIT&app=DemoApp&db=1.0&api=1.2"
    );
}
