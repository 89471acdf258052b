use pulsewatch::model::AcceptedStatusSpec;

#[test]
fn exact_code_matches_only_itself() {
    let spec = AcceptedStatusSpec::parse(["200"]).unwrap();
    assert!(spec.matches(200));
    assert!(!spec.matches(201));
    assert!(!spec.matches(200 + 100));
}

#[test]
fn class_matches_whole_hundred_block() {
    let spec = AcceptedStatusSpec::parse(["2xx"]).unwrap();
    assert!(spec.matches(200));
    assert!(spec.matches(204));
    assert!(spec.matches(299));
    assert!(!spec.matches(300));
    assert!(!spec.matches(199));
}

#[test]
fn range_is_inclusive_on_both_ends() {
    let spec = AcceptedStatusSpec::parse(["200-204"]).unwrap();
    assert!(spec.matches(200));
    assert!(spec.matches(202));
    assert!(spec.matches(204));
    assert!(!spec.matches(205));
    assert!(!spec.matches(199));
}

#[test]
fn multiple_rules_are_unioned() {
    let spec = AcceptedStatusSpec::parse(["200", "3xx", "500-502"]).unwrap();
    assert!(spec.matches(200));
    assert!(spec.matches(301));
    assert!(spec.matches(399));
    assert!(spec.matches(501));
    assert!(!spec.matches(404));
    assert!(!spec.matches(503));
}

#[test]
fn empty_spec_matches_nothing() {
    let spec = AcceptedStatusSpec::default();
    assert!(!spec.matches(200));
}

#[test]
fn rejects_malformed_entries() {
    assert!(AcceptedStatusSpec::parse(["abc"]).is_err());
    assert!(AcceptedStatusSpec::parse(["2yy"]).is_err());
    assert!(AcceptedStatusSpec::parse(["200-"]).is_err());
}
