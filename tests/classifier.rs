use pulsewatch::classifier::{is_important, is_important_for_notify};
use pulsewatch::Status::*;

#[test]
fn first_beat_is_always_important() {
    assert!(is_important(true, None, Up));
    assert!(is_important(true, None, Down));
    assert!(is_important_for_notify(true, None, Down));
}

#[test]
fn up_down_flip_is_important_for_notify() {
    assert!(is_important_for_notify(false, Some(Up), Down));
    assert!(is_important_for_notify(false, Some(Down), Up));
}

#[test]
fn pending_to_down_is_important_for_notify() {
    assert!(is_important_for_notify(false, Some(Pending), Down));
}

#[test]
fn maintenance_entry_is_important_but_not_notified() {
    assert!(is_important(false, Some(Up), Maintenance));
    assert!(!is_important_for_notify(false, Some(Up), Maintenance));
    assert!(is_important(false, Some(Down), Maintenance));
    assert!(!is_important_for_notify(false, Some(Down), Maintenance));
}

#[test]
fn maintenance_to_up_is_important_but_not_notified() {
    assert!(is_important(false, Some(Maintenance), Up));
    assert!(!is_important_for_notify(false, Some(Maintenance), Up));
}

#[test]
fn maintenance_to_down_is_important_and_notified() {
    assert!(is_important(false, Some(Maintenance), Down));
    assert!(is_important_for_notify(false, Some(Maintenance), Down));
}

#[test]
fn steady_state_is_not_important() {
    assert!(!is_important(false, Some(Up), Up));
    assert!(!is_important(false, Some(Down), Down));
    assert!(!is_important(false, Some(Pending), Pending));
    assert!(!is_important_for_notify(false, Some(Up), Up));
}

#[test]
fn down_to_pending_is_neither() {
    assert!(!is_important(false, Some(Down), Pending));
    assert!(!is_important_for_notify(false, Some(Down), Pending));
}

#[test]
fn important_for_notify_implies_important() {
    let all = [Up, Down, Pending, Maintenance];
    for prev in all {
        for curr in all {
            if is_important_for_notify(false, Some(prev), curr) {
                assert!(
                    is_important(false, Some(prev), curr),
                    "{prev:?} -> {curr:?} is important_for_notify but not important"
                );
            }
        }
    }
}

