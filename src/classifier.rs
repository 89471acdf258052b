//! Transition Classifier (§4.3) — pure predicates over `(prev, curr)` status
//! pairs. No I/O, no state; this module exists so the importance rules can be
//! unit-tested independently of the runtime and the notification fan-out.

use crate::model::Status;

/// `important(first, prev, curr)` — §4.3.
pub fn is_important(first: bool, prev: Option<Status>, curr: Status) -> bool {
    if first {
        return true;
    }
    let Some(prev) = prev else { return true };
    use Status::*;
    matches!(
        (prev, curr),
        (Up, Down)
            | (Down, Up)
            | (Pending, Down)
            | (Up, Maintenance)
            | (Down, Maintenance)
            | (Maintenance, Up)
            | (Maintenance, Down)
    )
}

/// `important_for_notify(first, prev, curr)` — §4.3.
pub fn is_important_for_notify(first: bool, prev: Option<Status>, curr: Status) -> bool {
    if first {
        return true;
    }
    let Some(prev) = prev else { return true };
    use Status::*;
    matches!(
        (prev, curr),
        (Up, Down) | (Down, Up) | (Pending, Down) | (Maintenance, Down)
    )
}
