use manet_abstract::{FaultEvent, RadioAction, RECOVERY_OFFSET};

/// Build the two-event fault timeline: radio down at `fail_time`, radio up
/// five time units later. The toggle is a reversible capability switch, so
/// the node resumes full connectivity after the second event.
pub fn fault_timeline(fail_time: f64, fail_node: u32) -> [FaultEvent; 2] {
    [
        FaultEvent {
            time: fail_time,
            node: fail_node,
            action: RadioAction::Down,
        },
        FaultEvent {
            time: fail_time + RECOVERY_OFFSET,
            node: fail_node,
            action: RadioAction::Up,
        },
    ]
}
