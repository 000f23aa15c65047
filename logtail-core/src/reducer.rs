use crate::host::{Host, HostStatus};
use crate::state::HealthBoard;

#[derive(Clone, Debug)]
pub enum RuntimeEvent {
    /// The set of polled hosts changed
    HostsLoaded {
        hosts: Vec<Host>,
    },
    /// One probe result
    HealthChanged {
        host: String,
        status: HostStatus,
        cycle: u64,
    },
}

#[derive(Clone, Debug)]
pub struct EventEnvelope {
    pub id: u64,
    pub event: RuntimeEvent,
}

pub fn reduce(board: &mut HealthBoard, env: &EventEnvelope) {
    match &env.event {
        RuntimeEvent::HostsLoaded { hosts } => {
            board.statuses.retain(|name, _| hosts.iter().any(|h| &h.name == name));
            for host in hosts {
                board.statuses.entry(host.name.clone()).or_default();
            }
        }
        RuntimeEvent::HealthChanged {
            host,
            status,
            cycle,
        } => {
            board.statuses.insert(host.clone(), *status);
            board.last_cycle = board.last_cycle.max(*cycle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(id: u64, event: RuntimeEvent) -> EventEnvelope {
        EventEnvelope { id, event }
    }

    #[test]
    fn test_last_probe_wins() {
        let mut board = HealthBoard::default();
        reduce(
            &mut board,
            &envelope(1, RuntimeEvent::HealthChanged {
                host: "a".into(),
                status: HostStatus::Online,
                cycle: 1,
            }),
        );
        reduce(
            &mut board,
            &envelope(2, RuntimeEvent::HealthChanged {
                host: "a".into(),
                status: HostStatus::Offline,
                cycle: 2,
            }),
        );
        assert_eq!(board.status("a"), HostStatus::Offline);
        assert_eq!(board.last_cycle, 2);
    }

    #[test]
    fn test_hosts_loaded_resets_membership() {
        let mut board = HealthBoard::new(&[Host::new("old", "http://old")]);
        board.statuses.insert("old".into(), HostStatus::Online);
        reduce(
            &mut board,
            &envelope(1, RuntimeEvent::HostsLoaded {
                hosts: vec![Host::new("new", "http://new")],
            }),
        );
        assert!(!board.statuses.contains_key("old"));
        assert_eq!(board.status("new"), HostStatus::Offline);
    }
}
