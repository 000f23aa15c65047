use std::io;
use std::time::Duration;

use logtail_core::host::{Host, HostStatus};
use logtail_core::reducer::RuntimeEvent;

use crate::health::HealthMonitor;

fn status_line(host: &Host, status: HostStatus) -> String {
    let (icon, color) = match status {
        HostStatus::Online => ("✓", "\x1b[32m"),
        HostStatus::Offline => ("✗", "\x1b[31m"),
    };
    let reset = "\x1b[0m";
    format!(
        "{}{}{} {:<24} {:<40} {}",
        color,
        icon,
        reset,
        host.name,
        host.url,
        status.label()
    )
}

/// Watch output is in completion order, which can interleave cycles
fn watch_line(cycle: u64, host: &Host, status: HostStatus) -> String {
    format!("  #{:<4} {}", cycle, status_line(host, status))
}

/// Probe every host once, or keep probing with `watch`
pub async fn run_hosts(
    mut monitor: HealthMonitor,
    hosts: Vec<Host>,
    watch: bool,
    interval: Duration,
) -> io::Result<()> {
    println!("Hosts\n");

    if !watch {
        let mut results = monitor.poll(&hosts).await;
        // keep configured order, not completion order
        results.sort_by_key(|(host, _)| hosts.iter().position(|h| h == host));
        for (host, status) in &results {
            println!("  {}", status_line(host, *status));
        }

        let online = results.iter().filter(|(_, s)| s.is_online()).count();
        println!("\n{}/{} online", online, results.len());
        return Ok(());
    }

    let mut rx = monitor.subscribe();
    monitor.start(hosts.clone(), interval);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                monitor.stop();
                return Ok(());
            }
            event = rx.recv() => {
                let Ok(env) = event else {
                    continue;
                };
                if let RuntimeEvent::HealthChanged { host, status, cycle } = env.event {
                    if let Some(host) = hosts.iter().find(|h| h.name == host) {
                        println!("{}", watch_line(cycle, host, status));
                    }
                }
            }
        }
    }
}
