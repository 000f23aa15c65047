use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::sync::broadcast;
use tokio::task::{JoinHandle, JoinSet};

use logtail_core::backend::Backend;
use logtail_core::host::{Host, HostStatus};
use logtail_core::reducer::{EventEnvelope, RuntimeEvent};

/// Periodic liveness prober for every configured host
pub struct HealthMonitor {
    backend: Arc<dyn Backend>,
    timeout: Duration,
    event_tx: broadcast::Sender<EventEnvelope>,
    next_id: Arc<AtomicU64>,
    cycle: Arc<AtomicU64>,
    schedule: Option<JoinHandle<()>>,
}

/// One `/alive` probe; anything but a timely success is offline
async fn probe(backend: &dyn Backend, host: &Host, timeout: Duration) -> HostStatus {
    match tokio::time::timeout(timeout, backend.alive(host)).await {
        Ok(Ok(())) => HostStatus::Online,
        Ok(Err(error)) => {
            tracing::debug!(host = %host.name, %error, "probe failed");
            HostStatus::Offline
        }
        Err(_) => {
            tracing::debug!(host = %host.name, "probe timed out");
            HostStatus::Offline
        }
    }
}

fn publish(
    event_tx: &broadcast::Sender<EventEnvelope>,
    next_id: &AtomicU64,
    event: RuntimeEvent,
) {
    let _ = event_tx.send(EventEnvelope {
        id: next_id.fetch_add(1, Ordering::SeqCst),
        event,
    });
}

impl HealthMonitor {
    pub fn new(
        backend: Arc<dyn Backend>,
        timeout: Duration,
        event_tx: broadcast::Sender<EventEnvelope>,
        next_id: Arc<AtomicU64>,
    ) -> Self {
        Self {
            backend,
            timeout,
            event_tx,
            next_id,
            cycle: Arc::new(AtomicU64::new(0)),
            schedule: None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.event_tx.subscribe()
    }

    /// Probe `hosts` now and then every `interval`, replacing any previous
    /// schedule. Each cycle's probes run as their own tasks so a hung host
    /// holds up neither other hosts nor the next cycle.
    pub fn start(&mut self, hosts: Vec<Host>, interval: Duration) {
        self.stop();
        publish(
            &self.event_tx,
            &self.next_id,
            RuntimeEvent::HostsLoaded {
                hosts: hosts.clone(),
            },
        );
        if hosts.is_empty() {
            return;
        }

        tracing::info!(hosts = hosts.len(), interval_ms = interval.as_millis() as u64, "health monitor started");

        let backend = self.backend.clone();
        let timeout = self.timeout;
        let event_tx = self.event_tx.clone();
        let next_id = self.next_id.clone();
        let cycle = self.cycle.clone();

        self.schedule = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut probes = JoinSet::new();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let n = cycle.fetch_add(1, Ordering::SeqCst) + 1;
                        for host in &hosts {
                            let backend = backend.clone();
                            let event_tx = event_tx.clone();
                            let next_id = next_id.clone();
                            let host = host.clone();
                            probes.spawn(async move {
                                let status = probe(backend.as_ref(), &host, timeout).await;
                                publish(&event_tx, &next_id, RuntimeEvent::HealthChanged {
                                    host: host.name,
                                    status,
                                    cycle: n,
                                });
                            });
                        }
                    }
                    Some(_) = probes.join_next(), if !probes.is_empty() => {}
                }
            }
        }));
    }

    /// Run one cycle inline and return every host's status, publishing each
    /// result as soon as it resolves.
    pub async fn poll(&self, hosts: &[Host]) -> Vec<(Host, HostStatus)> {
        let n = self.cycle.fetch_add(1, Ordering::SeqCst) + 1;
        let mut pending: FuturesUnordered<_> = hosts
            .iter()
            .map(|host| async move {
                (host, probe(self.backend.as_ref(), host, self.timeout).await)
            })
            .collect();

        let mut results = Vec::with_capacity(hosts.len());
        while let Some((host, status)) = pending.next().await {
            publish(
                &self.event_tx,
                &self.next_id,
                RuntimeEvent::HealthChanged {
                    host: host.name.clone(),
                    status,
                    cycle: n,
                },
            );
            results.push((host.clone(), status));
        }
        results
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.schedule.is_some()
    }

    /// Cancel the schedule along with any probes still in flight
    pub fn stop(&mut self) {
        if let Some(schedule) = self.schedule.take() {
            schedule.abort();
            tracing::debug!("health monitor stopped");
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::fake::{FakeBackend, FakeHost, Liveness};
    use tokio::time::Instant;

    fn monitor(backend: Arc<FakeBackend>, timeout: Duration) -> HealthMonitor {
        let (event_tx, _) = broadcast::channel(64);
        HealthMonitor::new(backend, timeout, event_tx, Arc::new(AtomicU64::new(1)))
    }

    async fn next_health(rx: &mut broadcast::Receiver<EventEnvelope>) -> (String, HostStatus, u64) {
        loop {
            let env = rx.recv().await.unwrap();
            if let RuntimeEvent::HealthChanged { host, status, cycle } = env.event {
                return (host, status, cycle);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_one_status_per_host() {
        let backend = Arc::new(FakeBackend::new());
        let up = Host::new("up", "http://up");
        let down = Host::new("down", "http://down");
        let refused = Host::new("refused", "http://refused");
        backend.set_host(&up, FakeHost::up(&[]));
        backend.set_host(&down, FakeHost::up(&[]).with_liveness(Liveness::Down));
        backend.set_host(&refused, FakeHost::up(&[]).with_liveness(Liveness::Refused));

        let monitor = monitor(backend, Duration::from_secs(2));
        let mut results = monitor
            .poll(&[up.clone(), down.clone(), refused.clone()])
            .await;
        results.sort_by(|a, b| a.0.name.cmp(&b.0.name));

        assert_eq!(results.len(), 3);
        assert_eq!(results[0], (down, HostStatus::Offline));
        assert_eq!(results[1], (refused, HostStatus::Offline));
        assert_eq!(results[2], (up, HostStatus::Online));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_host_does_not_delay_others() {
        let backend = Arc::new(FakeBackend::new());
        let a = Host::new("a", "http://a");
        let b = Host::new("b", "http://b");
        backend.set_host(&a, FakeHost::up(&[]).with_liveness(Liveness::Hang));
        backend.set_host(&b, FakeHost::up(&[]));

        let mut monitor = monitor(backend, Duration::from_secs(2));
        let mut rx = monitor.subscribe();
        let began = Instant::now();
        monitor.start(vec![a, b], Duration::from_secs(5));

        assert_eq!(next_health(&mut rx).await, ("b".into(), HostStatus::Online, 1));
        assert!(began.elapsed() < Duration::from_secs(1));

        assert_eq!(next_health(&mut rx).await, ("a".into(), HostStatus::Offline, 1));
        assert!(began.elapsed() >= Duration::from_secs(2));
        monitor.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_cycle_not_held_by_hung_probe() {
        let backend = Arc::new(FakeBackend::new());
        let a = Host::new("a", "http://a");
        let b = Host::new("b", "http://b");
        backend.set_host(&a, FakeHost::up(&[]).with_liveness(Liveness::Hang));
        backend.set_host(&b, FakeHost::up(&[]));

        // probe timeout longer than the interval
        let mut monitor = monitor(backend, Duration::from_secs(12));
        let mut rx = monitor.subscribe();
        let began = Instant::now();
        monitor.start(vec![a, b], Duration::from_secs(5));

        assert_eq!(next_health(&mut rx).await, ("b".into(), HostStatus::Online, 1));
        assert_eq!(next_health(&mut rx).await, ("b".into(), HostStatus::Online, 2));
        let elapsed = began.elapsed();
        assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_secs(6));
        monitor.stop();
    }

    #[tokio::test]
    async fn test_start_announces_hosts_and_stop_is_idempotent() {
        let backend = Arc::new(FakeBackend::new());
        let mut monitor = monitor(backend, Duration::from_secs(2));
        let mut rx = monitor.subscribe();
        monitor.start(Vec::new(), Duration::from_secs(5));

        let env = rx.recv().await.unwrap();
        assert!(matches!(env.event, RuntimeEvent::HostsLoaded { ref hosts } if hosts.is_empty()));
        assert!(!monitor.is_running());
        monitor.stop();
        monitor.stop();
    }
}
