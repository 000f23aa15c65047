use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};

use logtail_core::backend::{Backend, BackendError, ChannelTransport, Transport, TransportEvent};
use logtail_core::host::Host;

/// How a fake host answers `/alive`
#[allow(dead_code)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Liveness {
    Up,
    /// Answers with HTTP 503
    Down,
    /// Connection refused
    Refused,
    /// Never answers
    Hang,
}

#[derive(Clone, Debug)]
pub struct FakeHost {
    pub liveness: Liveness,
    pub files: Result<Vec<String>, BackendError>,
    /// Lines queued on every stream opened against this host
    pub lines: Vec<String>,
    /// When set, `/list-files` waits for `release_files`
    pub gated: bool,
}

#[allow(dead_code)]
impl FakeHost {
    pub fn up(files: &[&str]) -> Self {
        Self {
            liveness: Liveness::Up,
            files: Ok(files.iter().map(|f| f.to_string()).collect()),
            lines: Vec::new(),
            gated: false,
        }
    }

    pub fn with_liveness(mut self, liveness: Liveness) -> Self {
        self.liveness = liveness;
        self
    }

    pub fn with_lines(mut self, lines: &[&str]) -> Self {
        self.lines = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn gated(mut self) -> Self {
        self.gated = true;
        self
    }
}

/// Everything the fake saw, in order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Alive { host: String },
    ListFiles { host: String },
    Opened { id: usize, host: String, file: String },
    Closed { id: usize },
}

#[derive(Default)]
struct Shared {
    hosts: BTreeMap<String, FakeHost>,
    gates: BTreeMap<String, Arc<Notify>>,
    journal: Vec<Call>,
    feeds: Vec<mpsc::Sender<TransportEvent>>,
    opened: usize,
    /// Skip the journal and feeds; demo mode runs indefinitely
    quiet: bool,
}

/// In-memory backend for demo mode and tests
pub struct FakeBackend {
    shared: Arc<Mutex<Shared>>,
    /// Emit generated lines on open streams at this pace (demo mode)
    tick_interval: Option<Duration>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            tick_interval: None,
        }
    }

    /// Three hosts, one of them down, streaming generated lines
    pub fn demo() -> (Self, Vec<Host>) {
        let hosts = vec![
            Host::new("Localhost", "http://localhost:5005"),
            Host::new("Staging", "http://staging.example.com:5005"),
            Host::new("Offline Server", "https://localhost:8443"),
        ];
        let backend = Self::new().with_tick_interval(Duration::from_millis(600));
        backend.shared().quiet = true;
        backend.set_host(
            &hosts[0],
            FakeHost::up(&["system.log", "application.log", "another.log", "worker.log"]),
        );
        backend.set_host(&hosts[1], FakeHost::up(&["application.log", "db.log"]));
        let mut offline = FakeHost::up(&[]).with_liveness(Liveness::Refused);
        offline.files = Err(BackendError::Request {
            message: "connection refused".into(),
        });
        backend.set_host(&hosts[2], offline);
        (backend, hosts)
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_host(&self, host: &Host, fake: FakeHost) {
        let mut shared = self.shared();
        if fake.gated {
            shared.gates.insert(host.url.clone(), Arc::new(Notify::new()));
        }
        shared.hosts.insert(host.url.clone(), fake);
    }

    /// Let a gated `/list-files` call answer
    #[allow(dead_code)]
    pub fn release_files(&self, host: &Host) {
        if let Some(gate) = self.shared().gates.get(&host.url) {
            gate.notify_one();
        }
    }

    #[allow(dead_code)]
    pub fn journal(&self) -> Vec<Call> {
        self.shared().journal.clone()
    }

    /// Sender feeding the `n`th opened stream (1-based)
    #[allow(dead_code)]
    pub fn feed(&self, n: usize) -> Option<mpsc::Sender<TransportEvent>> {
        self.shared().feeds.get(n.checked_sub(1)?).cloned()
    }

    fn lookup(&self, host: &Host) -> Result<FakeHost, BackendError> {
        self.shared()
            .hosts
            .get(&host.url)
            .cloned()
            .ok_or_else(|| BackendError::Request {
                message: format!("unknown host {}", host.url),
            })
    }

    fn record(&self, call: Call) {
        let mut shared = self.shared();
        if !shared.quiet {
            shared.journal.push(call);
        }
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn alive(&self, host: &Host) -> Result<(), BackendError> {
        self.record(Call::Alive {
            host: host.name.clone(),
        });
        match self.lookup(host)?.liveness {
            Liveness::Up => Ok(()),
            Liveness::Down => Err(BackendError::Status { code: 503 }),
            Liveness::Refused => Err(BackendError::Request {
                message: "connection refused".into(),
            }),
            Liveness::Hang => std::future::pending().await,
        }
    }

    async fn list_files(&self, host: &Host) -> Result<Vec<String>, BackendError> {
        self.record(Call::ListFiles {
            host: host.name.clone(),
        });
        let fake = self.lookup(host)?;
        let gate = self.shared().gates.get(&host.url).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        fake.files
    }

    async fn open_stream(
        &self,
        host: &Host,
        file: &str,
    ) -> Result<Box<dyn Transport>, BackendError> {
        let fake = self.lookup(host)?;
        let (tx, rx) = mpsc::channel(1_024);

        for line in &fake.lines {
            let _ = tx.try_send(TransportEvent::Message(line.clone()));
        }

        let producer = self.tick_interval.map(|interval| {
            let tx = tx.clone();
            let file = file.to_string();
            tokio::spawn(async move { generate_lines(tx, &file, interval).await }).abort_handle()
        });

        let id = {
            let mut shared = self.shared();
            shared.opened += 1;
            let id = shared.opened;
            if !shared.quiet {
                shared.feeds.push(tx);
                shared.journal.push(Call::Opened {
                    id,
                    host: host.name.clone(),
                    file: file.to_string(),
                });
            }
            id
        };

        Ok(Box::new(FakeTransport {
            id,
            inner: ChannelTransport::new(rx, producer),
            shared: self.shared.clone(),
        }))
    }
}

/// Channel transport that records when it is closed
struct FakeTransport {
    id: usize,
    inner: ChannelTransport,
    shared: Arc<Mutex<Shared>>,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn next(&mut self) -> Option<TransportEvent> {
        self.inner.next().await
    }

    fn try_next(&mut self) -> Option<TransportEvent> {
        self.inner.try_next()
    }

    fn close(&mut self) {
        if self.inner.is_closed() {
            return;
        }
        self.inner.close();
        let mut shared = self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !shared.quiet {
            shared.journal.push(Call::Closed { id: self.id });
        }
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl Drop for FakeTransport {
    fn drop(&mut self) {
        self.close();
    }
}

async fn generate_lines(tx: mpsc::Sender<TransportEvent>, file: &str, interval: Duration) {
    let mut tick = tokio::time::interval(interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut tick_num: u64 = 0;
    let mut job_counter: u64 = 0;

    loop {
        tick.tick().await;
        tick_num += 1;

        let text: String = match file.trim_end_matches(".log") {
            "application" => {
                if tick_num % 12 == 7 {
                    "[ERROR] Connection refused to upstream service".into()
                } else if tick_num % 8 == 3 {
                    "[WARN] High latency detected: 450ms".into()
                } else {
                    let routes = [
                        "GET /health 200",
                        "GET /api/users 200",
                        "POST /api/data 201",
                        "GET /api/status 200",
                    ];
                    routes[(tick_num as usize) % routes.len()].into()
                }
            }
            "worker" => {
                job_counter += 1;
                if tick_num % 10 == 5 {
                    format!("[ERROR] Job {} failed: timeout after 30s", job_counter)
                } else if tick_num % 7 == 2 {
                    format!("[WARN] Queue depth high: {} pending", 50 + (tick_num % 30))
                } else {
                    format!("processed job id={}", job_counter)
                }
            }
            "db" => {
                if tick_num % 15 == 10 {
                    "[WARN] Slow query detected: 1250ms".into()
                } else {
                    let msgs = ["checkpoint complete", "autovacuum: processing", "connection accepted"];
                    msgs[(tick_num as usize) % msgs.len()].into()
                }
            }
            "missing" => {
                let _ = tx
                    .send(TransportEvent::Message(format!("Error: File not found: {}", file)))
                    .await;
                return;
            }
            _ => format!("tick {}", tick_num),
        };

        if tx.send(TransportEvent::Message(text)).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_keeps_no_history() {
        let (backend, hosts) = FakeBackend::demo();
        for _ in 0..3 {
            backend.alive(&hosts[0]).await.unwrap();
        }
        let first = backend.open_stream(&hosts[0], "system.log").await.unwrap();
        let second = backend.open_stream(&hosts[0], "worker.log").await.unwrap();
        drop(first);
        drop(second);

        assert!(backend.journal().is_empty());
        assert!(backend.feed(1).is_none());
        assert_eq!(backend.shared().opened, 2);
    }

    #[tokio::test]
    async fn test_journal_records_calls_in_order() {
        let backend = FakeBackend::new();
        let host = Host::new("a", "http://a");
        backend.set_host(&host, FakeHost::up(&["x.log"]));
        backend.alive(&host).await.unwrap();
        let transport = backend.open_stream(&host, "x.log").await.unwrap();
        drop(transport);

        assert_eq!(
            backend.journal(),
            vec![
                Call::Alive { host: "a".into() },
                Call::Opened {
                    id: 1,
                    host: "a".into(),
                    file: "x.log".into(),
                },
                Call::Closed { id: 1 },
            ]
        );
        assert!(backend.feed(1).is_some());
    }

    #[tokio::test]
    async fn test_demo_offline_host_refuses() {
        let (backend, hosts) = FakeBackend::demo();
        assert!(backend.alive(&hosts[2]).await.is_err());
        assert!(backend.list_files(&hosts[2]).await.is_err());
    }
}
