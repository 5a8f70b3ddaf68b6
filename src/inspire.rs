use log::{error, info, warn};
use reqwest::blocking::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::config::InspireConfig;
use crate::error::InspireError;

/// Result of looking up a single TeX key.
#[derive(Debug)]
pub enum LookupOutcome {
    Resolved(String),
    NotFound,
    Error(InspireError),
}

/// A literature database that can turn a TeX key into BibTeX.
pub trait LiteratureService {
    fn lookup(&self, texkey: &str) -> LookupOutcome;
}

/// Blocking client for the INSPIRE-HEP literature API.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct InspireClient {
    client: Client,
    config: InspireConfig,
}

impl InspireClient {
    pub fn new(config: InspireConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &InspireConfig {
        &self.config
    }

    /// Fetch the BibTeX text INSPIRE holds for `texkey`.
    ///
    /// An empty body means INSPIRE has no record with that key.
    pub fn fetch_bibtex(&self, texkey: &str) -> Result<String, InspireError> {
        let query = format!("texkey={}", texkey);
        let response = self
            .client
            .get(self.config.literature_url())
            .query(&[("q", query.as_str()), ("format", "bibtex")])
            .send()?;

        if !response.status().is_success() {
            warn!("INSPIRE API returned status {}", response.status());
            return Err(InspireError::ApiError(format!(
                "INSPIRE API returned status {}",
                response.status()
            )));
        }

        Ok(response.text()?)
    }
}

impl LiteratureService for InspireClient {
    fn lookup(&self, texkey: &str) -> LookupOutcome {
        match self.fetch_bibtex(texkey) {
            Ok(bibtex) if bibtex.is_empty() => LookupOutcome::NotFound,
            Ok(bibtex) => LookupOutcome::Resolved(bibtex),
            Err(e) => LookupOutcome::Error(e),
        }
    }
}

/// Everything gathered while resolving a list of keys.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub resolved: Vec<String>,
    pub not_found: Vec<String>,
    pub errors: Vec<String>,
    pub aborted: bool,
}

impl Resolution {
    fn record(&mut self, texkey: &str, outcome: LookupOutcome) {
        match outcome {
            LookupOutcome::Resolved(bibtex) => {
                info!("Success.");
                self.resolved.push(bibtex);
            }
            LookupOutcome::NotFound => {
                warn!("Reference {} not found on INSPIRE!", texkey);
                self.not_found.push(texkey.to_string());
            }
            LookupOutcome::Error(e) => {
                error!("There was an error in trying to look up reference {}: {}", texkey, e);
                self.errors.push(texkey.to_string());
            }
        }
    }

    /// Log the keys that could not be turned into BibTeX.
    pub fn report(&self) {
        if !self.errors.is_empty() {
            error!(
                "The following references could not be extracted due to errors:\n{}",
                self.errors.join("\n")
            );
        }
        if !self.not_found.is_empty() {
            error!(
                "The following references could not be found on INSPIRE:\n{}",
                self.not_found.join("\n")
            );
        }
    }
}

/// How often the resolver checks the abort flag while a lookup is in flight.
const ABORT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Look up every key in turn, one request at a time.
///
/// A failing key never stops the loop. Each lookup runs on a worker thread
/// so that setting `abort` stops the loop straight away, abandoning the
/// request in flight and keeping whatever was gathered so far.
pub fn resolve_keys<S>(service: &S, texkeys: &[String], abort: &AtomicBool) -> Resolution
where
    S: LiteratureService + Clone + Send + 'static,
{
    let total = texkeys.len();
    let mut resolution = Resolution::default();

    'keys: for (i, texkey) in texkeys.iter().enumerate() {
        if abort.load(Ordering::SeqCst) {
            resolution.aborted = true;
            break;
        }
        info!("Looking up reference {} of {}", i + 1, total);

        let (tx, rx) = mpsc::channel();
        let worker = service.clone();
        let key = texkey.clone();
        thread::spawn(move || {
            // The receiver is gone if the run was aborted meanwhile.
            let _ = tx.send(worker.lookup(&key));
        });

        let outcome = loop {
            match rx.recv_timeout(ABORT_POLL_INTERVAL) {
                Ok(outcome) => break outcome,
                Err(RecvTimeoutError::Timeout) => {
                    if abort.load(Ordering::SeqCst) {
                        if let Ok(outcome) = rx.try_recv() {
                            resolution.record(texkey, outcome);
                        }
                        resolution.aborted = true;
                        break 'keys;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    break LookupOutcome::Error(InspireError::ApiError(format!(
                        "lookup of {} stopped without a result",
                        texkey
                    )));
                }
            }
        };
        resolution.record(texkey, outcome);
    }

    if resolution.aborted {
        error!("The reference extraction has been aborted before completion.");
    }
    resolution.report();
    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    #[derive(Clone)]
    struct FakeService {
        answers: Arc<HashMap<&'static str, &'static str>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeService {
        fn new<const N: usize>(answers: [(&'static str, &'static str); N]) -> Self {
            Self {
                answers: Arc::new(HashMap::from(answers)),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl LiteratureService for FakeService {
        fn lookup(&self, texkey: &str) -> LookupOutcome {
            self.calls.lock().unwrap().push(texkey.to_string());
            match self.answers.get(texkey) {
                Some(&"") => LookupOutcome::NotFound,
                Some(bibtex) => LookupOutcome::Resolved(bibtex.to_string()),
                None => LookupOutcome::Error(InspireError::ApiError("boom".to_string())),
            }
        }
    }

    fn keys(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_outcomes_are_sorted_into_lists() {
        let service = FakeService::new([("a", "@article{a,}"), ("b", "")]);
        let resolution = resolve_keys(&service, &keys(&["a", "b", "c"]), &AtomicBool::new(false));

        assert_eq!(resolution.resolved, vec!["@article{a,}"]);
        assert_eq!(resolution.not_found, vec!["b"]);
        assert_eq!(resolution.errors, vec!["c"]);
        assert!(!resolution.aborted);
    }

    #[test]
    fn test_error_does_not_stop_later_keys() {
        let service = FakeService::new([("late", "@article{late,}")]);
        let resolution = resolve_keys(&service, &keys(&["broken", "late"]), &AtomicBool::new(false));

        assert_eq!(service.calls(), vec!["broken", "late"]);
        assert_eq!(resolution.resolved, vec!["@article{late,}"]);
    }

    #[test]
    fn test_abort_stops_before_next_request() {
        #[derive(Clone)]
        struct AbortingService {
            abort: Arc<AtomicBool>,
            calls: Arc<Mutex<Vec<String>>>,
        }
        impl LiteratureService for AbortingService {
            fn lookup(&self, texkey: &str) -> LookupOutcome {
                self.calls.lock().unwrap().push(texkey.to_string());
                if texkey == "second" {
                    self.abort.store(true, Ordering::SeqCst);
                }
                LookupOutcome::Resolved(format!("@misc{{{},}}", texkey))
            }
        }

        let abort = Arc::new(AtomicBool::new(false));
        let service = AbortingService {
            abort: Arc::clone(&abort),
            calls: Arc::new(Mutex::new(Vec::new())),
        };
        let resolution = resolve_keys(&service, &keys(&["first", "second", "third"]), &abort);

        assert!(resolution.aborted);
        assert_eq!(resolution.resolved[0], "@misc{first,}");
        assert!(resolution.resolved.len() <= 2);
        assert_eq!(*service.calls.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_abort_interrupts_lookup_in_flight() {
        #[derive(Clone)]
        struct StallingService {
            release: Arc<AtomicBool>,
            calls: Arc<Mutex<Vec<String>>>,
        }
        impl LiteratureService for StallingService {
            fn lookup(&self, texkey: &str) -> LookupOutcome {
                self.calls.lock().unwrap().push(texkey.to_string());
                if texkey == "fast" {
                    return LookupOutcome::Resolved("@misc{fast,}".to_string());
                }
                while !self.release.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(10));
                }
                LookupOutcome::Resolved(format!("@misc{{{},}}", texkey))
            }
        }

        let service = StallingService {
            release: Arc::new(AtomicBool::new(false)),
            calls: Arc::new(Mutex::new(Vec::new())),
        };
        let abort = Arc::new(AtomicBool::new(false));
        let trigger = Arc::clone(&abort);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            trigger.store(true, Ordering::SeqCst);
        });

        let started = Instant::now();
        let resolution = resolve_keys(&service, &keys(&["fast", "stalled", "never"]), &abort);
        service.release.store(true, Ordering::SeqCst);

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(resolution.aborted);
        assert_eq!(resolution.resolved, vec!["@misc{fast,}"]);
        assert!(resolution.errors.is_empty());
        assert_eq!(*service.calls.lock().unwrap(), vec!["fast", "stalled"]);
    }

    #[test]
    fn test_no_keys_no_requests() {
        let service = FakeService::new([]);
        let resolution = resolve_keys(&service, &[], &AtomicBool::new(false));
        assert_eq!(resolution, Resolution::default());
        assert!(service.calls().is_empty());
    }
}
