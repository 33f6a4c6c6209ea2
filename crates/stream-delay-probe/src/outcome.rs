use stream_delay_harness::{HarnessError, RunFailure};

/// Failures a probe can run into. Request and iteration failures are not
/// distinguished further.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Probe configuration could not be resolved.
    #[error("config error: {0}")]
    Config(String),
    /// Harness/provider construction or request failure.
    #[error(transparent)]
    Harness(#[from] HarnessError),
    /// The event sequence ended with a terminal failure.
    #[error(transparent)]
    Run(#[from] RunFailure),
    /// Writing the report to the console failed.
    #[error("console write failed: {0}")]
    Console(#[from] std::io::Error),
}

/// How a probe outcome maps to a process exit status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Failures exit with status 1 (direct-stream probe).
    PropagateErrors,
    /// Failures are logged and the process still exits 0 (agent-stream probe).
    SwallowErrors,
}

impl ExitPolicy {
    pub fn exit_code(self, failed: bool) -> u8 {
        match (self, failed) {
            (ExitPolicy::PropagateErrors, true) => 1,
            _ => 0,
        }
    }
}

/// Outcome of a probe invocation plus the policy that turns it into an exit
/// status. The caller owns process exit.
#[derive(Debug)]
pub struct ProbeReport<T> {
    pub outcome: Result<T, ProbeError>,
    pub policy: ExitPolicy,
}

impl<T> ProbeReport<T> {
    /// Wraps an outcome, logging it when it is a failure. This is the only
    /// place a probe failure is reported.
    pub fn new(probe: &'static str, outcome: Result<T, ProbeError>, policy: ExitPolicy) -> Self {
        if let Err(err) = &outcome {
            tracing::error!(probe, error = %err, ?policy, "probe failed");
        }
        Self { outcome, policy }
    }

    pub fn failed(probe: &'static str, err: impl Into<ProbeError>, policy: ExitPolicy) -> Self {
        Self::new(probe, Err(err.into()), policy)
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&ProbeError> {
        self.outcome.as_ref().err()
    }

    pub fn exit_code(&self) -> u8 {
        self.policy.exit_code(self.outcome.is_err())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn propagate_fails_only_on_error() {
        assert_eq!(ExitPolicy::PropagateErrors.exit_code(false), 0);
        assert_eq!(ExitPolicy::PropagateErrors.exit_code(true), 1);
    }

    #[test]
    fn swallow_always_exits_zero() {
        assert_eq!(ExitPolicy::SwallowErrors.exit_code(false), 0);
        assert_eq!(ExitPolicy::SwallowErrors.exit_code(true), 0);
    }

    #[test]
    fn report_exit_code_follows_outcome_and_policy() {
        let failure = RunFailure::Protocol {
            message: "invalid SSE JSON frame".into(),
        };
        let direct: ProbeReport<()> =
            ProbeReport::failed("direct", failure.clone(), ExitPolicy::PropagateErrors);
        let agent: ProbeReport<()> = ProbeReport::failed("agent", failure, ExitPolicy::SwallowErrors);
        assert_eq!(direct.exit_code(), 1);
        assert_eq!(agent.exit_code(), 0);
        assert!(!agent.is_success());
        assert!(matches!(agent.error(), Some(ProbeError::Run(_))));
    }

    #[test]
    fn failure_is_logged_exactly_once() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let report: ProbeReport<()> = tracing::subscriber::with_default(subscriber, || {
            ProbeReport::failed(
                "agent-stream-probe",
                HarnessError::Config("missing ANTHROPIC_API_KEY".into()),
                ExitPolicy::SwallowErrors,
            )
        });

        let logs = String::from_utf8(captured.0.lock().expect("lock").clone()).expect("utf8");
        assert_eq!(logs.matches("probe failed").count(), 1);
        assert!(logs.contains("ERROR"));
        assert!(logs.contains("missing ANTHROPIC_API_KEY"));
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn success_is_not_logged() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .finish();

        let report = tracing::subscriber::with_default(subscriber, || {
            ProbeReport::new("direct-stream-probe", Ok(()), ExitPolicy::PropagateErrors)
        });

        assert!(captured.0.lock().expect("lock").is_empty());
        assert_eq!(report.exit_code(), 0);
    }
}
