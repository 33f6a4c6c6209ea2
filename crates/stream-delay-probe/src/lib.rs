//! Probes that time how long a streamed model response takes to close after
//! its last text fragment.
//!
//! `direct` consumes the full event sequence of one run and reports when
//! text-end, finish and close arrived relative to the last text delta.
//! `agent` consumes only the plain-text increments of an agent run and
//! reports when the iterator completed relative to the last non-empty chunk.
//!
//! Both probes write their report to any `std::io::Write` and return a
//! `ProbeReport` whose exit policy decides the process status.

pub mod agent;
pub mod config;
pub mod direct;
pub mod observability;
pub mod outcome;
pub mod providers;
pub mod timing;

pub use agent::{AGENT_EXIT_POLICY, AGENT_PROBE, measure_agent, run_agent_probe};
pub use config::{AgentProbeConfig, DirectProbeConfig, ProviderKind, load_dotenv};
pub use direct::{DIRECT_EXIT_POLICY, DIRECT_PROBE, measure_direct, run_direct_probe};
pub use observability::{LogSettings, LogSink, init_observability};
pub use outcome::{ExitPolicy, ProbeError, ProbeReport};
pub use providers::harness_from_env;
pub use timing::{AgentRunResult, DirectRunResult, Milestone, TimingSample};
