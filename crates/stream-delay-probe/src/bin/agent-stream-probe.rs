use std::process::ExitCode;

use stream_delay_harness::Agent;
use stream_delay_probe::{
    AGENT_EXIT_POLICY, AGENT_PROBE, AgentProbeConfig, ProbeReport, harness_from_env,
    init_observability, load_dotenv, run_agent_probe,
};

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();
    init_observability();

    let report = match AgentProbeConfig::from_env() {
        Ok(config) => match harness_from_env(config.provider) {
            Ok(harness) => {
                let agent = Agent::new(&harness, config.agent_config());
                let mut stdout = std::io::stdout().lock();
                run_agent_probe(&agent, &config, &mut stdout).await
            }
            Err(err) => ProbeReport::failed(AGENT_PROBE, err, AGENT_EXIT_POLICY),
        },
        Err(err) => ProbeReport::failed(AGENT_PROBE, err, AGENT_EXIT_POLICY),
    };

    ExitCode::from(report.exit_code())
}
