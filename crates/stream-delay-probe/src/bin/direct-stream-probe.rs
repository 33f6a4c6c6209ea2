use std::process::ExitCode;

use stream_delay_probe::{
    DIRECT_EXIT_POLICY, DIRECT_PROBE, DirectProbeConfig, ProbeReport, harness_from_env,
    init_observability, load_dotenv, run_direct_probe,
};

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();
    init_observability();

    let report = match DirectProbeConfig::from_env() {
        Ok(config) => match harness_from_env(config.provider) {
            Ok(harness) => {
                let mut stdout = std::io::stdout().lock();
                run_direct_probe(&harness, &config, &mut stdout).await
            }
            Err(err) => ProbeReport::failed(DIRECT_PROBE, err, DIRECT_EXIT_POLICY),
        },
        Err(err) => ProbeReport::failed(DIRECT_PROBE, err, DIRECT_EXIT_POLICY),
    };

    ExitCode::from(report.exit_code())
}
