use std::sync::Arc;

use futures::StreamExt as _;
use stream_delay_harness::prelude::*;
use stream_delay_harness::vendors::openai::OpenAiProvider;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), HarnessError> {
    let harness = Harness::builder()
        .register_provider(Arc::new(OpenAiProvider::from_env()?))
        .build()?;

    let mut run = harness
        .session(SessionConfig::named("stream"))
        .run(ModelRef::new("openai", "gpt-5-nano"))
        .system_prompt("Reply to test streaming.")
        .user_text("Stream a greeting.")
        .start_stream()
        .await?;

    while let Some(event) = run.next().await {
        match event {
            StreamEvent::TextDelta { text, .. } => print!("{text}"),
            StreamEvent::TextEnd { .. } => println!("\n[text-end]"),
            StreamEvent::Finish { output, .. } => {
                println!("[finish] reason={:?} usage={:?}", output.finish_reason, output.usage)
            }
            StreamEvent::Error { error, .. } => eprintln!("run error: {error}"),
            StreamEvent::RunStarted { .. } => {}
        }
    }
    println!("[stream closed]");
    Ok(())
}
