use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use aussie_abi::RuntimeConfig;
use aussie_proto::OutputEvent;
use aussie_worker::ExecutionBoundary;
use colored::Colorize;
use eyre::{Result, eyre};

use crate::console::{Appended, DEFAULT_BANNER, Transcript};

pub struct RunCommand {
    pub source: String,
    pub runtime: PathBuf,
    pub upside_down: bool,
    pub timeout: Option<Duration>,
    pub json: bool,
}

impl RunCommand {
    pub async fn execute(self) -> Result<()> {
        let RunCommand {
            source,
            runtime,
            upside_down,
            timeout,
            json,
        } = self;

        let boundary = ExecutionBoundary::new(RuntimeConfig::dylib(runtime));
        boundary.initialize().await?;

        let mut events = boundary.subscribe();
        let mut transcript = Transcript::new(DEFAULT_BANNER);
        transcript.begin_run();
        if !json {
            print!("{}", DEFAULT_BANNER.dimmed());
            let _ = std::io::stdout().flush();
        }

        let run = boundary.run(source, upside_down);
        tokio::pin!(run);

        let deadline = async {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);

        let result = loop {
            tokio::select! {
                event = events.recv() => {
                    if let Some(event) = event {
                        render(json, &mut transcript, &event);
                    }
                }
                result = &mut run => break result,
                () = &mut deadline => {
                    return Err(eyre!(
                        "gave up waiting for the program; the runtime is still running"
                    ));
                }
            }
        };

        // Everything emitted before the entry point returned is already in
        // the channel; drain it before reporting the outcome.
        while let Some(event) = events.try_recv() {
            render(json, &mut transcript, &event);
        }
        if !json && transcript.is_placeholder_visible() {
            println!();
        }

        if let Err(error) = result {
            tracing::error!(%error, "run failed");
            return Err(error.into());
        }
        Ok(())
    }
}

fn render(json: bool, transcript: &mut Transcript, event: &OutputEvent) {
    if json {
        transcript.append(event.clone());
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(error) => tracing::warn!(%error, "failed to encode event"),
        }
        return;
    }

    if transcript.append(event.clone()) == Appended::ReplacedPlaceholder {
        // The first real output takes the banner's place.
        print!("\r\x1b[2K");
    }
    match event {
        OutputEvent::Stdout(text) => println!("{text}"),
        OutputEvent::Stderr(text) => eprintln!("{}", text.red()),
    }
}
