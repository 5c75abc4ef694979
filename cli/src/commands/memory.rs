use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};
use tracing::info;
use vnm_emulator::memory::{MemoryStore, ServeOutcome};
use vnm_emulator::transport::StreamLink;

#[derive(Parser, Debug)]
pub struct MemoryOpt {
    /// Program file to load before serving requests
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,
}

impl MemoryOpt {
    pub fn exec(self) -> anyhow::Result<i32> {
        let Some(image) = super::load_program(&self.input) else {
            return Ok(1);
        };

        let mut store = MemoryStore::from_image(&image)?;
        info!(cells = image.len(), "Memory loaded");

        let link = StreamLink::new(std::io::stdin().lock(), std::io::stdout().lock());
        let outcome = store.serve(link).context("Memory stopped serving requests")?;

        match outcome {
            ServeOutcome::Quit => info!("Memory shut down"),
            ServeOutcome::Disconnected => info!("Memory shut down, processor gone"),
        }

        Ok(0)
    }
}
