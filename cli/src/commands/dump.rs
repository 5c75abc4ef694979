use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};
use tracing::debug;
use vnm_emulator::memory::MemoryStore;

#[derive(Parser, Debug)]
pub struct DumpOpt {
    /// Program file
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,
}

impl DumpOpt {
    pub fn exec(self) -> anyhow::Result<i32> {
        let Some(image) = super::load_program(&self.input) else {
            return Ok(1);
        };

        debug!("Loading image");
        let store = MemoryStore::from_image(&image)?;

        let mut stdout = std::io::stdout().lock();
        for (address, value) in store.dump() {
            writeln!(stdout, "{address}: {value}")?;
        }

        Ok(0)
    }
}
