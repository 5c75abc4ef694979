use camino::Utf8Path;
use vnm_emulator::loader::ProgramImage;

mod completion;
mod dump;
mod memory;
mod run;

#[derive(clap::Subcommand)]
pub enum Subcommand {
    /// Load a program and run it
    Run(self::run::RunOpt),

    /// Serve the memory of a program over stdin and stdout
    Memory(self::memory::MemoryOpt),

    /// Print the non-zero cells of a program image
    Dump(self::dump::DumpOpt),

    /// Generate shell completions
    Completion(self::completion::CompletionOpt),
}

impl Subcommand {
    /// Run a subcommand, returning the exit code of the process
    pub fn exec(self, colors: bool) -> anyhow::Result<i32> {
        match self {
            Self::Run(opt) => opt.exec(colors),
            Self::Memory(opt) => opt.exec(),
            Self::Dump(opt) => opt.exec(),
            Self::Completion(opt) => opt.exec(),
        }
    }
}

/// Load a program file, rendering parse errors in context.
///
/// Returns `None` when the error was already reported.
fn load_program(path: &Utf8Path) -> Option<ProgramImage> {
    match ProgramImage::from_file(path) {
        Ok(image) => Some(image),
        Err(e) => {
            let report = miette::Report::new(e);
            eprintln!("{report:?}");
            None
        }
    }
}
