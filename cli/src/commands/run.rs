use std::num::NonZeroU32;
use std::time::Duration;

use anstyle::{AnsiColor, Style};
use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum, ValueHint};
use tracing::{debug, info};
use vnm_emulator::machine::{Machine, MachineConfig, Outcome, Report};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Transport {
    /// Memory served from a thread, over channels
    Thread,

    /// Memory served from a child process, over pipes
    Process,

    /// Memory accessed in-process, without the protocol
    Direct,
}

#[derive(Parser, Debug)]
pub struct RunOpt {
    /// Program file
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// Number of user instructions between two timer interrupts
    #[clap(value_parser)]
    timer: NonZeroU32,

    /// How the processor reaches the memory
    #[clap(short, long, value_enum, default_value_t = Transport::Thread)]
    transport: Transport,

    /// Milliseconds to wait for the memory to answer a read. 0 waits forever.
    #[clap(long, value_name = "MILLIS", default_value_t = 5000)]
    reply_timeout: u64,

    /// Seed for the random number generator
    #[clap(long)]
    seed: Option<u64>,

    /// Stop after this many instructions
    #[clap(long, value_name = "N")]
    max_steps: Option<u64>,
}

impl RunOpt {
    fn config(&self) -> MachineConfig {
        MachineConfig {
            timer: self.timer,
            reply_timeout: (self.reply_timeout > 0)
                .then(|| Duration::from_millis(self.reply_timeout)),
            seed: self.seed,
            max_steps: self.max_steps,
        }
    }

    pub fn exec(self, colors: bool) -> anyhow::Result<i32> {
        // Parsing errors are reported before anything starts, whatever the transport
        let Some(image) = super::load_program(&self.input) else {
            return Ok(1);
        };

        let config = self.config();
        debug!(?config, transport = ?self.transport, "Building machine");

        let machine = match self.transport {
            Transport::Direct => Machine::direct(&image, &config),
            Transport::Thread => Machine::threaded(&image, &config),
            Transport::Process => {
                let exe = std::env::current_exe()
                    .context("Could not find the path of the current executable")?;
                let mut command = std::process::Command::new(exe);
                command.arg("memory").arg(&self.input);
                Machine::process(command, &config)
            }
        }
        .context("Could not start the machine")?;

        info!(path = %self.input, "Running program");
        let report = machine.run();
        print_summary(&report, colors);

        Ok(report.exit_code())
    }
}

/// Print a one-line summary of the run on stderr
fn print_summary(report: &Report, colors: bool) {
    let (style, status) = match &report.outcome {
        Outcome::Halted => (AnsiColor::Green.on_default().bold(), "halted".to_owned()),
        Outcome::Faulted(e) => (AnsiColor::Red.on_default().bold(), e.to_string()),
        Outcome::StepLimit(limit) => (
            AnsiColor::Yellow.on_default().bold(),
            format!("stopped after {limit} instructions"),
        ),
    };
    let style = if colors { style } else { Style::new() };

    eprintln!(
        "{style}{status}{style:#} after {} instructions, memory {}",
        report.cycles, report.memory
    );
    eprintln!("{}", report.registers);
}
