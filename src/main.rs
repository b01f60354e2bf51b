use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::Result;

use i8080::output::{self, message, MsgColor};
use i8080::{disassemble, Cpu, Exit, Features, LoadError, NullPorts};

/// Emulator and disassembler for Intel 8080 machine code.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a binary image to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Load a binary image, run it and print the register file
    Run {
        /// Raw binary image
        name: PathBuf,
        /// Load address and initial program counter (`0x100`, `$100` or `256`)
        #[arg(short, long, default_value = "0", value_parser = parse_addr)]
        base: u16,
        /// Instruction groups to execute (`all`, `minimal` or a list like `io,restart`)
        #[arg(short, long, default_value = "all")]
        features: Features,
        /// Stop after this many instructions
        #[arg(short, long)]
        limit: Option<u64>,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Print a listing of a binary image
    Disasm {
        /// Raw binary image
        name: PathBuf,
        /// Address of the first byte (`0x100`, `$100` or `256`)
        #[arg(short, long, default_value = "0", value_parser = parse_addr)]
        base: u16,
    },
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    i8080::env::init();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(i8080::env::log_level())
        .without_time()
        .init();

    miette::set_hook(Box::new(|_| {
        Box::new(miette::MietteHandlerOpts::new().context_lines(2).build())
    }))?;

    i8080::check_table()?;

    if let Some(command) = args.command {
        match command {
            Command::Run {
                name,
                base,
                features,
                limit,
                minimal,
            } => run(&name, base, features, limit, minimal),
            Command::Disasm { name, base } => {
                let image = read_image(&name)?;
                file_message(MsgColor::Green, "Listing", &name);
                output::print_listing(disassemble(&image, base));
                Ok(())
            }
        }
    } else if let Some(path) = args.path {
        run(&path, 0, Features::all(), None, false)
    } else {
        println!("\n~ i8080 v{VERSION} ~");
        println!("{}", LOGO.truecolor(120, 200, 255).bold());
        println!("{SHORT_INFO}");
        Ok(())
    }
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn read_image(name: &Path) -> Result<Vec<u8>> {
    let image = fs::read(name).map_err(|source| LoadError::Io {
        path: name.to_path_buf(),
        source,
    })?;
    Ok(image)
}

fn run(name: &Path, base: u16, features: Features, limit: Option<u64>, minimal: bool) -> Result<()> {
    if minimal {
        colored::control::set_override(false);
    }
    let status = |color: MsgColor, left: &str, right: &str| {
        if !minimal {
            message(color, left, right);
        }
    };

    if !minimal {
        file_message(MsgColor::Green, "Loading", name);
    }
    let image = read_image(name)?;
    let mut cpu = Cpu::from_image(&image, base, NullPorts)?.with_features(features);

    status(
        MsgColor::Green,
        "Running",
        &format!("{} bytes at 0x{base:04x} with features [{features}]", image.len()),
    );
    let exit = match limit {
        Some(limit) => cpu.run_limit(limit),
        None => cpu.run(),
    };

    match exit {
        Ok(Exit::Halted) => status(MsgColor::Green, "Halted", &steps(cpu.steps())),
        Ok(Exit::EndOfProgram) => status(MsgColor::Green, "Completed", &steps(cpu.steps())),
        Ok(Exit::StepLimit) => status(MsgColor::Cyan, "Stopped", "step limit reached"),
        Err(fault) => {
            status(MsgColor::Red, "Faulted", &steps(cpu.steps()));
            output::print_registers(cpu.state(), minimal);
            return Err(fault.into());
        }
    }
    output::print_registers(cpu.state(), minimal);
    Ok(())
}

fn steps(count: u64) -> String {
    match count {
        1 => "after 1 instruction".to_string(),
        _ => format!("after {count} instructions"),
    }
}

/// Accepts `0x` or `$` prefixed hex, or plain decimal.
fn parse_addr(value: &str) -> Result<u16, String> {
    let value = value.trim();
    let parsed = if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .or_else(|| value.strip_prefix('$'))
    {
        u16::from_str_radix(hex, 16)
    } else {
        value.parse()
    };
    parsed.map_err(|_| format!("'{value}' is not an address between 0 and 0xFFFF"))
}

const LOGO: &str = r#"
   ___   ___    ___    ___
  ( _ ) / _ \  ( _ )  / _ \
  / _ \| | | | / _ \ | | | |
 | (_) | |_| || (_) || |_| |
  \___/ \___/  \___/  \___/ "#;

const SHORT_INFO: &str = r"
Runs raw Intel 8080 binary images and prints their listings.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
