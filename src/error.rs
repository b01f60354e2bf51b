use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Fatal condition that stops a run. There is no recovery inside the engine.
#[derive(Clone, Debug, PartialEq, Eq, Error, Diagnostic)]
#[error("Unimplemented opcode 0x{byte:02X} ({mnemonic}) at address 0x{addr:04X}")]
#[diagnostic(
    code(run::unimplemented),
    help("the instruction group of this opcode is disabled; check the `--features` list")
)]
pub struct Fault {
    /// Address of the opcode byte.
    pub addr: u16,
    /// Raw opcode byte.
    pub byte: u8,
    pub mnemonic: &'static str,
}

/// Failure to place a program image into memory.
#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("Could not read image `{}`", path.display())]
    #[diagnostic(code(load::io), help("make sure the file exists and is readable"))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Image of {len} bytes does not fit in memory when loaded at 0x{base:04X}")]
    #[diagnostic(
        code(load::too_large),
        help("memory is 65,536 bytes; use a lower base address or a smaller image")
    )]
    TooLarge { base: u16, len: usize },
}

/// Inconsistency found by the opcode table self-check.
#[derive(Clone, Debug, PartialEq, Eq, Error, Diagnostic)]
pub enum TableError {
    #[error("Opcode table has {len} entries instead of 256")]
    #[diagnostic(code(table::size))]
    Size { len: usize },
    #[error("Opcode table slot 0x{index:02X} holds the definition of 0x{code:02X}")]
    #[diagnostic(code(table::misplaced))]
    Misplaced { index: usize, code: u8 },
    #[error("Opcode 0x{code:02X} declares length {len}, its operands need {expected}")]
    #[diagnostic(code(table::length))]
    Length { code: u8, len: u8, expected: u8 },
    #[error("Opcode 0x{code:02X} has no mnemonic or summary")]
    #[diagnostic(code(table::unnamed))]
    Unnamed { code: u8 },
}
