// Decoding
mod opcode;
pub use opcode::{check_table, lookup, AluOp, Cond, Flags, Instr, Opcode, Pair, Reg};
mod disasm;
pub use disasm::{disassemble, Disassembly, Record};

// Running
mod runtime;
pub use runtime::{Cpu, Exit, Status};
mod state;
pub use state::{addr, State, MEMORY_SIZE};
mod flags;
pub use flags::{ConditionCodes, Width};
mod port;
pub use port::{NullPorts, Ports};
mod features;
pub use features::{Features, Group};

mod error;
pub use error::{Fault, LoadError, TableError};

pub mod env;
pub mod output;
