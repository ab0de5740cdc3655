/// Bitcoin Script - parsing, classification, templates, and the interpreter.
///
/// Provides the Bitcoin Script type, the closed opcode set, instruction
/// parsing, output script classification, script builders, and a consensus
/// script interpreter with P2SH and witness v0 support.

pub mod script;
pub mod opcodes;
pub mod instruction;
pub mod classify;
pub mod builder;
pub mod interpreter;

mod error;
pub use error::ScriptError;
pub use script::Script;
pub use opcodes::Opcode;
pub use instruction::Instruction;
pub use classify::{classify, OutputData, ScriptType, Solution};
pub use builder::ScriptBuilder;
