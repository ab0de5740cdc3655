//! Interpreter limits.

/// Maximum number of non-push operations per script.
pub const MAX_OPS_PER_SCRIPT: usize = 201;
/// Maximum combined size of the main and alt stacks.
pub const MAX_STACK_SIZE: usize = 1000;
/// Maximum serialized script size in bytes.
pub const MAX_SCRIPT_SIZE: usize = 10_000;
/// Maximum size of a single pushed element.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
/// Maximum public keys for OP_CHECKMULTISIG.
pub const MAX_PUB_KEYS_PER_MULTISIG: usize = 20;
/// Byte limit of numeric operands.
pub const DEFAULT_SCRIPT_NUM_LEN: usize = 4;
/// Byte limit of CHECKLOCKTIMEVERIFY / CHECKSEQUENCEVERIFY operands.
pub const LOCKTIME_SCRIPT_NUM_LEN: usize = 5;

/// Script configuration limits.
///
/// Defaults to the consensus values; tests and policy code may tighten them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    max_ops: usize,
    max_stack_size: usize,
    max_script_size: usize,
    max_script_element_size: usize,
    max_pub_keys_per_multisig: usize,
}

impl Config {
    pub fn new() -> Self {
        Config {
            max_ops: MAX_OPS_PER_SCRIPT,
            max_stack_size: MAX_STACK_SIZE,
            max_script_size: MAX_SCRIPT_SIZE,
            max_script_element_size: MAX_SCRIPT_ELEMENT_SIZE,
            max_pub_keys_per_multisig: MAX_PUB_KEYS_PER_MULTISIG,
        }
    }

    pub fn with_max_ops(mut self, max_ops: usize) -> Self {
        self.max_ops = max_ops;
        self
    }

    pub fn with_max_stack_size(mut self, max_stack_size: usize) -> Self {
        self.max_stack_size = max_stack_size;
        self
    }

    pub fn max_ops(&self) -> usize {
        self.max_ops
    }

    pub fn max_stack_size(&self) -> usize {
        self.max_stack_size
    }

    pub fn max_script_size(&self) -> usize {
        self.max_script_size
    }

    pub fn max_script_element_size(&self) -> usize {
        self.max_script_element_size
    }

    pub fn max_script_number_length(&self) -> usize {
        DEFAULT_SCRIPT_NUM_LEN
    }

    pub fn max_pub_keys_per_multisig(&self) -> usize {
        self.max_pub_keys_per_multisig
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
