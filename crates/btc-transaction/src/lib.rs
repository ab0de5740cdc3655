/// Bitcoin SDK - Transactions, signature hashing, and progressive signing.
///
/// Provides the Transaction type with BIP144 witness serialization, the
/// legacy and witness v0 signature hash algorithms, the transaction-side
/// signature checker used by the script interpreter, and a signer that
/// assembles scriptSigs and witnesses from signatures contributed over
/// several rounds.

pub mod transaction;
pub mod input;
pub mod output;
pub mod sighash;
pub mod checker;
pub mod signature;
pub mod signer;

mod error;
pub use error::TransactionError;
pub use transaction::Transaction;
pub use input::{OutPoint, TransactionInput};
pub use output::TransactionOutput;
pub use sighash::{SigHashEngine, SigHashType};
pub use checker::TransactionChecker;
pub use signature::TxSignature;
pub use signer::{InputSigner, SigValues, SignData, Signer};
