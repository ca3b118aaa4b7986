// Fully-qualified name validation
//
// The registration pipeline accepts an `fqu` (fully-qualified username)
// string from callers of the operation issuers. Validation here is a
// pure addition on top of the on-chain state machine: a syntactically
// invalid name is rejected before it ever reaches the queue.

mod normalize;
mod reserved;
mod validate;

pub use normalize::*;
pub use reserved::*;
pub use validate::*;

/// Minimum name length (3 characters).
pub const MIN_NAME_LENGTH: usize = 3;

/// Maximum name length (64 characters).
pub const MAX_NAME_LENGTH: usize = 64;
