//! Training callbacks: the hook trait, its context, and containers.

pub mod core;
pub mod lambda;
pub mod list;

// Re-export core types
pub use self::core::{Callback, CallbackContext};

// Re-export containers
pub use self::lambda::LambdaCallback;
pub use self::list::CallbackList;
