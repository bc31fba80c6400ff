pub mod color;
pub mod conductor;
pub mod core;
pub mod matcher;
pub mod observer;
pub mod rewriter;
pub mod walker;

pub use color::*;
pub use conductor::*;
pub use self::core::*;
pub use matcher::*;
pub use observer::*;
pub use rewriter::*;
pub use walker::*;
