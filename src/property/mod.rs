//! Property value access.
//!
//! [`PropertyProxy`] enforces cardinality and mirrors inverse statements;
//! [`AccessorRegistry`] resolves attribute-style names (and aliases) to
//! properties.

mod accessor;
mod proxy;

pub use accessor::AccessorRegistry;
pub use proxy::PropertyProxy;
