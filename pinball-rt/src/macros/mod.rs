//! Useful macros.

#[macro_use]
pub(crate) mod scoped_tls;

#[macro_use]
mod debug;
