//! Request middleware.

pub(crate) mod csrf;
pub(crate) mod security;
