//! Small helpers shared by the workspace binaries and libraries.

#![deny(missing_docs)]

pub mod env;
