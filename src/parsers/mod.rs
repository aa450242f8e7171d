//! Coverage report parsers. LCOV is the only supported format.

pub mod lcov;
