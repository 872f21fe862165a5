//! Utility modules

pub mod port_range;
