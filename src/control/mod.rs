//! Control layer: the PID law and the lid-open supervisor wrapped around it.

pub mod lid;
pub mod pid;
