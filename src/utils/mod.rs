mod atomic;
pub mod infbounds;

pub(crate) use atomic::*;
