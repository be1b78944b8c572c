#![allow(dead_code)]

pub mod arbiter;
pub mod chomp;
pub mod ipc;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testutil;

pub mod utils {
    pub mod prelude {
        pub use anyhow::{anyhow, Context, Error};
        pub type Result<T> = anyhow::Result<T, Error>;

        pub use std::{
            ops::{Add, Sub},
            time::{Duration, Instant},
        };
    }
}

pub mod prelude {
    pub use super::arbiter::*;
    pub use super::chomp::prelude::*;
    pub use super::ipc::prelude::*;
    pub use super::strategy::*;
    pub use super::utils::prelude::*;
}
