#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

mod args;
mod controller;
mod key;

pub use self::{
    args::{Args, InvalidLogFormat, LogFormat},
    controller::{Controller, FULL_SYNC_KEY},
    key::{DispatchKey, KeyError},
};
pub use ingress_controller_core as core;
pub use ingress_controller_index as index;
