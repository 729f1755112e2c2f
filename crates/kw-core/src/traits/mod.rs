//! Core traits for kernel-warmup abstractions

mod kernel;

pub use kernel::{IopubChannel, KernelChannels, KernelConnector, ShellChannel};
