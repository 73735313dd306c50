pub mod clock;
pub mod config;
pub mod controller;
pub mod poller;
pub mod web;

pub use controller::{Phase, PublishedState, SnapshotController};
pub use poller::{Poller, PollerHandle};
