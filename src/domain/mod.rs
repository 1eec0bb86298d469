// Domain layer: poll outcomes, states and the ports the poller drives.
// No I/O here; concrete fetchers and displays live in `adapters`.

pub mod model;
pub mod ports;
