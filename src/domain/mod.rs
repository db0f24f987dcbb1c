// Domain layer: records, alerts and the ports the core drives.

pub mod model;
pub mod ports;
