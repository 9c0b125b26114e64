// Domain layer: models and ports. No knowledge of files, HTTP or config.

pub mod model;
pub mod ports;
