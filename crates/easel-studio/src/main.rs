mod host;
mod present;
mod runtime;

use anyhow::Result;
use easel_engine::gpu::GpuInit;
use easel_engine::logging::{init_logging, LoggingConfig};

use crate::runtime::{Runtime, RuntimeConfig};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    Runtime::run(RuntimeConfig::default(), GpuInit::default())
}
