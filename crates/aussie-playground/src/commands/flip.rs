use std::path::PathBuf;
use std::time::Duration;

use aussie_abi::RuntimeConfig;
use aussie_worker::ExecutionBoundary;
use eyre::{Result, eyre};

pub struct FlipCommand {
    pub source: String,
    pub runtime: PathBuf,
    pub upside_down: bool,
    pub timeout: Option<Duration>,
}

impl FlipCommand {
    pub async fn execute(self) -> Result<()> {
        let boundary = ExecutionBoundary::new(RuntimeConfig::dylib(self.runtime));
        boundary.initialize().await?;

        let flip = boundary.flip(self.source, self.upside_down);
        let flipped = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, flip)
                .await
                .map_err(|_| eyre!("gave up waiting for the flip"))??,
            None => flip.await?,
        };

        print!("{flipped}");
        Ok(())
    }
}
