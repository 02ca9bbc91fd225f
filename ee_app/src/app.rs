use std::fs;

use ee_lib::ee::bus::{SimpleBus, IOP_RAM_SIZE};
use ee_lib::ee::memory::ram::Ram;
use ee_lib::Ee;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, Result};

pub struct App {
    ee: Ee<SimpleBus>,
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Result<App> {
        let image_path = config.image.as_ref().ok_or(AppError::MissingImage)?;

        let ram_size = config
            .ram_bytes()
            .ok_or(AppError::BadRamSize(config.ram_size))?;

        let ee_ram = Ram::with_size(ram_size)?;
        let iop_ram = Ram::with_size(IOP_RAM_SIZE)?;
        let mut ee = Ee::new(SimpleBus::new(ee_ram, iop_ram), config.core.clone());

        let image = fs::read(image_path)?;

        ee.load_image(config.load_address, &image, config.entry)?;

        Ok(App { ee, config })
    }

    pub fn run(&mut self) -> Result<()> {
        let mut executed = 0u64;

        for _ in 0..self.config.blocks {
            executed += self.ee.run_to_branch();

            for irq in self.ee.bus_mut().take_irqs() {
                debug!(
                    "SIF interrupt: {:?} {:?} in {} cycles",
                    irq.side, irq.channel, irq.cycles
                );
            }
        }

        info!(
            "Executed {} instructions in {} blocks, PC 0x{:08x}",
            executed,
            self.config.blocks,
            self.ee.cpu().pc()
        );

        if let Some(path) = &self.config.save_path {
            fs::write(path, self.ee.save_state()?)?;
            info!("Save state written to {}", path.display());
        }

        Ok(())
    }
}
