use anyhow::{Context, Result};
use cdrom_backing::BackingStore;
use cdrom_gadget::GadgetConfig;
use std::sync::Arc;
use usbd_scsi::Emulator;

use super::{parse_hex, to_hex};

pub fn exec(config: GadgetConfig, cdb: &str) -> Result<()> {
    let cdb = parse_hex(cdb)?;

    log::info!(
        "Opening {} as {:?} backend",
        config.device_path.display(),
        config.backend
    );
    let backing = Arc::new(BackingStore::new(
        config.device_path.clone(),
        config.backend.opener(),
    ));
    backing
        .open()
        .with_context(|| format!("Unable to open {}", config.device_path.display()))?;

    let emulator = Emulator::new(backing.clone());
    let mut response = vec![0u8; config.response_capacity];

    log::info!("Executing command block {}", to_hex(&cdb));
    let result = emulator.execute(&cdb, &mut response);
    backing.close();

    let len = result.context("Command failed")?;
    log::info!("Command passed with {len} response bytes");
    println!("{}", to_hex(&response[..len]));

    Ok(())
}
