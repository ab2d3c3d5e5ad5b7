use std::{path::PathBuf, time::Duration};

use cdrom_gadget::{
    Backend, GadgetConfig,
    config::{DEFAULT_DEVICE_PATH, DEFAULT_WORKER_QUEUE_DEPTH},
    descriptors::COMMAND_BUFFER_LEN,
};
use clap::{Parser, Subcommand};
use env_logger::Env;

mod commands;

#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Opts {
    /// Verbose
    #[clap(short, long, global = true)]
    verbose: bool,

    /// Backing CD-ROM device, or disc image with --image
    #[clap(long, env = "CDROM_DEVICE", default_value = DEFAULT_DEVICE_PATH, global = true)]
    device: PathBuf,

    /// Treat the device path as a plain image of 2048-byte sectors
    #[clap(long, global = true)]
    image: bool,

    /// Seconds between media change checks
    #[clap(long, default_value_t = 5, global = true)]
    poll_interval_secs: u64,

    /// Commands that may wait for the worker before new ones are pushed back
    #[clap(long, default_value_t = DEFAULT_WORKER_QUEUE_DEPTH, global = true)]
    queue_depth: usize,

    /// Largest response a single command may produce, in bytes
    #[clap(long, default_value_t = COMMAND_BUFFER_LEN, global = true)]
    response_capacity: usize,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single command block against the backing device and print the response
    Exec {
        /// Command block as hex, e.g. 25000000000000000000
        cdb: String,
    },

    /// Expose the backing device to a USB host through FunctionFS
    #[cfg(feature = "functionfs")]
    Serve {
        /// USB vendor id
        #[clap(long, value_parser = commands::num_parser, default_value = "0x1d6b")]
        vendor: u16,

        /// USB product id
        #[clap(long, value_parser = commands::num_parser, default_value = "0x0104")]
        product: u16,
    },
}

impl Opts {
    fn gadget_config(&self) -> GadgetConfig {
        GadgetConfig {
            device_path: self.device.clone(),
            backend: if self.image {
                Backend::Image
            } else {
                Backend::Cdrom
            },
            media_poll_interval: Duration::from_secs(self.poll_interval_secs),
            worker_queue_depth: self.queue_depth,
            response_capacity: self.response_capacity,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    let level = if opts.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let config = opts.gadget_config();
    match opts.command {
        Command::Exec { cdb } => commands::exec::exec(config, &cdb),
        #[cfg(feature = "functionfs")]
        Command::Serve { vendor, product } => commands::serve::serve(config, vendor, product),
    }
}
