//! Device profile listing

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use streamprobe_common::DeviceCatalog;

use crate::output::{print_list, OutputFormat, TableDisplay};

const USER_AGENT_DISPLAY_LENGTH: usize = 48;

#[derive(Args)]
pub struct DevicesArgs {
    /// Device profiles file
    #[arg(long, default_value = "config/devices.json")]
    pub devices: PathBuf,
}

#[derive(Serialize, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
    pub user_agent: String,
}

impl TableDisplay for DeviceInfo {
    fn headers() -> Vec<&'static str> {
        vec!["Device", "Viewport", "Pixel Ratio", "User Agent"]
    }

    fn row(&self) -> Vec<String> {
        let agent = if self.user_agent.chars().count() > USER_AGENT_DISPLAY_LENGTH {
            let short: String = self.user_agent.chars().take(USER_AGENT_DISPLAY_LENGTH).collect();
            format!("{}…", short)
        } else {
            self.user_agent.clone()
        };
        vec![
            self.name.clone(),
            format!("{}x{}", self.width, self.height),
            format!("{}", self.pixel_ratio),
            agent,
        ]
    }
}

/// Profiles sorted by name
pub fn device_infos(catalog: &DeviceCatalog) -> Vec<DeviceInfo> {
    catalog
        .iter()
        .map(|(name, p)| DeviceInfo {
            name: name.to_string(),
            width: p.width,
            height: p.height,
            pixel_ratio: p.pixel_ratio,
            user_agent: p.user_agent.clone(),
        })
        .collect()
}

pub fn execute(args: DevicesArgs, format: OutputFormat) -> Result<()> {
    let catalog = DeviceCatalog::load(&args.devices)
        .with_context(|| format!("loading device profiles from {}", args.devices.display()))?;
    print_list(&device_infos(&catalog), format);
    Ok(())
}
