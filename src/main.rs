// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod config;
mod network;
mod report;

use std::sync::Arc;

use clap::Parser;
use config::{AppConfig, DeploymentMode};
use env_logger::Env;
use linkwatch_core::{ChannelStatus, DuplexChannel, HealthMonitor, ReqwestClient};
use log::{info, warn};
use network::{TcpChannelConfig, TcpDuplexChannel};

#[derive(Parser, Debug)]
#[command(version, about = "Watch push and pull connectivity to a backend service")]
struct Args {
    /// Deployment mode selecting the backend URL
    #[arg(long, value_enum)]
    mode: Option<DeploymentMode>,

    /// Override the backend base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Push channel address in host:port format
    #[arg(long)]
    push_address: Option<String>,

    /// Time between checks in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Pull probe timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print snapshots as JSON lines
    #[arg(long)]
    json: bool,

    /// Exit after the first completed pull probe
    #[arg(long)]
    once: bool,

    /// Print the config file location and exit
    #[arg(long)]
    print_config_path: bool,

    /// Write the effective settings back to the config file
    #[arg(long)]
    save: bool,
}

impl Args {
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(base_url) = &self.base_url {
            match config.mode {
                DeploymentMode::Development => config.development_url.clone_from(base_url),
                DeploymentMode::Production => config.production_url.clone_from(base_url),
            }
        }
        if let Some(address) = &self.push_address {
            config.push_address = Some(address.clone());
        }
        if let Some(interval) = self.interval_ms {
            config.poll_interval_ms = interval;
        }
        if let Some(timeout) = self.timeout_ms {
            config.probe_timeout_ms = timeout;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let args = Args::parse();

    if args.print_config_path {
        println!("{}", AppConfig::get_config_path()?.display());
        return Ok(());
    }

    let mut app_config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    args.apply_to(&mut app_config);

    if args.save {
        app_config.save()?;
        info!("Saved config to {}", AppConfig::get_config_path()?.display());
    }

    let push_channel = app_config.push_address.clone().map(|address| {
        TcpDuplexChannel::spawn(TcpChannelConfig {
            address,
            ..TcpChannelConfig::default()
        })
    });

    let client = Arc::new(ReqwestClient::new()?);
    let mut monitor = HealthMonitor::new(
        app_config.monitor_config(),
        push_channel.clone().map(|channel| channel as Arc<dyn DuplexChannel>),
        client,
    );

    info!(
        "Monitoring {} every {} ms",
        monitor.config().base_url,
        app_config.poll_interval_ms
    );

    let mut updates = monitor.subscribe();
    monitor.start();

    loop {
        let snapshot = updates.borrow_and_update().clone();
        if args.json {
            println!("{}", report::json_line(&snapshot)?);
        } else {
            println!("{}", report::status_line(&snapshot));
        }

        if args.once && snapshot.pull != ChannelStatus::Checking {
            break;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    monitor.stop();
    if let Some(channel) = push_channel {
        channel.shutdown();
    }

    Ok(())
}
