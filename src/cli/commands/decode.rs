//! Decode command implementation
//!
//! Reads a captured connection prefix from a file and prints what the proxy
//! decoder makes of it.

use crate::core::proxy;
use crate::domain::context::ResultExt;
use clap::Args;

/// Arguments for the decode command
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding the raw bytes of a connection
    #[arg(short, long)]
    pub file: String,
}

impl DecodeArgs {
    /// Execute the decode command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        let data = tokio::fs::read(&self.file)
            .await
            .with_context(|| format!("Failed to read capture file {}", self.file))?;
        let result = proxy::decode(&data, "cli");

        match &result.connection {
            Some(info) => {
                println!("✅ Proxy Protocol v2 header decoded");
                println!("  Family: {}", info.address_family);
                println!("  Source: {}:{}", info.source_ip, info.source_port);
                println!(
                    "  Destination: {}:{}",
                    info.destination_ip, info.destination_port
                );
            }
            None if proxy::starts_with_signature(&data) => {
                println!("⚠️  Proxy Protocol v2 header present but carries no addresses");
            }
            None => println!("ℹ️  No Proxy Protocol v2 header"),
        }
        println!("  Header bytes: {}", data.len() - result.payload.len());
        println!("  Payload bytes: {}", result.payload.len());

        Ok(0)
    }
}
