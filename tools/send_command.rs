// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Send one command datagram to a running relay.
//!
//! Prints the frame the relay will write, or why it will drop the command.
//! The datagram is sent either way so rejection paths can be exercised.

use std::net::{SocketAddr, UdpSocket};

use anyhow::{Context, Result};
use clap::Parser;

use actuator_bridge::protocol::{frame_from_datagram, CommandDefaults};

#[derive(Parser, Debug)]
#[command(name = "send_command", version, about = "Send one command datagram to the bridge")]
#[command(allow_negative_numbers = true)]
struct Args {
    /// Relay address
    #[arg(long, default_value = "127.0.0.33:10333")]
    target: SocketAddr,

    /// Send this text verbatim instead of the three values
    #[arg(long, conflicts_with_all = ["left_front", "right_front", "rear"])]
    raw: Option<String>,

    #[arg(required_unless_present = "raw")]
    left_front: Option<i64>,
    #[arg(required_unless_present = "raw")]
    right_front: Option<i64>,
    #[arg(required_unless_present = "raw")]
    rear: Option<i64>,
}

impl Args {
    fn command_text(&self) -> String {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        [self.left_front, self.right_front, self.rear]
            .iter()
            .flatten()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let text = args.command_text();

    // preview with the stock defaults; the relay may be configured otherwise
    match frame_from_datagram(text.as_bytes(), &CommandDefaults::default()) {
        Ok(frame) => println!("frame: {}", frame),
        Err(e) => eprintln!("warning: relay will drop this command: {}", e),
    }

    let bind: SocketAddr = if args.target.is_ipv4() {
        ([0u8, 0, 0, 0], 0).into()
    } else {
        ([0u16; 8], 0).into()
    };
    let socket = UdpSocket::bind(bind).context("Failed to bind local UDP socket")?;
    socket
        .send_to(text.as_bytes(), args.target)
        .with_context(|| format!("Failed to send to {}", args.target))?;

    println!("sent \"{}\" to {}", text, args.target);
    Ok(())
}
