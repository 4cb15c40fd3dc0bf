//! IPSec Endpoint Programming Example
//!
//! Loads a key file, programs both directions between two address ranges
//! into an in-memory programmer, prints what would be sent to the kernel,
//! then deletes the endpoint again.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example program_endpoints -- <key_file> <local_cidr> <remote_cidr> <spi> [in|out|both]
//! ```
//!
//! # Example
//!
//! ```bash
//! cargo run --example program_endpoints -- ./keys 10.1.3.4/16 10.2.3.4/16 3 both
//! ```

use podsec_datapath::ipsec::{Direction, EndpointConfig, EndpointManager, KeyStore};
use podsec_platform::mock::MemoryProgrammer;
use podsec_platform::Cidr;
use std::env;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    if args.len() < 5 || args.len() > 6 {
        eprintln!(
            "Usage: {} <key_file> <local_cidr> <remote_cidr> <spi> [in|out|both]",
            args[0]
        );
        eprintln!();
        eprintln!("Example:");
        eprintln!("  {} ./keys 10.1.3.4/16 10.2.3.4/16 3 both", args[0]);
        eprintln!();
        eprintln!("Environment variables:");
        eprintln!("  RUST_LOG=debug    Enable debug logging");
        std::process::exit(1);
    }

    let local: Cidr = args[2].parse()?;
    let remote: Cidr = args[3].parse()?;
    let spi: u32 = args[4].parse()?;
    let direction: Direction = match args.get(5) {
        Some(dir) => dir.parse()?,
        None => Direction::Bidirectional,
    };

    let config = EndpointConfig::builder().with_key_file(&args[1]).build()?;
    let programmer = Arc::new(MemoryProgrammer::new());
    let manager =
        EndpointManager::new(Arc::new(KeyStore::new()), programmer.clone()).with_config(config);

    let installed = match manager.load_keys() {
        Ok(n) => n,
        Err(e) if e.is_not_found() => {
            eprintln!("No key file at {}", args[1]);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    println!("IPSec Endpoint Example");
    println!("======================");
    println!("Keys loaded:  {}", installed);
    println!("Local:        {}", local);
    println!("Remote:       {}", remote);
    println!("SPI:          {}", spi);
    println!("Direction:    {}", direction);
    println!();

    manager.upsert_endpoint(&local, &remote, spi, direction)?;

    for state in programmer.states() {
        println!(
            "state  {} -> {} spi {:#x} reqid {} auth {} crypt {}",
            state.src, state.dst, state.spi, state.reqid, state.auth.name, state.crypt.name
        );
    }
    for policy in programmer.policies() {
        println!(
            "policy {} {} -> {} tmpl {} -> {}",
            policy.dir, policy.src, policy.dst, policy.tmpl.src, policy.tmpl.dst
        );
    }

    manager.delete_endpoint(remote.addr(), local.addr())?;
    println!();
    println!(
        "Deleted. Remaining: {} states, {} policies",
        programmer.state_count(),
        programmer.policy_count()
    );

    let snapshot = manager.metrics().snapshot();
    println!(
        "Metrics: {} upserts, {} deletes, {} states programmed",
        snapshot.endpoint_upserts, snapshot.endpoint_deletes, snapshot.states_programmed
    );

    Ok(())
}
