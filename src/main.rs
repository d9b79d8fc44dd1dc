//! fanin demo binary
//!
//! Loads configuration, starts a router, and runs an in-process
//! loopback exchange between two peers to show the routing core
//! end to end.

use fanin::{Config, Message, PeerEvent, Router};
use tokio::sync::oneshot;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::WARN.into())
        .from_env_lossy();
    fmt().with_env_filter(filter).with_target(true).init();

    println!("fanin Router Startup");
    println!("====================\n");

    // Load configuration from standard search paths
    println!("1. Loading configuration...");
    println!("   Search paths (in priority order, lowest to highest):");
    for path in Config::search_paths() {
        let status = if path.exists() { "[found]" } else { "[not found]" };
        println!("   {} {}", status, path.display());
    }
    println!();

    let (config, loaded_paths) = match Config::load() {
        Ok(result) => result,
        Err(e) => {
            eprintln!("   Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    if loaded_paths.is_empty() {
        println!("   No config files found, using defaults.");
    } else {
        println!("   Loaded {} config file(s):", loaded_paths.len());
        for path in &loaded_paths {
            println!("   - {}", path.display());
        }
    }

    // Start the router
    println!("\n2. Starting router...");
    let mut router = Router::new(config);
    if let Err(e) = router.start() {
        eprintln!("   Error starting router: {}", e);
        std::process::exit(1);
    }
    println!("   state:     {}", router.state());
    println!("   mandatory: {}", router.mandatory());

    let handle = router.handle().expect("router just started");
    let event_tx = router.event_sender().expect("router just started");
    let mut transmit_rx = router.take_transmit_rx().expect("router just started");
    let loop_task = tokio::spawn(async move {
        let _ = router.run().await;
        router
    });

    // Register two loopback peers
    println!("\n3. Connecting loopback peers...");
    let mut peers = Vec::new();
    for hint in [b"alice".to_vec(), b"bob".to_vec()] {
        let (ack_tx, ack_rx) = oneshot::channel();
        event_tx
            .send(PeerEvent::Connected {
                identity_hint: Some(hint),
                ack: ack_tx,
            })
            .await
            .expect("event loop running");
        match ack_rx.await.expect("event loop running") {
            Ok(identity) => {
                println!("   connected: {}", identity);
                peers.push(identity);
            }
            Err(e) => {
                eprintln!("   Error connecting peer: {}", e);
                std::process::exit(1);
            }
        }
    }

    // Each peer sends one request; receives interleave fairly
    println!("\n4. Exchanging messages...");
    for identity in &peers {
        event_tx
            .send(PeerEvent::Frames {
                identity: identity.clone(),
                frames: vec![b"ping".to_vec()],
            })
            .await
            .expect("event loop running");
    }

    for _ in 0..peers.len() {
        let request = handle.recv().await.expect("messages queued");
        let mut frames = request.into_frames();
        let source = frames.remove(0);
        println!("   recv from {}: {:?}", String::from_utf8_lossy(&source), frames);

        // Route a reply back to the sender
        let reply = Message::new(vec![source, b"pong".to_vec()]).expect("two frames");
        handle
            .send(reply)
            .await
            .expect("event loop running")
            .expect("peer connected");
    }

    for _ in 0..peers.len() {
        let transmit = transmit_rx.recv().await.expect("replies queued");
        println!("   sent to {}: {:?}", transmit.identity, transmit.frames);
    }

    handle.stop().await.expect("event loop running");
    let mut router = loop_task.await.expect("loop task joins");
    router.stop().expect("router running");

    println!("\nReady.");
}
