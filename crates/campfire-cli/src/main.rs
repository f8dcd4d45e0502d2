//! Campfire waiter binary.
//!
//! Waits at a campfire and relays bytes between the local stdio and the
//! first peer that joins.
//!
//! # Usage
//!
//! ```bash
//! # Generate a fresh campfire URI (share it out-of-band)
//! campfire-wait --generate
//!
//! # Wait at a campfire with a TLS certificate
//! campfire-wait --camp 'camp://...#psk' --cert cert.pem --key key.pem
//!
//! # Demo: wait and let an in-process echo peer join
//! campfire-wait --camp 'camp://...#psk' --echo-peer
//! ```
//!
//! The transport engine is an external collaborator; this binary wires the
//! in-memory engine from `campfire-harness`, which rendezvouses within one
//! process. Linking a production engine means implementing
//! `campfire_session::engine::TransportEngine` and swapping it in here.

use std::io::Write;

use campfire_core::generate_psk;
use campfire_harness::{FakeEngine, FakeRelay};
use campfire_proto::CampfireUri;
use campfire_session::{Campfire, CancellationToken, CredentialMaterial, SystemEnv, join, wait};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Campfire waiter
#[derive(Parser, Debug)]
#[command(name = "campfire-wait")]
#[command(about = "Wait at a campfire for peers to join")]
#[command(version)]
struct Args {
    /// Campfire URI (camp://fingerprint?...#psk)
    #[arg(long)]
    camp: Option<String>,

    /// Path to x509 certificate (PEM format)
    #[arg(short, long)]
    cert: Option<String>,

    /// Path to private key (PEM format)
    #[arg(short, long)]
    key: Option<String>,

    /// Generate a fresh campfire URI and exit
    #[arg(long)]
    generate: bool,

    /// Spawn an in-process echo peer that joins the campfire (demo)
    #[arg(long)]
    echo_peer: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let env = SystemEnv::new();

    let credentials = match (&args.cert, &args.key) {
        (Some(cert), Some(key)) => Some(CredentialMaterial::from_pem_files(cert, key)?),
        _ => {
            tracing::warn!("no certificate provided - proposals carry the placeholder fingerprint");
            None
        },
    };

    if args.generate {
        return generate_uri(&env, credentials.as_ref());
    }

    let raw = args.camp.ok_or("a camp URI is required (see --help)")?;
    let uri = CampfireUri::decode(&raw)?;
    if uri.psk.is_empty() {
        return Err("the camp URI must carry a PSK fragment".into());
    }

    let relay = FakeRelay::new();
    let cancel = CancellationToken::new();

    tracing::info!(fingerprint = %uri.fingerprint, "waiting at campfire");
    let campfire = wait(&env, &relay.engine(), &uri, credentials, cancel.clone()).await?;

    if args.echo_peer {
        tokio::spawn(run_echo_peer(relay.engine(), env.clone(), uri.clone()));
    }

    let outcome = run_waiter(&campfire).await;
    campfire.close();
    outcome
}

/// Print a freshly generated campfire URI.
fn generate_uri(
    env: &SystemEnv,
    credentials: Option<&CredentialMaterial>,
) -> Result<(), Box<dyn std::error::Error>> {
    let psk = generate_psk(env, campfire_core::PSK_SIZE);
    let uri = CampfireUri {
        // The URI host is the expected certificate fingerprint space;
        // colon-less so it stays a valid host segment.
        fingerprint: credentials
            .map_or_else(|| "campfire".to_string(), |c| c.fingerprint().replace(':', "")),
        psk: psk.as_str().to_string(),
        ..CampfireUri::default()
    };
    // Encoding injects the default TURN candidate, so the printed URI is
    // immediately joinable.
    writeln!(std::io::stdout(), "{uri}")?;
    Ok(())
}

/// Accept the first peer and relay bytes, watching the error and expiry
/// sources so a silent failure can never leave us hanging on stdio.
async fn run_waiter(campfire: &Campfire) -> Result<(), Box<dyn std::error::Error>> {
    let mut errors = campfire.errors();

    tracing::info!("waiting for connections");
    let conn = tokio::select! {
        res = campfire.accept() => res?,
        err = errors.recv() => {
            let err = err?;
            tracing::error!(%err, "campfire failed");
            return Err(err.into());
        },
        () = campfire.expired() => {
            tracing::info!("campfire expired - nobody came");
            return Ok(());
        },
    };

    tracing::info!("new peer connection");
    let (mut from_peer, mut to_peer) = tokio::io::split(conn);
    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();

    tokio::select! {
        res = tokio::io::copy(&mut stdin, &mut to_peer) => {
            res?;
            tracing::info!("local input closed");
        },
        res = tokio::io::copy(&mut from_peer, &mut stdout) => {
            res?;
            tracing::info!("peer connection closed");
        },
    }
    Ok(())
}

/// Demo peer: joins the campfire and echoes everything back.
async fn run_echo_peer(engine: FakeEngine, env: SystemEnv, uri: CampfireUri) {
    match join(&env, &engine, &uri, None, CancellationToken::new()).await {
        Ok(conn) => {
            tracing::info!("echo peer joined");
            let (mut reader, mut writer) = tokio::io::split(conn);
            if let Err(err) = tokio::io::copy(&mut reader, &mut writer).await {
                tracing::debug!(%err, "echo peer stream ended");
            }
        },
        Err(err) => tracing::error!(%err, "echo peer failed to join"),
    }
}
