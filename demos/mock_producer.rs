//! Mock instrument: a websocket server that streams synthetic CV, OCV, PEIS,
//! CP and LP runs to every connected viewer.
//!
//! Run with `cargo run --example mock_producer -- --port 8765`, then start
//! `echemplot` in another terminal.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(short, long, default_value_t = 8765)]
    port: u16,
    /// Delay between data points in milliseconds.
    #[arg(long, default_value_t = 100)]
    delay_ms: u64,
    /// Points per technique run.
    #[arg(long, default_value_t = 100)]
    points: usize,
}

#[derive(Debug, Clone, Copy)]
enum Technique {
    Cv,
    Ocv,
    Peis,
    Cp,
    Lp,
}

impl Technique {
    const CYCLE: [Technique; 5] = [
        Technique::Cv,
        Technique::Ocv,
        Technique::Peis,
        Technique::Cp,
        Technique::Lp,
    ];

    fn name(self) -> &'static str {
        match self {
            Technique::Cv => "CV",
            Technique::Ocv => "OCV",
            Technique::Peis => "PEIS",
            Technique::Cp => "CP",
            Technique::Lp => "LP",
        }
    }

    /// Deterministic wobble standing in for measurement noise.
    fn noise(i: usize, scale: f64) -> f64 {
        scale * ((i as f64) * 12.9898).sin().fract()
    }

    fn point(self, i: usize, n: usize) -> (f64, f64) {
        let t = i as f64 / (n.max(2) - 1) as f64;
        match self {
            Technique::Cv => {
                // three triangular sweeps between -0.5 V and 0.5 V
                let phase = (t * 3.0).fract();
                let v = if phase < 0.5 {
                    -0.5 + 2.0 * phase
                } else {
                    0.5 - 2.0 * (phase - 0.5)
                };
                (v, 0.001 * (10.0 * v).sin() + Self::noise(i, 1e-4))
            }
            Technique::Ocv => {
                let time = 60.0 * t;
                (time, 0.5 * (-time / 20.0).exp() + 0.2 + Self::noise(i, 0.01))
            }
            Technique::Peis => {
                // simplified Randles circuit, 100 kHz down to 0.1 Hz
                let freq = 10f64.powf(5.0 - 6.0 * t);
                let omega = 2.0 * std::f64::consts::PI * freq;
                let (rs, rct, cdl) = (50.0, 200.0, 1e-6);
                let wrc = omega * rct * cdl;
                let denom = 1.0 + wrc * wrc;
                let re = rs + rct / denom + Self::noise(i, 5.0);
                let im = -rct * wrc / denom + Self::noise(i + 7, 5.0);
                (re, -im)
            }
            Technique::Cp => {
                let time = 30.0 * t;
                (time, 0.2 * (1.0 + time).ln() + 0.3 + Self::noise(i, 0.01))
            }
            Technique::Lp => {
                let v = -0.01 + 0.02 * t;
                (v, 0.001 * v + Self::noise(i, 1e-5))
            }
        }
    }
}

/// Alternate between the two label shapes the viewer has to accept.
fn label(name: &str, tagged: bool) -> Value {
    if tagged {
        json!({ "text": name })
    } else {
        Value::from(name)
    }
}

async fn produce(tx: broadcast::Sender<String>, delay: Duration, points: usize) {
    let mut run = 0usize;
    loop {
        for technique in Technique::CYCLE {
            let tagged = run % 2 == 1;
            run += 1;
            info!(technique = technique.name(), tagged, "starting run");
            let _ = tx.send(
                json!({
                    "type": "technique_change",
                    "technique": label(technique.name(), tagged),
                })
                .to_string(),
            );
            for i in 0..points {
                let (x, y) = technique.point(i, points);
                let _ = tx.send(
                    json!({
                        "type": "data_point",
                        "technique": label(technique.name(), tagged),
                        "x": x,
                        "y": y,
                    })
                    .to_string(),
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

async fn serve(stream: TcpStream, peer: SocketAddr, mut rx: broadcast::Receiver<String>) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, error = %e, "handshake failed");
            return;
        }
    };
    info!(%peer, "viewer connected");
    let (mut write, mut read) = ws.split();
    let hello = json!({
        "type": "connection_established",
        "message": "Connected to mock data stream",
    });
    if write.send(Message::text(hello.to_string())).await.is_err() {
        return;
    }
    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Ok(frame) => {
                    if write.send(Message::text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(%peer, skipped = n, "viewer is falling behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(other)) => debug!(%peer, ?other, "ignoring client message"),
                Some(Err(e)) => {
                    warn!(%peer, error = %e, "read failed");
                    break;
                }
            },
        }
    }
    info!(%peer, "viewer disconnected");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;
    info!(addr = %listener.local_addr()?, "mock producer listening");

    let (tx, _) = broadcast::channel(1024);
    tokio::spawn(produce(
        tx.clone(),
        Duration::from_millis(args.delay_ms),
        args.points,
    ));

    loop {
        let (stream, peer) = listener.accept().await?;
        tokio::spawn(serve(stream, peer, tx.subscribe()));
    }
}
