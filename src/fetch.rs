use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde_json::Value;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::Duration;

pub enum FetchCommand {
    FetchLayout,
    FetchReadings,
}

pub enum FetchEvent {
    Layout(Result<Value>),
    Readings(Result<Value>),
}

#[derive(Clone, Debug)]
pub struct Endpoints {
    pub layout_url: Option<String>,
    pub readings_url: Option<String>,
    pub timeout: Duration,
}

/// Spawns the fetch worker. Commands run one at a time in the order sent, so a
/// layout request queued before a readings request completes first.
pub fn start_fetch_service(endpoints: Endpoints, tx_to_app: Sender<FetchEvent>) -> Sender<FetchCommand> {
    let (tx_cmd, rx_cmd) = std::sync::mpsc::channel();

    thread::spawn(move || {
        info!("[FETCH] service started");
        let client = match Client::builder().timeout(endpoints.timeout).build() {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("[FETCH] failed to build HTTP client: {}", e);
                None
            }
        };
        run_fetch_loop(client.as_ref(), &endpoints, &rx_cmd, &tx_to_app);
        info!("[FETCH] service stopped");
    });

    tx_cmd
}

fn run_fetch_loop(
    client: Option<&Client>,
    endpoints: &Endpoints,
    rx_cmd: &Receiver<FetchCommand>,
    tx_event: &Sender<FetchEvent>,
) {
    // Ends when the app drops its sender.
    while let Ok(cmd) = rx_cmd.recv() {
        let event = match cmd {
            FetchCommand::FetchLayout => {
                FetchEvent::Layout(fetch_json(client, endpoints.layout_url.as_deref(), "layout"))
            }
            FetchCommand::FetchReadings => {
                FetchEvent::Readings(fetch_json(client, endpoints.readings_url.as_deref(), "readings"))
            }
        };
        if tx_event.send(event).is_err() {
            break;
        }
    }
}

fn fetch_json(client: Option<&Client>, url: Option<&str>, what: &str) -> Result<Value> {
    let url = url.ok_or_else(|| anyhow!("no {} URL configured", what))?;
    let client = client.ok_or_else(|| anyhow!("HTTP client unavailable"))?;

    debug!("[FETCH] GET {}", url);
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("{} request to {} failed", what, url))?;

    let status = response.status();
    if !status.is_success() {
        bail!("{} request returned {}", what, status);
    }

    let value = response
        .json::<Value>()
        .with_context(|| format!("{} payload is not JSON", what))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_url_is_reported() {
        let err = fetch_json(None, None, "layout").unwrap_err();
        assert_eq!(err.to_string(), "no layout URL configured");
    }

    #[test]
    fn test_service_answers_in_order_without_urls() {
        let (tx, rx) = std::sync::mpsc::channel();
        let endpoints = Endpoints { layout_url: None, readings_url: None, timeout: Duration::from_secs(1) };
        let cmd = start_fetch_service(endpoints, tx);

        cmd.send(FetchCommand::FetchLayout).unwrap();
        cmd.send(FetchCommand::FetchReadings).unwrap();

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(first, FetchEvent::Layout(Err(_))));
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(second, FetchEvent::Readings(Err(_))));
    }
}
