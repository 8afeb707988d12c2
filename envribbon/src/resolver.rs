use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, Sleep};

use crate::core::{parse_ip_body, Config, IpStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverTrigger {
    /// The network path became usable.
    PathSatisfied,
    /// The network path was lost.
    PathUnsatisfied,
    Refresh,
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// GET a URL and return status and body.
pub trait IpFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchResponse>> + Send;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl IpFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FetchResponse { status, body })
    }
}

type Cycle<'a> = Pin<Box<dyn Future<Output = IpStatus> + Send + 'a>>;

/// Polls public-IP services and publishes the result.
pub struct IpResolver<F: IpFetcher> {
    fetcher: F,
    endpoints: Vec<String>,
    poll_interval: Duration,
    settle_delay: Duration,
    status_tx: watch::Sender<IpStatus>,
}

impl<F: IpFetcher> IpResolver<F> {
    pub fn new(fetcher: F, config: &Config, status_tx: watch::Sender<IpStatus>) -> Self {
        Self {
            fetcher,
            endpoints: config.endpoints.clone(),
            poll_interval: config.poll_interval,
            settle_delay: config.settle_delay,
            status_tx,
        }
    }

    /// One lookup cycle: endpoints in order until one yields an address.
    pub async fn resolve_once(&self) -> IpStatus {
        let total = self.endpoints.len();
        for (index, url) in self.endpoints.iter().enumerate() {
            tracing::debug!("Fetching public IP from {} ({}/{})", url, index + 1, total);
            match self.fetcher.fetch(url).await {
                Ok(response) if response.is_success() => match parse_ip_body(&response.body) {
                    Some(ip) => {
                        tracing::debug!("Public IP {} from {}", ip, url);
                        return IpStatus::Address(ip);
                    }
                    None => {
                        tracing::warn!("Unparsable response from {}: {:?}", url, response.body)
                    }
                },
                Ok(response) => tracing::warn!("{} returned HTTP {}", url, response.status),
                Err(e) => tracing::warn!("Request to {} failed: {:#}", url, e),
            }
        }
        tracing::warn!("All {} IP endpoints failed", total);
        IpStatus::Unreachable
    }

    /// Run until the trigger channel closes.
    pub async fn run(self, mut triggers: mpsc::Receiver<ResolverTrigger>) {
        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut settle: Option<Pin<Box<Sleep>>> = None;
        let mut cycle: Option<Cycle<'_>> = None;

        tracing::info!(
            "IP resolver started ({} endpoints, every {:?})",
            self.endpoints.len(),
            self.poll_interval
        );

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    cycle = Some(self.start_cycle());
                }
                trigger = triggers.recv() => match trigger {
                    Some(ResolverTrigger::PathSatisfied) => {
                        tracing::debug!("Network path satisfied, settling for {:?}", self.settle_delay);
                        settle = Some(Box::pin(tokio::time::sleep(self.settle_delay)));
                    }
                    Some(ResolverTrigger::PathUnsatisfied) => {
                        tracing::info!("Network path lost");
                        settle = None;
                        cycle = None;
                        self.publish(IpStatus::NoConnection);
                    }
                    Some(ResolverTrigger::Refresh) => {
                        tracing::debug!("Refresh requested");
                        cycle = Some(self.start_cycle());
                    }
                    None => break,
                },
                _ = wait_slot(&mut settle), if settle.is_some() => {
                    settle = None;
                    cycle = Some(self.start_cycle());
                }
                status = wait_slot(&mut cycle), if cycle.is_some() => {
                    cycle = None;
                    self.publish(status);
                }
            }
        }

        tracing::info!("IP resolver stopped");
    }

    fn start_cycle(&self) -> Cycle<'_> {
        Box::pin(self.resolve_once())
    }

    fn publish(&self, status: IpStatus) {
        tracing::info!("Current IP: {}", status);
        self.status_tx.send_replace(status);
    }
}

async fn wait_slot<T: Future + Unpin>(slot: &mut Option<T>) -> T::Output {
    match slot {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}
