//! Core DDNS engine
//!
//! The DdnsEngine is responsible for:
//! - Asking the IpSource for the current address once per cycle
//! - Comparing it with the last published address
//! - Running the delete-then-create reconciliation when it changed
//! - Persisting the published address after a successful reconciliation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   current()   ┌──────────────┐   reconcile()  ┌─────────────┐
//! │  IpSource   │──────────────▶│  DdnsEngine  │───────────────▶│ DnsProvider │
//! └─────────────┘               └──────────────┘                └─────────────┘
//!                                  │        │
//!                     set_last_ip  │        │  EngineEvent
//!                                  ▼        ▼
//!                          ┌────────────┐  ┌──────────┐
//!                          │ StateStore │  │  Events  │
//!                          └────────────┘  └──────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Observe; a failed observation skips the cycle
//! 2. Same as `last_known_ip` and the zone is settled → nothing to do
//! 3. Otherwise reconcile, retrying retryable failures
//! 4. On success, store the address (unless dry-run) and update `last_known_ip`
//! 5. A deferred reconciliation marks the zone unsettled, so the next
//!    observation reconciles even if it equals `last_known_ip`
//! 6. Sleep the check interval (or stop on shutdown)

use crate::config::DdnsConfig;
use crate::error::Result;
use crate::reconcile::{ReconcileReport, reconcile_into};
use crate::traits::{DnsProvider, DnsRecord, IpSource, StateStore};
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Events emitted by the DdnsEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started { hostname: String },

    /// The IP source returned an address
    IpObserved { ip: Ipv4Addr },

    /// The IP source failed; the cycle is skipped
    ObservationFailed { error: String },

    /// The observed address is already published
    Unchanged { current_ip: Ipv4Addr },

    /// Reconciliation started
    ReconcileStarted {
        previous_ip: Option<Ipv4Addr>,
        new_ip: Ipv4Addr,
    },

    /// Reconciliation succeeded
    ReconcileSucceeded {
        previous_ip: Option<Ipv4Addr>,
        new_ip: Ipv4Addr,
        deleted: usize,
    },

    /// Reconciliation failed after all attempts
    ReconcileFailed { error: String, retry_count: usize },

    /// Engine stopped
    Stopped { reason: String },
}

/// State carried from one cycle to the next
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopState {
    /// The address the zone is known to publish, if any
    pub last_known_ip: Option<Ipv4Addr>,

    /// A reconciliation was deferred part-way, so the zone may not publish
    /// `last_known_ip` anymore (deletes done, create failed)
    pub unsettled: bool,
}

impl LoopState {
    /// Settled state publishing `last_known_ip`
    pub fn new(last_known_ip: Option<Ipv4Addr>) -> Self {
        Self {
            last_known_ip,
            unsettled: false,
        }
    }

    /// Whether `observed` needs no reconciliation
    pub fn publishes(&self, observed: Ipv4Addr) -> bool {
        !self.unsettled && self.last_known_ip == Some(observed)
    }
}

/// Result of a single cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The IP source failed; nothing was attempted
    NoObservation,

    /// The observed address is already published
    Unchanged { current_ip: Ipv4Addr },

    /// The zone was converged to a new address
    Reconciled {
        previous_ip: Option<Ipv4Addr>,
        new_ip: Ipv4Addr,
        deleted: Vec<String>,
    },

    /// Reconciliation failed with a retryable error; the next cycle tries again
    Deferred { error: String },
}

/// Core DDNS engine
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`]
/// 2. Start with [`DdnsEngine::run()`]
/// 3. Engine runs until Ctrl-C or a fatal error
///
/// ## Threading
///
/// One cycle runs at a time and every provider call is awaited before the
/// next one is issued. `LoopState` is owned by the running loop.
pub struct DdnsEngine {
    /// IP source for observing the current address
    ip_source: Box<dyn IpSource>,

    /// DNS provider for list/delete/create
    provider: Box<dyn DnsProvider>,

    /// State store for the last published address
    state_store: Box<dyn StateStore>,

    /// Hostname of the managed A record
    hostname: String,

    /// Time between cycles
    check_interval: Duration,

    /// Maximum retry attempts per reconciliation
    max_retries: usize,

    /// Delay between retries
    retry_delay: Duration,

    /// Derive the initial address from the zone when the store is empty
    seed_from_zone: bool,

    /// Treat exhausted retries as fatal
    exit_on_failure: bool,

    /// The provider only logs mutations, so nothing is persisted
    dry_run: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DdnsEngine {
    /// Create a new DDNS engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        state_store: Box<dyn StateStore>,
        config: DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            ip_source,
            provider,
            state_store,
            hostname: config.record.hostname.trim().to_string(),
            check_interval: Duration::from_secs(config.engine.check_interval_secs),
            max_retries: config.engine.max_retries,
            retry_delay: Duration::from_secs(config.engine.retry_delay_secs),
            seed_from_zone: config.engine.seed_from_zone,
            exit_on_failure: config.engine.exit_on_failure,
            dry_run: config.provider.dry_run,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run the engine until Ctrl-C or a fatal error
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Fatal error
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the engine with a controlled shutdown signal
    ///
    /// The loop stops when `shutdown_rx` fires or its sender is dropped.
    /// `None` falls back to Ctrl-C, same as `run()`.
    pub async fn run_with_shutdown(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(&self, mut shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.emit_event(EngineEvent::Started {
            hostname: self.hostname.clone(),
        });
        info!(
            "Managing A record for {} via {} (check interval: {:?})",
            self.hostname,
            self.provider.provider_name(),
            self.check_interval
        );

        let mut state = self.initial_state().await?;

        let result = loop {
            if let Err(e) = self.run_once(&mut state).await {
                error!("Fatal error, stopping: {}", e);
                self.emit_event(EngineEvent::Stopped {
                    reason: e.to_string(),
                });
                break Err(e);
            }

            if let Some(reason) = self.wait_for_next_cycle(&mut shutdown_rx).await {
                info!("Shutdown signal received");
                self.emit_event(EngineEvent::Stopped { reason });
                break Ok(());
            }
        };

        // Flush state before exiting
        self.state_store.flush().await?;
        info!("State flushed, engine stopped");

        result
    }

    /// Determine `last_known_ip` before the first cycle
    ///
    /// The state store wins. When it has nothing and seeding is enabled, the
    /// zone is listed and the value of an existing A record for the hostname
    /// is adopted, so a restarted updater deletes the record it published
    /// before instead of adding a second one.
    pub async fn initial_state(&self) -> Result<LoopState> {
        if let Some(record) = self.state_store.get_record(&self.hostname).await? {
            info!(
                "Last published IP for {}: {} (updated {})",
                self.hostname, record.last_ip, record.last_updated
            );
            return Ok(LoopState::new(Some(record.last_ip)));
        }

        if !self.seed_from_zone {
            debug!("No stored state for {}, starting empty", self.hostname);
            return Ok(LoopState::default());
        }

        match self.provider.list_records().await {
            Ok(records) => {
                let published: Vec<Ipv4Addr> = records
                    .iter()
                    .filter(|r| r.is_a_record_for(&self.hostname))
                    .filter_map(DnsRecord::ipv4)
                    .collect();

                if published.len() > 1 {
                    warn!(
                        "Zone has {} A records for {}; adopting {} as the published address",
                        published.len(),
                        self.hostname,
                        published[0]
                    );
                }

                let last_known_ip = published.first().copied();
                match last_known_ip {
                    Some(ip) => info!("Zone already publishes {} for {}", ip, self.hostname),
                    None => info!("Zone has no A record for {}", self.hostname),
                }
                Ok(LoopState::new(last_known_ip))
            }
            Err(e) if e.is_retryable() => {
                warn!("Could not read zone to seed state, starting empty: {}", e);
                Ok(LoopState::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Run a single observe → compare → reconcile cycle
    ///
    /// # Returns
    ///
    /// - `Ok(CycleOutcome)`: What the cycle did
    /// - `Err(Error)`: Fatal error; the loop must stop
    pub async fn run_once(&self, state: &mut LoopState) -> Result<CycleOutcome> {
        let Some(observed) = self.observe().await else {
            return Ok(CycleOutcome::NoObservation);
        };

        if state.publishes(observed) {
            debug!("IP unchanged: {}", observed);
            self.emit_event(EngineEvent::Unchanged {
                current_ip: observed,
            });
            return Ok(CycleOutcome::Unchanged {
                current_ip: observed,
            });
        }

        let previous_ip = state.last_known_ip;
        if state.unsettled {
            info!(
                "Previous reconciliation for {} did not complete, reconciling again",
                self.hostname
            );
        }

        match self.reconcile_with_retry(previous_ip, observed).await {
            Ok(report) => {
                if self.dry_run {
                    info!("[DRY-RUN] Not persisting {} for {}", observed, self.hostname);
                } else {
                    self.state_store.set_last_ip(&self.hostname, observed).await?;
                }
                *state = LoopState::new(Some(observed));

                info!(
                    "DNS record updated successfully: {} -> {} (previous: {:?})",
                    self.hostname, observed, previous_ip
                );
                self.emit_event(EngineEvent::ReconcileSucceeded {
                    previous_ip,
                    new_ip: observed,
                    deleted: report.deleted.len(),
                });

                Ok(CycleOutcome::Reconciled {
                    previous_ip,
                    new_ip: observed,
                    deleted: report.deleted,
                })
            }
            Err(e) if !e.is_retryable() || self.exit_on_failure => Err(e),
            Err(e) => {
                warn!("Reconciliation deferred to next cycle: {}", e);
                state.unsettled = true;
                Ok(CycleOutcome::Deferred {
                    error: e.to_string(),
                })
            }
        }
    }

    async fn observe(&self) -> Option<Ipv4Addr> {
        match self.ip_source.current().await {
            Ok(ip) => {
                info!("Current IP address: {}", ip);
                self.emit_event(EngineEvent::IpObserved { ip });
                Some(ip)
            }
            Err(e) => {
                warn!(
                    "IP lookup via {} failed, skipping this cycle: {}",
                    self.ip_source.source_name(),
                    e
                );
                self.emit_event(EngineEvent::ObservationFailed {
                    error: e.to_string(),
                });
                None
            }
        }
    }

    async fn reconcile_with_retry(
        &self,
        previous_ip: Option<Ipv4Addr>,
        new_ip: Ipv4Addr,
    ) -> Result<ReconcileReport> {
        self.emit_event(EngineEvent::ReconcileStarted {
            previous_ip,
            new_ip,
        });

        // Deletes from failed attempts count too
        let mut deleted = Vec::new();
        let mut attempt = 0;
        loop {
            match reconcile_into(
                self.provider.as_ref(),
                &self.hostname,
                previous_ip,
                new_ip,
                &mut deleted,
            )
            .await
            {
                Ok(created) => return Ok(ReconcileReport { deleted, created }),
                Err(e) => {
                    warn!(
                        "Reconcile attempt {} failed for {}: {}",
                        attempt, self.hostname, e
                    );

                    if !e.is_retryable() || attempt >= self.max_retries {
                        self.emit_event(EngineEvent::ReconcileFailed {
                            error: e.to_string(),
                            retry_count: attempt,
                        });
                        return Err(e);
                    }

                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    /// Sleep until the next cycle; `Some(reason)` means stop instead
    async fn wait_for_next_cycle(
        &self,
        shutdown_rx: &mut Option<oneshot::Receiver<()>>,
    ) -> Option<String> {
        let sleep = tokio::time::sleep(self.check_interval);

        match shutdown_rx {
            Some(rx) => tokio::select! {
                _ = sleep => None,
                _ = rx => Some("Shutdown signal".to_string()),
            },
            None => tokio::select! {
                _ = sleep => None,
                _ = tokio::signal::ctrl_c() => Some("Ctrl-C".to_string()),
            },
        }
    }

    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Event receiver dropped");
            }
        }
    }
}
