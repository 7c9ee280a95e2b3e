//! Flow orchestration
//!
//! [`PayFlow`] wraps a [`PaySession`] with the machinery the session itself
//! stays free of: locking, command execution against the node backend, and a
//! broadcast channel for notifications. Route queries and submissions run on
//! spawned tasks and feed their results back in as events, so nothing here
//! ever holds the session lock across an await.

use std::sync::Arc;

use bitcoin::Network;
use parking_lot::Mutex;
use sendflow_common::rates::NoRates;
use sendflow_common::util::unix_time;
use sendflow_common::{
    Balances, CurrencyUnit, NodeBackend, OnchainFeeEstimates, RateProvider, SubmissionRequest,
};
use tokio::sync::broadcast;
use tracing::instrument;

use crate::error::Error;
use crate::events::{Command, Notification, SessionEvent};
use crate::form::FormValues;
use crate::session::{PaySession, SessionContext};

const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Send-payment flow orchestrator
///
/// Clones share the same session, so a host can hand one clone to its UI
/// event loop and another to its balance poller.
#[derive(Clone)]
pub struct PayFlow {
    session: Arc<Mutex<PaySession>>,
    backend: Arc<dyn NodeBackend>,
    rates: Arc<dyn RateProvider>,
    notifications: broadcast::Sender<Notification>,
}

impl std::fmt::Debug for PayFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayFlow")
            .field("session", &self.session.lock())
            .finish_non_exhaustive()
    }
}

impl PayFlow {
    /// New builder
    pub fn builder() -> PayFlowBuilder {
        PayFlowBuilder::new()
    }

    /// Subscribe to session notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Classify the seeded payment request and run auto-advance
    ///
    /// Call once after subscribing so startup notifications are observed.
    pub fn start(&self) {
        let commands = {
            let mut session = self.session.lock();
            session.start(&self.ctx())
        };
        self.execute(commands);
    }

    /// Apply one event to the session and carry out what it asks for
    #[instrument(skip(self, event))]
    pub fn handle(&self, event: SessionEvent) {
        let commands = {
            let mut session = self.session.lock();
            session.apply(event, &self.ctx())
        };
        self.execute(commands);
    }

    /// Clone of the current session state
    pub fn snapshot(&self) -> PaySession {
        self.session.lock().clone()
    }

    /// The payment request field was edited
    pub fn pay_req_changed(&self, raw: impl Into<String>) {
        self.handle(SessionEvent::PayReqChanged(raw.into()));
    }

    /// A payment request arrived from outside the form
    pub fn set_pay_req(&self, raw: impl Into<String>) {
        self.handle(SessionEvent::ExternalPayReq(raw.into()));
    }

    /// The crypto amount field was edited
    pub fn amount_crypto_changed(&self, value: impl Into<String>) {
        self.handle(SessionEvent::AmountCryptoChanged(value.into()));
    }

    /// The fiat amount field was edited
    pub fn amount_fiat_changed(&self, value: impl Into<String>) {
        self.handle(SessionEvent::AmountFiatChanged(value.into()));
    }

    /// A different display unit was selected
    pub fn unit_changed(&self, unit: CurrencyUnit) {
        self.handle(SessionEvent::UnitChanged(unit));
    }

    /// Next or send was pressed
    pub fn submit(&self) {
        self.handle(SessionEvent::SubmitPressed);
    }

    /// Back was pressed
    pub fn go_back(&self) {
        self.handle(SessionEvent::BackPressed);
    }

    /// Push fresh balances into the session
    pub fn balances_updated(&self, balances: Balances) {
        self.handle(SessionEvent::BalancesUpdated(balances));
    }

    /// Push fresh on-chain fee estimates into the session
    pub fn fee_estimates_updated(&self, estimates: OnchainFeeEstimates) {
        self.handle(SessionEvent::FeeEstimatesUpdated(estimates));
    }

    fn ctx(&self) -> SessionContext<'_> {
        SessionContext {
            rates: self.rates.as_ref(),
            now: unix_time(),
        }
    }

    fn execute(&self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Notify(notification) => {
                    // no subscribers is not an error
                    let _ = self.notifications.send(notification);
                }
                Command::QueryRoutes(fingerprint) => {
                    let flow = self.clone();
                    tokio::spawn(async move {
                        let event = match flow
                            .backend
                            .query_routes(fingerprint.payee, fingerprint.amount)
                            .await
                        {
                            Ok(routes) => SessionEvent::RoutesResolved {
                                fingerprint,
                                routes,
                            },
                            Err(err) => SessionEvent::RouteQueryFailed {
                                fingerprint,
                                error: err.to_string(),
                            },
                        };
                        flow.handle(event);
                    });
                }
                Command::Dispatch {
                    generation,
                    request,
                } => {
                    let flow = self.clone();
                    tokio::spawn(async move {
                        let result = match request {
                            SubmissionRequest::Onchain(onchain) => {
                                flow.backend.send_onchain(onchain).await
                            }
                            SubmissionRequest::Lightning(lightning) => {
                                flow.backend.pay_invoice(*lightning).await
                            }
                        };
                        flow.handle(SessionEvent::SubmissionResolved {
                            generation,
                            result: result.map_err(|err| err.to_string()),
                        });
                    });
                }
            }
        }
    }
}

/// Builder for creating a new [`PayFlow`]
pub struct PayFlowBuilder {
    network: Network,
    unit: CurrencyUnit,
    fiat_unit: CurrencyUnit,
    backend: Option<Arc<dyn NodeBackend>>,
    rates: Option<Arc<dyn RateProvider>>,
    pay_req: Option<String>,
    amount_crypto: Option<String>,
    amount_fiat: Option<String>,
    channel_capacity: usize,
}

impl std::fmt::Debug for PayFlowBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayFlowBuilder")
            .field("network", &self.network)
            .field("unit", &self.unit)
            .field("fiat_unit", &self.fiat_unit)
            .field("pay_req", &self.pay_req)
            .finish_non_exhaustive()
    }
}

impl Default for PayFlowBuilder {
    fn default() -> Self {
        Self {
            network: Network::Bitcoin,
            unit: CurrencyUnit::Sat,
            fiat_unit: CurrencyUnit::Usd,
            backend: None,
            rates: None,
            pay_req: None,
            amount_crypto: None,
            amount_fiat: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl PayFlowBuilder {
    /// Create a new PayFlowBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the network payment requests are validated against
    pub fn network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    /// Set the crypto display unit
    pub fn unit(mut self, unit: CurrencyUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Set the fiat unit
    pub fn fiat_unit(mut self, fiat_unit: CurrencyUnit) -> Self {
        self.fiat_unit = fiat_unit;
        self
    }

    /// Set the node backend
    pub fn backend<N: NodeBackend + 'static>(mut self, backend: N) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Set the node backend from Arc
    pub fn shared_backend(mut self, backend: Arc<dyn NodeBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the fiat rate provider
    pub fn rates<R: RateProvider + 'static>(mut self, rates: R) -> Self {
        self.rates = Some(Arc::new(rates));
        self
    }

    /// Seed the payment request, classified when the flow starts
    pub fn pay_req(mut self, pay_req: impl Into<String>) -> Self {
        self.pay_req = Some(pay_req.into());
        self
    }

    /// Seed the crypto amount field
    pub fn amount_crypto(mut self, value: impl Into<String>) -> Self {
        self.amount_crypto = Some(value.into());
        self
    }

    /// Seed the fiat amount field
    pub fn amount_fiat(mut self, value: impl Into<String>) -> Self {
        self.amount_fiat = Some(value.into());
        self
    }

    /// Set the notification channel capacity
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Build the flow
    pub fn build(self) -> Result<PayFlow, Error> {
        let backend = self.backend.ok_or(Error::BackendRequired)?;
        let rates = self.rates.unwrap_or_else(|| Arc::new(NoRates));

        let form = FormValues {
            pay_req: self.pay_req.unwrap_or_default(),
            amount_crypto: self.amount_crypto.unwrap_or_default(),
            amount_fiat: self.amount_fiat.unwrap_or_default(),
            unit: self.unit,
            fiat_unit: self.fiat_unit,
            ..Default::default()
        };

        let (notifications, _) = broadcast::channel(self.channel_capacity);

        Ok(PayFlow {
            session: Arc::new(Mutex::new(PaySession::new(self.network, form))),
            backend,
            rates,
            notifications,
        })
    }
}
