//! Wizard session
//!
//! [`PaySession`] holds everything one send-payment attempt accumulates and
//! advances by applying [`SessionEvent`]s. Applying an event mutates the
//! session and returns the [`Command`]s the orchestrator must carry out, so
//! every behavior is reachable from a synchronous test.

use bitcoin::Network;
use sendflow_common::rates::RateProvider;
use sendflow_common::{
    Amount, Balances, CurrencyUnit, LightningSubmission, OnchainFeeEstimates, OnchainSubmission,
    Route, SubmissionOutcome, SubmissionRequest,
};
use serde::Serialize;

use crate::balance::has_sufficient_funds;
use crate::classify::{classify, Classification};
use crate::events::{BlockedReason, Command, Notification, RouteFingerprint, SessionEvent};
use crate::fees;
use crate::form::{FormField, FormValues};
use crate::resolve;
use crate::wizard::{steps, WizardState, WizardStep};

/// Ambient inputs consulted while applying an event
pub struct SessionContext<'a> {
    /// Fiat price source for amount resolution
    pub rates: &'a dyn RateProvider,
    /// Current unix time in seconds, injected so expiry is testable
    pub now: u64,
}

impl std::fmt::Debug for SessionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("now", &self.now)
            .finish()
    }
}

/// One send-payment wizard session
#[derive(Debug, Clone, Serialize)]
pub struct PaySession {
    network: Network,
    classification: Classification,
    wizard: WizardState,
    form: FormValues,
    routes: Option<Vec<Route>>,
    active_fingerprint: Option<RouteFingerprint>,
    balances: Balances,
    fee_estimates: Option<OnchainFeeEstimates>,
    generation: u64,
    in_flight: Option<u64>,
}

impl PaySession {
    /// New session on `network`, seeded with `form`
    ///
    /// Seeded values are not classified until [`PaySession::start`] runs.
    pub fn new(network: Network, form: FormValues) -> Self {
        Self {
            network,
            classification: Classification::Unclassified,
            wizard: WizardState::default(),
            form,
            routes: None,
            active_fingerprint: None,
            balances: Balances::default(),
            fee_estimates: None,
            generation: 0,
            in_flight: None,
        }
    }

    /// Classify whatever the form was seeded with and run auto-advance
    ///
    /// A session seeded without a payment request stays parked at the
    /// address step.
    pub fn start(&mut self, ctx: &SessionContext<'_>) -> Vec<Command> {
        if self.form.pay_req.trim().is_empty() {
            return Vec::new();
        }
        self.reclassify(ctx)
    }

    /// Apply one event, returning the commands it produced
    pub fn apply(&mut self, event: SessionEvent, ctx: &SessionContext<'_>) -> Vec<Command> {
        match event {
            SessionEvent::PayReqChanged(raw) => self.handle_pay_req(raw, false, ctx),
            SessionEvent::ExternalPayReq(raw) => self.handle_pay_req(raw, true, ctx),
            SessionEvent::AmountCryptoChanged(value) => {
                self.form.amount_crypto = value;
                self.form.touch(FormField::AmountCrypto);
                self.after_amount_change(ctx)
            }
            SessionEvent::AmountFiatChanged(value) => {
                self.form.amount_fiat = value;
                self.form.touch(FormField::AmountFiat);
                self.after_amount_change(ctx)
            }
            SessionEvent::UnitChanged(unit) => self.handle_unit_changed(unit, ctx),
            SessionEvent::SubmitPressed => self.handle_submit(ctx),
            SessionEvent::BackPressed => self.handle_back(),
            SessionEvent::RoutesResolved {
                fingerprint,
                routes,
            } => self.handle_routes_resolved(fingerprint, routes),
            SessionEvent::RouteQueryFailed { fingerprint, error } => {
                self.handle_route_query_failed(fingerprint, error)
            }
            SessionEvent::SubmissionResolved { generation, result } => {
                self.handle_submission_resolved(generation, result)
            }
            SessionEvent::BalancesUpdated(balances) => {
                self.balances = balances;
                Vec::new()
            }
            SessionEvent::FeeEstimatesUpdated(estimates) => {
                self.fee_estimates = Some(estimates);
                Vec::new()
            }
        }
    }

    /// Network the session validates against
    pub fn network(&self) -> Network {
        self.network
    }

    /// Current classification of the payment request
    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    /// Current wizard position
    pub fn wizard(&self) -> WizardState {
        self.wizard
    }

    /// Current form values
    pub fn form(&self) -> &FormValues {
        &self.form
    }

    /// Candidate routes for the active fingerprint, once resolved
    pub fn routes(&self) -> Option<&[Route]> {
        self.routes.as_deref()
    }

    /// Cheapest and costliest candidate route fee
    pub fn fee_bounds(&self) -> Option<(Amount, Amount)> {
        self.routes.as_deref().and_then(fees::fee_bounds)
    }

    /// Last observed balances
    pub fn balances(&self) -> Balances {
        self.balances
    }

    /// Last observed on-chain fee estimates
    pub fn fee_estimates(&self) -> Option<OnchainFeeEstimates> {
        self.fee_estimates
    }

    /// Generation stamped on the most recent dispatch
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a submission is currently in flight
    pub fn submission_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Amount the session would submit right now, in satoshis
    pub fn effective_amount(&self, rates: &dyn RateProvider) -> Option<Amount> {
        resolve::effective_amount(&self.classification, &self.form, rates)
    }

    fn handle_pay_req(
        &mut self,
        raw: String,
        external: bool,
        ctx: &SessionContext<'_>,
    ) -> Vec<Command> {
        if external {
            // only a new request resets the session
            if raw == self.form.pay_req {
                return Vec::new();
            }
            self.form.reset(raw);
        } else {
            self.form.pay_req = raw;
            self.form.touch(FormField::PayReq);
        }
        self.reclassify(ctx)
    }

    /// Recompute the classification and restart the wizard walk
    ///
    /// An in-flight submission keeps running at the node, but its result no
    /// longer belongs to this session and will be dropped as stale.
    fn reclassify(&mut self, ctx: &SessionContext<'_>) -> Vec<Command> {
        let mut commands = Vec::new();
        let previous = std::mem::take(&mut self.classification);
        self.classification = classify(&self.form.pay_req, self.network);
        self.in_flight = None;

        if self.wizard.current != WizardStep::Address {
            let from = self.wizard.current;
            self.wizard.reset();
            // re-entering the address step forgets stale validation markers
            self.form.clear_touched();
            commands.push(step_changed(Some(from), WizardStep::Address));
        }

        if self.classification != previous {
            commands.push(Command::Notify(Notification::ClassificationChanged(
                self.classification.clone(),
            )));
        }

        self.sync_route_query(ctx, &mut commands);

        let newly_onchain = self.classification.is_onchain() && !previous.is_onchain();
        let newly_decoded = match (self.classification.invoice(), previous.invoice()) {
            (Some(new), Some(old)) => new.payment_hash != old.payment_hash,
            (Some(_), None) => true,
            _ => false,
        };
        if newly_onchain || newly_decoded {
            commands.extend(self.handle_submit(ctx));
        }

        commands
    }

    fn handle_unit_changed(
        &mut self,
        unit: CurrencyUnit,
        ctx: &SessionContext<'_>,
    ) -> Vec<Command> {
        if unit.is_fiat() {
            self.form.fiat_unit = unit;
        } else {
            self.form.unit = unit;
        }
        self.after_amount_change(ctx)
    }

    fn after_amount_change(&mut self, ctx: &SessionContext<'_>) -> Vec<Command> {
        let mut commands = Vec::new();
        self.sync_route_query(ctx, &mut commands);
        commands
    }

    /// Re-key the route query to the current (payee, amount) pair
    ///
    /// No-op while the pair is unchanged. When it changes, routes quoted for
    /// the previous pair are dropped and a fresh query is issued; when it
    /// becomes unresolvable, routes are dropped without a query.
    fn sync_route_query(&mut self, ctx: &SessionContext<'_>, commands: &mut Vec<Command>) {
        let fingerprint = match &self.classification {
            Classification::Lightning(invoice) => {
                resolve::effective_amount(&self.classification, &self.form, ctx.rates).map(
                    |amount| RouteFingerprint {
                        payee: invoice.payee,
                        amount,
                    },
                )
            }
            _ => None,
        };

        if self.active_fingerprint == fingerprint {
            return;
        }
        self.active_fingerprint = fingerprint;
        self.set_routes(None, commands);
        if let Some(fingerprint) = fingerprint {
            commands.push(Command::QueryRoutes(fingerprint));
        }
    }

    fn set_routes(&mut self, routes: Option<Vec<Route>>, commands: &mut Vec<Command>) {
        let old_bounds = self.fee_bounds();
        self.routes = routes;
        let new_bounds = self.fee_bounds();
        if old_bounds != new_bounds {
            let (min, max) = match new_bounds {
                Some((min, max)) => (Some(min), Some(max)),
                None => (None, None),
            };
            commands.push(Command::Notify(Notification::FeeBoundsUpdated { min, max }));
        }
    }

    /// Advance the wizard, or dispatch when already at the summary step
    fn handle_submit(&mut self, ctx: &SessionContext<'_>) -> Vec<Command> {
        let steps = steps(&self.classification);
        if self.wizard.current != WizardStep::Summary {
            let from = self.wizard.current;
            if self.wizard.next(steps) {
                return vec![step_changed(Some(from), self.wizard.current)];
            }
            return Vec::new();
        }

        if self.in_flight.is_some() {
            return vec![blocked(BlockedReason::SubmissionInFlight)];
        }

        let request = match &self.classification {
            Classification::Onchain(address) => {
                let Some(amount) = resolve::form_amount(&self.form, ctx.rates) else {
                    return vec![blocked(BlockedReason::AmountUnresolved)];
                };
                if !has_sufficient_funds(&self.classification, Some(amount), &self.balances) {
                    return vec![blocked(BlockedReason::InsufficientFunds)];
                }
                SubmissionRequest::Onchain(OnchainSubmission {
                    address: address.clone(),
                    amount,
                    unit: self.form.unit,
                    sat_per_vbyte: self.fee_estimates.map(|estimates| estimates.fastest),
                })
            }
            Classification::Lightning(invoice) => {
                if invoice.is_expired(ctx.now) {
                    return vec![blocked(BlockedReason::InvoiceExpired)];
                }
                let Some(amount) =
                    resolve::effective_amount(&self.classification, &self.form, ctx.rates)
                else {
                    return vec![blocked(BlockedReason::AmountUnresolved)];
                };
                if !has_sufficient_funds(&self.classification, Some(amount), &self.balances) {
                    return vec![blocked(BlockedReason::InsufficientFunds)];
                }
                SubmissionRequest::Lightning(Box::new(LightningSubmission {
                    invoice: invoice.invoice.clone(),
                    // an amount-fixed invoice already names its amount
                    amount: (!invoice.amount_fixed()).then_some(amount),
                    unit: self.form.unit,
                    fee_limit: fees::fee_limit(self.routes.as_deref().unwrap_or_default()),
                }))
            }
            Classification::Unclassified | Classification::Invalid => {
                tracing::warn!("Ignoring submit without a classified payment request");
                return Vec::new();
            }
        };

        self.generation += 1;
        self.in_flight = Some(self.generation);
        vec![
            Command::Dispatch {
                generation: self.generation,
                request: request.clone(),
            },
            Command::Notify(Notification::SubmissionDispatched {
                generation: self.generation,
                request,
            }),
        ]
    }

    fn handle_back(&mut self) -> Vec<Command> {
        let steps = steps(&self.classification);
        let from = self.wizard.current;
        if !self.wizard.back(steps) {
            return Vec::new();
        }
        if self.wizard.current == WizardStep::Address {
            self.form.clear_touched();
        }
        vec![step_changed(Some(from), self.wizard.current)]
    }

    fn handle_routes_resolved(
        &mut self,
        fingerprint: RouteFingerprint,
        routes: Vec<Route>,
    ) -> Vec<Command> {
        if self.active_fingerprint != Some(fingerprint) {
            tracing::warn!(amount = %fingerprint.amount, "Discarding stale route result");
            return Vec::new();
        }
        let mut commands = Vec::new();
        self.set_routes(Some(routes), &mut commands);
        commands
    }

    fn handle_route_query_failed(
        &mut self,
        fingerprint: RouteFingerprint,
        error: String,
    ) -> Vec<Command> {
        if self.active_fingerprint != Some(fingerprint) {
            tracing::debug!("Ignoring stale route query failure: {}", error);
            return Vec::new();
        }
        tracing::warn!(amount = %fingerprint.amount, "Route query failed: {}", error);
        let mut commands = Vec::new();
        self.set_routes(None, &mut commands);
        commands
    }

    fn handle_submission_resolved(
        &mut self,
        generation: u64,
        result: Result<SubmissionOutcome, String>,
    ) -> Vec<Command> {
        if self.in_flight != Some(generation) {
            tracing::warn!(generation, "Discarding stale submission result");
            return Vec::new();
        }
        self.in_flight = None;

        match result {
            Ok(outcome) => vec![Command::Notify(Notification::SubmissionSucceeded {
                generation,
                outcome,
            })],
            Err(error) => {
                tracing::warn!(generation, "Submission failed: {}", error);
                vec![Command::Notify(Notification::SubmissionFailed {
                    generation,
                    error,
                })]
            }
        }
    }
}

fn step_changed(previous: Option<WizardStep>, current: WizardStep) -> Command {
    Command::Notify(Notification::StepChanged { previous, current })
}

fn blocked(reason: BlockedReason) -> Command {
    Command::Notify(Notification::SubmissionBlocked(reason))
}
