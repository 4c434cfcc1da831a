//! Application wiring and the quoting loop.
//!
//! The quoting loop owns every piece of mutable trading state: the local
//! book, the volatility window, gamma, and inventory. Feed events, fill
//! notifications, and the quote timer are multiplexed onto it through one
//! `select!`, so state never needs a lock. Collaborators (replay feed,
//! tracker actor, gateway) run beside it and talk over channels.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use dmm_core::{InstrumentSpec, OrderId, Price, Qty, Side};
use dmm_feed::{FeedCommand, FeedError, FeedEvent, OrderBook};
use dmm_oms::{
    spawn_tracker, DynOrderGateway, FillEvent, Order, PaperGateway, SubmitRequest, TrackerHandle,
};
use dmm_quote::{
    compute_quotes, GammaController, InventoryManager, QuoteConfig, QuoteInputs, VolatilityWindow,
};
use dmm_telemetry::Metrics;

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::replay::ReplayFeed;

fn side_label(side: Side) -> &'static str {
    match side {
        Side::Buy => "buy",
        Side::Sell => "sell",
    }
}

fn to_metric(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// The quoting loop: consumes the ordered feed, refreshes quotes on a
/// timer or on mid drift, and reacts to fills.
pub struct QuotingLoop {
    spec: InstrumentSpec,
    quote_config: QuoteConfig,
    book: OrderBook,
    window: VolatilityWindow,
    gamma: GammaController,
    inventory: InventoryManager,
    gateway: DynOrderGateway,
    tracker: TrackerHandle,
    commands: mpsc::Sender<FeedCommand>,
    /// Last volatility sample, fed to the pricing model and checked
    /// against the gating bands.
    last_volatility: Option<f64>,
    /// Set after a gap until the replacement snapshot lands. Diffs
    /// arriving in between are dropped without re-requesting.
    resnapshot_pending: bool,
    live_bid: Option<OrderId>,
    live_ask: Option<OrderId>,
    last_quote_mid: Option<Price>,
    last_quote_at: Option<Instant>,
    cycles: u64,
}

impl QuotingLoop {
    pub fn new(
        config: &AppConfig,
        gateway: DynOrderGateway,
        tracker: TrackerHandle,
        commands: mpsc::Sender<FeedCommand>,
    ) -> Self {
        Self {
            spec: config.instrument.clone(),
            quote_config: config.quote.clone(),
            book: OrderBook::new(),
            window: VolatilityWindow::new(config.quote.vol_window_capacity),
            gamma: GammaController::new(config.quote.gamma, &config.quote.adaptive_gamma),
            inventory: InventoryManager::new(config.quote.max_position),
            gateway,
            tracker,
            commands,
            last_volatility: None,
            resnapshot_pending: false,
            live_bid: None,
            live_ask: None,
            last_quote_mid: None,
            last_quote_at: None,
            cycles: 0,
        }
    }

    /// Drive the loop until the feed closes or shutdown is requested,
    /// then cancel all resting orders.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<FeedEvent>,
        mut fills: mpsc::Receiver<FillEvent>,
        shutdown: CancellationToken,
    ) -> AppResult<()> {
        let mut quote_timer =
            tokio::time::interval(Duration::from_millis(self.quote_config.quote_interval_ms));

        info!(
            instrument = %self.spec.name,
            interval_ms = self.quote_config.quote_interval_ms,
            "Entering quoting loop"
        );

        loop {
            tokio::select! {
                maybe_event = events.recv() => {
                    match maybe_event {
                        Some(event) => {
                            if let Err(e) = self.handle_event(event).await {
                                warn!(?e, "Feed event error");
                            }
                        }
                        None => {
                            info!("Feed closed");
                            break;
                        }
                    }
                }

                Some(fill) = fills.recv() => {
                    self.handle_fill(fill).await;
                }

                _ = quote_timer.tick() => {
                    self.quote_cycle().await;
                }

                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        // Cancel-all runs to completion even on a cancelled run.
        self.cancel_all_and_report().await;
        Ok(())
    }

    /// Apply one feed event in arrival order.
    pub async fn handle_event(&mut self, event: FeedEvent) -> AppResult<()> {
        match event {
            FeedEvent::Snapshot {
                sequence_id,
                bids,
                asks,
            } => {
                self.book.apply_snapshot(&bids, &asks, sequence_id);
                self.resnapshot_pending = false;
                let (bid_depth, ask_depth) = self.book.depth();
                debug!(sequence_id, bid_depth, ask_depth, "Snapshot applied");
            }

            FeedEvent::Diff {
                prev_sequence_id,
                sequence_id,
                bid_ops,
                ask_ops,
            } => match self
                .book
                .apply_diff(prev_sequence_id, sequence_id, &bid_ops, &ask_ops)
            {
                Ok(()) => {
                    self.maybe_requote_on_drift().await;
                }
                Err(FeedError::SequenceGap { expected, got }) => {
                    if self.resnapshot_pending {
                        trace!(?expected, got, "Diff dropped while awaiting snapshot");
                    } else {
                        warn!(?expected, got, "Sequence gap, requesting snapshot");
                        Metrics::sequence_gap();
                        self.request_resnapshot().await;
                    }
                }
                Err(e) => return Err(e.into()),
            },

            FeedEvent::Volatility {
                value,
                timestamp_ms,
                index_name,
            } => {
                self.window.push(value);
                self.gamma.observe(value, &self.window);
                self.last_volatility = Some(value);
                Metrics::volatility(&index_name, value);
                Metrics::effective_gamma(self.gamma.current());
                trace!(value, timestamp_ms, index = %index_name, "Volatility sample");
            }

            FeedEvent::OrderUpdate(update) => {
                trace!(id = %update.order_id, status = %update.status, "Order update");
                self.tracker
                    .update_order(update.order_id, update.status, update.filled_quantity)
                    .await;
            }
        }
        Ok(())
    }

    /// One quote refresh: validate the book, check the volatility gate,
    /// price, then cancel-and-replace both sides.
    pub async fn quote_cycle(&mut self) {
        self.cycles += 1;

        if self.book.is_stale() {
            debug!("Skipping cycle: book is stale");
            Metrics::quote_cycle("stale_book");
            return;
        }
        let (bid_level, ask_level) = match (self.book.best_bid(), self.book.best_ask()) {
            (Some(bid), Some(ask)) => (bid, ask),
            _ => {
                debug!("Skipping cycle: book has an empty side");
                Metrics::quote_cycle("no_liquidity");
                return;
            }
        };

        let sigma = match self.volatility_gate() {
            Some(sigma) => sigma,
            None => {
                Metrics::quote_cycle("gated");
                return;
            }
        };

        let inputs = QuoteInputs {
            best_bid: bid_level.price,
            best_ask: ask_level.price,
            imbalance: self.book.imbalance(),
            inventory: self.inventory.net_position(&self.spec.name),
            sigma,
        };
        let gamma = self.gamma.current();
        let decision = match compute_quotes(&inputs, &self.quote_config, gamma, self.spec.tick_size)
        {
            Ok(decision) => decision,
            Err(e) => {
                warn!(?e, "Quote computation failed, skipping cycle");
                Metrics::quote_cycle("error");
                return;
            }
        };

        self.cancel_live_quotes().await;

        let qty = self.spec.round_qty(Qty::new(self.quote_config.order_qty));
        if !self.spec.meets_min_qty(qty) {
            warn!(%qty, "Configured order quantity is below the instrument minimum");
            Metrics::quote_cycle("error");
            return;
        }

        let mut placed = 0u32;
        let mut capped = 0u32;

        if self.inventory.would_exceed_max(&self.spec.name, Side::Buy, qty) {
            debug!("Buy side capped by max position");
            capped += 1;
        } else if self.place_quote(Side::Buy, decision.optimal_bid, qty).await {
            placed += 1;
        }

        if self.inventory.would_exceed_max(&self.spec.name, Side::Sell, qty) {
            debug!("Sell side capped by max position");
            capped += 1;
        } else if self.place_quote(Side::Sell, decision.optimal_ask, qty).await {
            placed += 1;
        }

        if placed > 0 {
            self.last_quote_mid = Some(decision.mid_price);
            self.last_quote_at = Some(Instant::now());
            Metrics::quote_cycle("quoted");
            Metrics::mid_price(&self.spec.name, to_metric(decision.mid_price.inner()));
            Metrics::quoted_spread(
                &self.spec.name,
                to_metric((decision.optimal_ask - decision.optimal_bid).inner()),
            );
            Metrics::open_orders_set(self.tracker.live_order_count() as i64);
            info!(
                cycle = self.cycles,
                bid = %decision.optimal_bid,
                ask = %decision.optimal_ask,
                mid = %decision.mid_price,
                sigma,
                gamma,
                "Quotes placed"
            );
        } else if capped == 2 {
            debug!("Both sides capped by max position");
            Metrics::quote_cycle("position_cap");
        } else {
            Metrics::quote_cycle("error");
        }
    }

    /// Volatility regime check. Quoting is allowed only once the rolling
    /// window has formed Bollinger bands and the latest sample sits inside
    /// them.
    fn volatility_gate(&self) -> Option<f64> {
        let sigma = match self.last_volatility {
            Some(sigma) => sigma,
            None => {
                debug!("Skipping cycle: no volatility sample yet");
                return None;
            }
        };
        let bands = match self.window.bollinger_bands(
            self.quote_config.bollinger_period,
            self.quote_config.bollinger_num_std,
        ) {
            Some(bands) => bands,
            None => {
                debug!(
                    samples = self.window.len(),
                    period = self.quote_config.bollinger_period,
                    "Skipping cycle: volatility window still warming up"
                );
                return None;
            }
        };
        if !bands.contains(sigma) {
            debug!(
                sigma,
                lower = bands.lower,
                upper = bands.upper,
                "Skipping cycle: volatility outside gating bands"
            );
            return None;
        }
        Some(sigma)
    }

    /// Re-quote early when the mid has drifted away from the last quoted
    /// mid, subject to the minimum re-quote interval.
    async fn maybe_requote_on_drift(&mut self) {
        if self.quote_config.requote_drift_bps <= Decimal::ZERO {
            return;
        }
        let last_mid = match self.last_quote_mid {
            Some(mid) => mid,
            None => return,
        };
        let mid = match self.book.mid_price() {
            Some(mid) => mid,
            None => return,
        };
        let drift = match mid.bps_from(last_mid) {
            Some(drift) => drift.abs(),
            None => return,
        };
        if drift < self.quote_config.requote_drift_bps {
            return;
        }
        if let Some(at) = self.last_quote_at {
            let min_interval = Duration::from_millis(self.quote_config.min_requote_interval_ms);
            if at.elapsed() < min_interval {
                trace!(%drift, "Drift past threshold inside the minimum re-quote interval");
                return;
            }
        }
        debug!(%drift, %mid, %last_mid, "Mid drifted past threshold, re-quoting");
        self.quote_cycle().await;
    }

    /// Cancel the previous cycle's resting quotes. The tracker forgets them
    /// immediately; a fill racing the cancel surfaces later as an
    /// untracked-order update, which the tracker tolerates.
    async fn cancel_live_quotes(&mut self) {
        for id in [self.live_bid.take(), self.live_ask.take()]
            .into_iter()
            .flatten()
        {
            match self.gateway.cancel(id.clone()).await {
                Ok(()) => Metrics::order_cancelled(),
                Err(e) => warn!(%id, ?e, "Cancel failed"),
            }
            self.tracker.remove_order(id).await;
        }
    }

    async fn place_quote(&mut self, side: Side, price: Price, qty: Qty) -> bool {
        let price = self.spec.round_price(price);
        if !price.is_positive() {
            warn!(?side, %price, "Refusing non-positive quote price");
            return false;
        }
        let request = SubmitRequest::limit(self.spec.name.clone(), side, qty, price);
        match self.gateway.submit(request).await {
            Ok(handle) => {
                let order =
                    Order::new_pending(handle.id.clone(), self.spec.name.clone(), side, price, qty);
                self.tracker.add_order(order).await;
                match side {
                    Side::Buy => self.live_bid = Some(handle.id),
                    Side::Sell => self.live_ask = Some(handle.id),
                }
                Metrics::quote_placed(side_label(side));
                true
            }
            Err(e) => {
                warn!(?side, %price, ?e, "Quote submission failed");
                false
            }
        }
    }

    /// React to one of our orders filling: update inventory, free the quote
    /// slot, and flatten if the position ran past the threshold.
    pub async fn handle_fill(&mut self, fill: FillEvent) {
        info!(
            id = %fill.order_id,
            instrument = %fill.instrument,
            side = ?fill.side,
            price = %fill.price,
            qty = %fill.quantity,
            "Order filled"
        );
        Metrics::order_filled(side_label(fill.side));

        if self.live_bid.as_ref() == Some(&fill.order_id) {
            self.live_bid = None;
        }
        if self.live_ask.as_ref() == Some(&fill.order_id) {
            self.live_ask = None;
        }

        self.inventory
            .record_fill(&fill.instrument, fill.side, fill.price, fill.quantity);

        let net = self.inventory.net_position(&fill.instrument);
        Metrics::net_position(&fill.instrument, to_metric(net.inner()));
        if let Some(inv) = self.inventory.get(&fill.instrument) {
            Metrics::realized_pnl(&fill.instrument, to_metric(inv.realized_pnl));
        }
        Metrics::open_orders_set(self.tracker.live_order_count() as i64);
        debug!(
            net = %net,
            ratio = %self.inventory.inventory_ratio(&fill.instrument),
            "Inventory updated"
        );

        let threshold = Qty::new(self.quote_config.flatten_threshold);
        if let Some((side, qty)) = self.inventory.flatten_order(&fill.instrument, threshold) {
            info!(?side, %qty, net = %net, "Inventory past flatten threshold");
            self.submit_flatten(side, qty).await;
        }
    }

    /// Submit a reduce-only order priced inside the touch, so it fills fast
    /// without paying the full spread.
    async fn submit_flatten(&mut self, side: Side, qty: Qty) {
        let offset = self.spec.tick_size * Decimal::from(self.quote_config.flatten_offset_ticks);
        let touch = match side {
            // Selling down a long undercuts the ask; buying back a short
            // sits over the bid.
            Side::Sell => self.book.best_ask().map(|level| level.price - offset),
            Side::Buy => self.book.best_bid().map(|level| level.price + offset),
        };
        let price = match touch {
            Some(price) if price.is_positive() => self.spec.round_price(price),
            _ => {
                warn!(?side, "No touch to price a flatten order against");
                return;
            }
        };

        // Lot rounding can leave a residual below one lot; it is flattened
        // the next time the threshold trips.
        let qty = self.spec.round_qty(qty);
        if !self.spec.meets_min_qty(qty) {
            debug!(%qty, "Flatten quantity below instrument minimum, deferring");
            return;
        }

        let request =
            SubmitRequest::limit(self.spec.name.clone(), side, qty, price).with_reduce_only();
        match self.gateway.submit(request).await {
            Ok(handle) => {
                info!(id = %handle.id, ?side, %price, %qty, "Flatten order submitted");
                Metrics::flatten_order();
                let order =
                    Order::new_pending(handle.id, self.spec.name.clone(), side, price, qty);
                self.tracker.add_order(order).await;
            }
            Err(e) => error!(?side, ?e, "Flatten submission failed"),
        }
    }

    async fn request_resnapshot(&mut self) {
        self.resnapshot_pending = true;
        Metrics::resnapshot_requested();
        let command = FeedCommand::Resnapshot {
            instrument: self.spec.name.clone(),
        };
        if self.commands.send(command).await.is_err() {
            warn!("Feed command channel closed");
        }
    }

    async fn cancel_all_and_report(&mut self) {
        info!("Cancelling all open orders");
        if let Err(e) = self.gateway.cancel_all(Some(self.spec.name.clone())).await {
            error!(?e, "Cancel-all failed during shutdown");
        }
        let open = self.tracker.pending_orders().await.len();
        info!(
            cycles = self.cycles,
            open_orders = open,
            net_position = %self.inventory.net_position(&self.spec.name),
            realized_pnl = %self.inventory.total_realized_pnl(),
            "Quoting loop stopped"
        );
    }
}

/// Owns configuration and wires the collaborators together.
pub struct Application {
    config: AppConfig,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub async fn run(self) -> AppResult<()> {
        info!(instrument = %self.config.instrument.name, "Starting application");

        let (event_tx, event_rx) = mpsc::channel(self.config.feed.channel_capacity);
        let (command_tx, command_rx) = mpsc::channel(16);

        let feed = ReplayFeed::new(
            self.config.feed.replay_path.clone(),
            self.config.feed.replay_delay_ms,
        );
        let feed_handle = tokio::spawn(async move {
            if let Err(e) = feed.run(event_tx, command_rx).await {
                error!(?e, "Replay feed failed");
            }
        });

        let (tracker, fills_rx, tracker_join) = spawn_tracker(self.config.feed.channel_capacity);
        let gateway: DynOrderGateway = Arc::new(PaperGateway::new());

        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                signal_token.cancel();
            }
        });

        let quoting = QuotingLoop::new(&self.config, gateway, tracker.clone(), command_tx);
        quoting.run(event_rx, fills_rx, shutdown).await?;

        // Cleanup
        tracker.shutdown().await;
        let _ = tracker_join.await;
        feed_handle.abort();

        Ok(())
    }
}
