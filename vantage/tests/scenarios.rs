//! End-to-end grid-engine scenarios: idempotent placement, crash recovery
//! against a ghost fill, and a circuit breaker cutting off new buy-side
//! placements. Each drives a [`GridEngine`] directly against a
//! [`SimulatedExchange`] rather than through the gateway/orchestrator layer,
//! mirroring how `vantage-engine`'s own `engine.rs` tests are scoped.
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use vantage_engine::{GridEngine, SlotAction, Store};
use vantage_execution::account::AssetBalance;
use vantage_execution::exchange::Exchange;
use vantage_execution::id::{ClientOrderId, OrderId};
use vantage_execution::request::OrderKey;
use vantage_execution::simulated::{SimulatedConfig, SimulatedExchange};
use vantage_execution::state::{Cancelled, Open};
use vantage_execution::{Order, OrderState, StrategyId};
use vantage_instrument::{exchange::ExchangeId, OrderType, Side, Symbol, SymbolInfo, TimeInForce};
use vantage_risk::{CircuitBreaker, RiskConfig, TripReason};
use vantage_strategy::{GridConfig, GridStrategy, Regime, SkewMode, TrendConfig};

const SYMBOL: &str = "BTCUSDT";

fn venue_config() -> SimulatedConfig {
    SimulatedConfig::single_symbol(
        ExchangeId::Simulated,
        SymbolInfo::new(Symbol::from(SYMBOL), "BTC".into(), "USDT".into(), 2, 6, dec!(0.0001), Decimal::ONE),
        AssetBalance::new("USDT".into(), dec!(1_000_000), Decimal::ZERO),
    )
}

/// Two levels a side, untapered quantity, no skew and no volatility
/// scaling, so a tick at a fixed price always produces the same four
/// levels: buys at 39,900/39,800, sells at 40,100/40,200.
fn grid_config() -> GridConfig {
    GridConfig {
        base_interval: dec!(100),
        levels: 2,
        base_qty: dec!(1),
        qty_taper: dec!(1),
        skew_mode: SkewMode::Multiplicative,
        skew_factor: Decimal::ZERO,
        max_inventory_qty: dec!(10),
        atr_period: 14,
        volatility_scale: vantage_risk::VolatilityScaler::new(dec!(1), dec!(1), dec!(2)),
        off_windows: Vec::new(),
        trend: vantage_strategy::TrendConfig::default(),
    }
}

#[tokio::test]
async fn idempotent_ticks_place_each_grid_level_exactly_once() {
    let store = Store::open_in_memory().unwrap();
    let exchange = SimulatedExchange::new(venue_config());
    let symbol = Symbol::from(SYMBOL);
    let symbol_info = exchange.get_symbol_info(&symbol).await.unwrap();

    let mut engine = GridEngine::new(
        exchange.clone(),
        store,
        symbol.clone(),
        symbol_info,
        StrategyId::new("grid-test"),
        GridStrategy::new(grid_config()),
        CircuitBreaker::new(RiskConfig::default()),
    )
    .unwrap();
    engine.ensure_slot_capacity(4, 0).unwrap();

    let first = engine.on_price_update(dec!(40_000), dec!(40_000), dec!(40_000), Decimal::ZERO, 0, 0).await.unwrap();
    assert_eq!(first.len(), 4);
    assert_eq!(exchange.get_open_orders(&symbol).await.unwrap().len(), 4);

    // Same inputs, same tick: every level is already resting, so nothing
    // should be re-placed — a second identical placement attempt must not
    // create a duplicate on the venue.
    let second = engine.on_price_update(dec!(40_000), dec!(40_000), dec!(40_000), Decimal::ZERO, 0, 1).await.unwrap();
    assert!(second.is_empty(), "an unchanged target must not re-place already-resting levels");
    assert_eq!(exchange.get_open_orders(&symbol).await.unwrap().len(), 4);
}

#[tokio::test]
async fn a_fill_missed_during_a_crash_is_reconciled_on_recovery() {
    let store = Store::open_in_memory().unwrap();
    let exchange = SimulatedExchange::new(venue_config());
    let symbol = Symbol::from(SYMBOL);
    let symbol_info = exchange.get_symbol_info(&symbol).await.unwrap();
    let strategy_id = StrategyId::new("grid-test");

    {
        // Engine A places the grid, then "crashes" (is dropped) before it
        // ever sees the fill below — nothing in this scope persists beyond
        // the slot table already written to `store`.
        let mut engine_a = GridEngine::new(
            exchange.clone(),
            store.clone(),
            symbol.clone(),
            symbol_info.clone(),
            strategy_id.clone(),
            GridStrategy::new(grid_config()),
            CircuitBreaker::new(RiskConfig::default()),
        )
        .unwrap();
        engine_a.ensure_slot_capacity(4, 0).unwrap();
        let actions = engine_a.on_price_update(dec!(40_000), dec!(40_000), dec!(40_000), Decimal::ZERO, 0, 0).await.unwrap();
        assert_eq!(actions.len(), 4);
    }

    // The venue fills the 39,900 buy while no engine is running to observe
    // the resulting order-stream event.
    exchange.set_price(symbol.clone(), dec!(39_850));
    assert_eq!(exchange.get_open_orders(&symbol).await.unwrap().len(), 3);

    let mut engine_b = GridEngine::new(
        exchange.clone(),
        store,
        symbol.clone(),
        symbol_info,
        strategy_id,
        GridStrategy::new(grid_config()),
        CircuitBreaker::new(RiskConfig::default()),
    )
    .unwrap();
    assert_eq!(engine_b.slots().locked_slots().count(), 4, "recovered state still thinks the filled level is resting");

    engine_b.sync_orders().await.unwrap();
    assert_eq!(
        engine_b.slots().locked_slots().count(),
        3,
        "sync_orders must free the slot behind a fill the crashed engine never recorded, and only that slot"
    );
}

#[tokio::test]
async fn a_tripped_breaker_cancels_every_resting_level_and_blocks_new_buys() {
    let store = Store::open_in_memory().unwrap();
    let exchange = SimulatedExchange::new(venue_config());
    let symbol = Symbol::from(SYMBOL);
    let symbol_info = exchange.get_symbol_info(&symbol).await.unwrap();

    let mut engine = GridEngine::new(
        exchange.clone(),
        store,
        symbol.clone(),
        symbol_info,
        StrategyId::new("grid-test"),
        GridStrategy::new(grid_config()),
        CircuitBreaker::new(RiskConfig::default()),
    )
    .unwrap();
    engine.ensure_slot_capacity(4, 0).unwrap();

    let placed = engine.on_price_update(dec!(40_000), dec!(40_000), dec!(40_000), Decimal::ZERO, 0, 0).await.unwrap();
    assert_eq!(placed.len(), 4);

    engine.breaker_mut().trip(TripReason::Latency);

    let after_trip = engine.on_price_update(dec!(40_000), dec!(40_000), dec!(40_000), Decimal::ZERO, 0, 1).await.unwrap();
    assert_eq!(after_trip.len(), 4, "every resting level must be torn down once the breaker opens");
    assert!(after_trip.iter().all(|action| matches!(action, SlotAction::Cancel { .. })));
    assert_eq!(exchange.get_open_orders(&symbol).await.unwrap().len(), 0);

    let quiescent = engine.on_price_update(dec!(40_000), dec!(40_000), dec!(40_000), Decimal::ZERO, 0, 2).await.unwrap();
    assert!(quiescent.is_empty(), "no new buys may be placed while the breaker stays open");
}

#[tokio::test]
async fn a_venue_initiated_cancel_frees_the_slot_instead_of_stranding_it() {
    let store = Store::open_in_memory().unwrap();
    let exchange = SimulatedExchange::new(venue_config());
    let symbol = Symbol::from(SYMBOL);
    let symbol_info = exchange.get_symbol_info(&symbol).await.unwrap();
    let strategy_id = StrategyId::new("grid-test");

    let mut engine = GridEngine::new(
        exchange.clone(),
        store,
        symbol.clone(),
        symbol_info,
        strategy_id.clone(),
        GridStrategy::new(grid_config()),
        CircuitBreaker::new(RiskConfig::default()),
    )
    .unwrap();
    engine.ensure_slot_capacity(4, 0).unwrap();

    let placed = engine.on_price_update(dec!(40_000), dec!(40_000), dec!(40_000), Decimal::ZERO, 0, 0).await.unwrap();
    assert_eq!(engine.slots().locked_slots().count(), 4);

    // The venue cancels one resting order on its own initiative (e.g. a
    // post-only reject after a reprice) rather than in response to a cancel
    // this engine issued.
    let SlotAction::Place { cid, side, price, qty, .. } = placed.into_iter().next().unwrap() else {
        panic!("expected a Place action");
    };
    let key = OrderKey { exchange: ExchangeId::Simulated, symbol: symbol.clone(), strategy: strategy_id, cid };
    let cancel_update = Order::new(
        key,
        side,
        price,
        qty,
        OrderType::Limit,
        TimeInForce::GoodUntilCancelled,
        false,
        false,
        OrderState::cancelled(Cancelled { id: OrderId::new("venue-1"), time_exchange: chrono::Utc::now() }),
    );

    let ghost = engine.on_order_update(cancel_update, 0).unwrap();
    assert!(ghost.is_none(), "a recognized cid's cancel is not a ghost fill");
    assert_eq!(
        engine.slots().locked_slots().count(),
        3,
        "a venue-initiated cancel must free the slot rather than strand it in SlotState::Canceled"
    );
    assert_eq!(engine.slots().free_slots().count(), 1);
}

#[tokio::test]
async fn an_order_update_for_an_unknown_client_order_id_reconciles_as_a_ghost_fill() {
    let store = Store::open_in_memory().unwrap();
    let exchange = SimulatedExchange::new(venue_config());
    let symbol = Symbol::from(SYMBOL);
    let symbol_info = exchange.get_symbol_info(&symbol).await.unwrap();
    let strategy_id = StrategyId::new("grid-test");

    let mut engine = GridEngine::new(
        exchange.clone(),
        store,
        symbol.clone(),
        symbol_info,
        strategy_id.clone(),
        GridStrategy::new(grid_config()),
        CircuitBreaker::new(RiskConfig::default()),
    )
    .unwrap();

    // No slot in this table was ever assigned this client_order_id — the
    // fill is a ghost, e.g. one the venue applied during a gap between a
    // crash and recovery.
    let key = OrderKey {
        exchange: ExchangeId::Simulated,
        symbol: symbol.clone(),
        strategy: strategy_id,
        cid: ClientOrderId::new("never-tracked"),
    };
    let unknown_fill = Order::new(
        key,
        Side::Buy,
        dec!(39_900),
        dec!(1),
        OrderType::Limit,
        TimeInForce::GoodUntilCancelled,
        false,
        false,
        OrderState::open(Open {
            id: OrderId::new("venue-2"),
            time_exchange: chrono::Utc::now(),
            price: dec!(39_900),
            quantity: dec!(1),
            filled_quantity: dec!(0.5),
        }),
    );

    let ghost = engine.on_order_update(unknown_fill, 0).unwrap();
    let ghost = ghost.expect("an unknown cid reporting executed quantity must reconcile as a ghost fill");
    assert_eq!(ghost.side, Side::Buy);
    assert_eq!(ghost.qty, dec!(0.5));
    assert_eq!(ghost.price, dec!(39_900));
}

#[tokio::test]
async fn a_sustained_rally_switches_the_regime_to_bull_trend_and_stops_placing_sells() {
    let store = Store::open_in_memory().unwrap();
    let exchange = SimulatedExchange::new(venue_config());
    let symbol = Symbol::from(SYMBOL);
    let symbol_info = exchange.get_symbol_info(&symbol).await.unwrap();

    // A fast-converging trend classifier so a handful of ticks is enough to
    // flip the regime without needing the production EMA periods.
    let mut config = grid_config();
    config.trend = TrendConfig { fast_period: 2, slow_period: 5, trend_threshold: dec!(0.01) };

    let mut engine = GridEngine::new(
        exchange.clone(),
        store,
        symbol.clone(),
        symbol_info,
        StrategyId::new("grid-test"),
        GridStrategy::new(config),
        CircuitBreaker::new(RiskConfig::default()),
    )
    .unwrap();
    engine.ensure_slot_capacity(4, 0).unwrap();

    let rally = [dec!(40_000), dec!(40_400), dec!(40_900), dec!(41_500), dec!(42_200), dec!(43_000), dec!(43_900)];
    let mut actions = Vec::new();
    for (i, price) in rally.into_iter().enumerate() {
        actions = engine.on_price_update(price, price, price, Decimal::ZERO, 0, i as i64).await.unwrap();
    }

    assert_eq!(engine.regime(), Regime::BullTrend, "a sustained rally must be classified BULL_TREND");
    assert!(
        actions.iter().all(|action| !matches!(action, SlotAction::Place { side: Side::Sell, .. })),
        "BULL_TREND must not place new sell-side levels"
    );
    assert_eq!(exchange.get_open_orders(&symbol).await.unwrap().iter().filter(|o| o.side == Side::Sell).count(), 0);
}
