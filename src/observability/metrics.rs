use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Registry};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Refresh cycle metrics
    pub static ref REFRESH_CYCLES: Counter = Counter::new(
        "price_refresh_cycles_total",
        "Completed price refresh cycles"
    ).unwrap();

    pub static ref SPOT_CHAIN_EXHAUSTED: Counter = Counter::new(
        "spot_chain_exhausted_total",
        "Refresh cycles where every spot price source failed or was rejected"
    ).unwrap();

    pub static ref FX_CHAIN_EXHAUSTED: Counter = Counter::new(
        "fx_chain_exhausted_total",
        "Refresh cycles where every FX source failed"
    ).unwrap();

    pub static ref SNAPSHOT_PERSIST_ERRORS: Counter = Counter::new(
        "snapshot_persist_errors_total",
        "Snapshot writes to durable storage that failed"
    ).unwrap();

    // Published prices
    pub static ref GOLD_PRICE_USD: Gauge = Gauge::new(
        "gold_price_usd",
        "Published gold spot price, USD per troy ounce"
    ).unwrap();

    pub static ref SILVER_PRICE_USD: Gauge = Gauge::new(
        "silver_price_usd",
        "Published silver spot price, USD per troy ounce"
    ).unwrap();
}

pub fn register_metrics() {
    REGISTRY.register(Box::new(REFRESH_CYCLES.clone())).unwrap();
    REGISTRY.register(Box::new(SPOT_CHAIN_EXHAUSTED.clone())).unwrap();
    REGISTRY.register(Box::new(FX_CHAIN_EXHAUSTED.clone())).unwrap();
    REGISTRY.register(Box::new(SNAPSHOT_PERSIST_ERRORS.clone())).unwrap();
    REGISTRY.register(Box::new(GOLD_PRICE_USD.clone())).unwrap();
    REGISTRY.register(Box::new(SILVER_PRICE_USD.clone())).unwrap();
}
