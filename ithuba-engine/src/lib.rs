pub mod backtest;
pub mod cache;
pub mod divisions;
pub mod ensemble;
pub mod estimator;
pub mod hypergeom;
pub mod models;
pub mod wheel;
