pub mod payment_engine;
