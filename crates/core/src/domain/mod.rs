pub mod activity;
pub mod contract;
pub mod strategy;
pub mod weights;
