pub mod accumulator;
pub mod derived;
pub mod path;
pub mod period;
pub mod sensor;
pub mod store;
