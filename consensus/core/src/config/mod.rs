pub mod genesis;
pub mod params;

pub use genesis::GenesisParams;
pub use params::Params;
