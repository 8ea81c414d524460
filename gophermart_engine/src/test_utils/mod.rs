pub mod prepare_env;
pub mod scripted_oracle;

pub use scripted_oracle::ScriptedOracle;
