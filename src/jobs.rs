pub mod token_sweep;
