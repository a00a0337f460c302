//! Fuzz target: stored configuration blob
//!
//! Writes arbitrary bytes into the config slot and loads them back:
//! - No panics under arbitrary byte inputs
//! - Anything that loads passes validation and builds a controller
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use pitpid::GrillController;
use pitpid::adapters::config_store::MemoryConfigStore;
use pitpid::app::ports::ConfigPort;

fuzz_target!(|data: &[u8]| {
    let store = MemoryConfigStore::new();
    if store.write_raw(data).is_err() {
        return;
    }
    if let Ok(config) = store.load() {
        assert!(config.validate().is_ok());
        assert!(GrillController::new(&config).is_ok());
    }
});
