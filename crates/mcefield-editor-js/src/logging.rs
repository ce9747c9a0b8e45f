//! Console logging for the page.

use std::sync::Once;

use tracing::Level;
use tracing::subscriber::set_global_default;
use tracing_subscriber::Registry;
use tracing_subscriber::layer::SubscriberExt;

static INSTALL: Once = Once::new();

/// Install the console subscriber. The bootstrap `debug` flag raises the level
/// to DEBUG; otherwise only warnings and errors reach the console.
pub fn install(debug: bool) {
    INSTALL.call_once(|| {
        let console_level = if debug || cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::WARN
        };

        let wasm_layer = tracing_wasm::WASMLayer::new(
            tracing_wasm::WASMLayerConfigBuilder::new()
                .set_max_level(console_level)
                .build(),
        );

        let _ = set_global_default(Registry::default().with(wasm_layer));
    });
}
