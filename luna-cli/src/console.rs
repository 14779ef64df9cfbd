//! Terminal platform for headless runs.

use luna_vm::Platform;

/// Prints messages to stdout. No keyboard is attached, so every key query
/// answers false.
#[derive(Debug, Default)]
pub struct ConsolePlatform;

impl Platform for ConsolePlatform {
    fn key_down(&self, _key: i64) -> bool {
        false
    }

    fn key_pressed(&self, _key: i64) -> bool {
        false
    }

    fn key_released(&self, _key: i64) -> bool {
        false
    }

    fn show_message(&mut self, text: &str) {
        println!("{text}");
    }

    fn debug_message(&mut self, text: &str) {
        println!("{text}");
    }
}
