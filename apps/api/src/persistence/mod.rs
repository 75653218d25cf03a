// Resume persistence: storage backends and the debounced save controller.

#[cfg(test)]
pub mod memory;
pub mod save_controller;
pub mod store;
