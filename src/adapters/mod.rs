// Adapters layer: concrete implementations for external systems.

pub mod google_maps;
pub mod storage;
