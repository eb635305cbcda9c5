use depscan_core::CatalogServices;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub services: CatalogServices,
}

impl AppState {
    pub fn new(services: CatalogServices) -> Self {
        Self { services }
    }
}
