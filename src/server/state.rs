use crate::locator::Locator;

pub struct AppState {
    pub locator: Locator,
}
