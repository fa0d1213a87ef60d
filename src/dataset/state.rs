/// Where the dataset handle is in its load lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    /// The last load attempt failed; queries answer "not ready".
    Unavailable,
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::Idle => "Idle",
            LoadState::Loading => "Loading",
            LoadState::Ready => "Ready",
            LoadState::Unavailable => "Unavailable",
        }
    }
}
