//! Input gating for the message composer.

use std::fmt;

use assist_core::Mode;

/// What the composer should show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComposerStatus {
    /// The connection is not open.
    Offline,
    /// Roles are offered; the user must pick one from the action menu.
    ChooseRole,
    /// Free input in the given mode.
    Ready(Mode),
}

impl ComposerStatus {
    /// Placeholder text for the input field.
    pub fn placeholder(self) -> &'static str {
        match self {
            Self::Offline => "Нет связи",
            Self::ChooseRole => "Нажмите слева, чтобы открыть героев",
            Self::Ready(Mode::Skynet) => "Режим Тренажер",
            Self::Ready(Mode::Chat) => "Режим ЧАТ",
        }
    }
}

impl fmt::Display for ComposerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.placeholder())
    }
}
