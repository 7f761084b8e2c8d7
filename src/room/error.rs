use thiserror::Error;

/// Protocol-level violations surfaced to the offending session.
///
/// Display strings are the user-visible messages pushed to clients, so they
/// stay in the UI language. None of these variants ever corrupts shared room
/// state; a failed intent is simply rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("Комната не найдена.")]
    RoomNotFound,

    #[error("Игра уже началась в этой комнате.")]
    GameAlreadyStarted,

    #[error("Только хост может начать игру.")]
    NotHost,

    #[error("Не удалось сгенерировать вопросы. Возможно, проблема с API ключом или ответом от ИИ.")]
    QuestionGenerationEmpty,

    #[error("Вы не находитесь в этой комнате.")]
    NotInRoom,

    #[error("Имя игрока не может быть пустым.")]
    NameRequired,

    #[error("Вы уже находитесь в комнате.")]
    AlreadyInRoom,
}
