use super::QuizQuestion;

/// Static question set used whenever generation is unavailable: missing
/// credential, upstream failure, or a payload that yields no valid questions.
/// Game start must never abort because generation failed.
pub fn fallback_questions() -> Vec<QuizQuestion> {
    let raw: &[(&str, [&str; 4], &str)] = &[
        (
            "Какое самое быстрое животное на Земле?",
            ["Гепард", "Сокол-сапсан", "Антилопа", "Страус"],
            "Сокол-сапсан",
        ),
        (
            "Как называется столица Австралии?",
            ["Сидней", "Мельбурн", "Канберра", "Перт"],
            "Канберра",
        ),
        (
            "Какой химический элемент обозначается символом 'Fe'?",
            ["Фтор", "Фосфор", "Железо", "Феликс"],
            "Железо",
        ),
        (
            "Самая высокая гора в мире?",
            ["К2", "Эверест", "Килиманджаро", "Монблан"],
            "Эверест",
        ),
        (
            "Кто написал 'Войну и мир'?",
            [
                "Фёдор Достоевский",
                "Лев Толстой",
                "Антон Чехов",
                "Иван Тургенев",
            ],
            "Лев Толстой",
        ),
    ];

    raw.iter()
        .map(|(question, options, correct)| QuizQuestion {
            question: question.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: correct.to_string(),
        })
        .collect()
}
