use std::sync::Arc;
use std::time::Duration;

use quizarena::questions::fallback::fallback_questions;
use quizarena::questions::OpenRouterQuestionProvider;
use quizarena::room::{RoomRepository, REVEAL_DELAY};
use quizarena::websockets::MessageType;

mod utils;

use utils::*;

/// Lets scheduled advance tasks run after the paused clock moves past the
/// reveal delay.
async fn run_reveal_timer() {
    tokio::time::sleep(REVEAL_DELAY + Duration::from_millis(10)).await;
    for _ in 0..3 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn two_player_game_flow() {
    let setup = setup_with_questions(sample_questions(50));

    // Alice creates a room and is its only player.
    let room_id = setup.create_room("alice", "Alice").await;
    let created = setup
        .connections
        .last_of_type("alice", MessageType::RoomCreated)
        .await
        .unwrap();
    assert_eq!(created.payload["players"].as_object().unwrap().len(), 1);

    // Bob joins; both hear the updated roster.
    setup.service.join_room("bob", &room_id, "Bob").await;
    for session in ["alice", "bob"] {
        let joined = setup
            .connections
            .last_of_type(session, MessageType::PlayerJoined)
            .await
            .expect("playerJoined should reach the whole room");
        assert_eq!(joined.payload["newPlayerName"], "Bob");
        assert_eq!(joined.payload["players"].as_object().unwrap().len(), 2);
    }

    // The host starts the game; everyone gets question 1 of 50.
    setup.service.start_game("alice", &room_id).await;
    for session in ["alice", "bob"] {
        assert_eq!(
            setup
                .connections
                .count_of_type(session, MessageType::GameStarted)
                .await,
            1
        );
        let question = setup
            .connections
            .last_of_type(session, MessageType::NewQuestion)
            .await
            .unwrap();
        assert_eq!(question.payload["questionNumber"], 1);
        assert_eq!(question.payload["totalQuestions"], 50);
    }

    // Alice answers correctly: private result, public scores, no reveal yet.
    setup.service.submit_answer("alice", &room_id, "б").await;
    let result = setup
        .connections
        .last_of_type("alice", MessageType::AnswerResult)
        .await
        .unwrap();
    assert_eq!(result.payload["isCorrect"], true);
    assert_eq!(result.payload["yourScore"], 10);
    assert_eq!(
        setup
            .connections
            .count_of_type("bob", MessageType::AnswerResult)
            .await,
        0,
        "answerResult is private to the answering session"
    );
    let scores = setup
        .connections
        .last_of_type("bob", MessageType::UpdateScores)
        .await
        .unwrap();
    assert_eq!(scores.payload["alice"]["score"], 10);
    assert_eq!(
        setup
            .connections
            .count_of_type("bob", MessageType::RevealAnswer)
            .await,
        0,
        "no reveal until everyone answered"
    );

    // Bob answers wrong; the round completes and both see the reveal.
    setup.service.submit_answer("bob", &room_id, "а").await;
    for session in ["alice", "bob"] {
        let reveal = setup
            .connections
            .last_of_type(session, MessageType::RevealAnswer)
            .await
            .expect("revealAnswer should reach the whole room");
        assert_eq!(reveal.payload["correctAnswer"], "б");
        assert_eq!(reveal.payload["players"]["alice"]["score"], 10);
        assert_eq!(reveal.payload["players"]["bob"]["score"], 0);
    }

    // After the reveal delay the next question goes out.
    run_reveal_timer().await;
    for session in ["alice", "bob"] {
        let question = setup
            .connections
            .last_of_type(session, MessageType::NewQuestion)
            .await
            .unwrap();
        assert_eq!(question.payload["questionNumber"], 2);
    }
}

#[tokio::test]
async fn join_nonexistent_room_reports_error_and_changes_nothing() {
    let setup = setup_with_questions(sample_questions(2));

    setup.service.join_room("bob", "NOROOM", "Bob").await;

    let error = setup
        .connections
        .last_of_type("bob", MessageType::JoinError)
        .await
        .expect("joining client gets a joinError");
    assert_eq!(error.payload["message"], "Комната не найдена.");
    assert!(setup.repository.get("NOROOM").await.is_none());
}

#[tokio::test]
async fn join_after_start_is_rejected() {
    let setup = setup_with_questions(sample_questions(2));
    let room_id = setup.create_room("alice", "Alice").await;
    setup.service.start_game("alice", &room_id).await;

    setup.service.join_room("bob", &room_id, "Bob").await;

    let error = setup
        .connections
        .last_of_type("bob", MessageType::JoinError)
        .await
        .unwrap();
    assert_eq!(error.payload["message"], "Игра уже началась в этой комнате.");
}

#[tokio::test]
async fn missing_credential_starts_game_with_fallback_set() {
    let provider = OpenRouterQuestionProvider::new(None, "deepseek/deepseek-chat".to_string());
    let setup = setup_with_provider(Arc::new(provider));
    let room_id = setup.create_room("alice", "Alice").await;

    setup.service.start_game("alice", &room_id).await;

    let question = setup
        .connections
        .last_of_type("alice", MessageType::NewQuestion)
        .await
        .expect("game starts on the fallback set");
    assert_eq!(
        question.payload["totalQuestions"],
        fallback_questions().len()
    );
}

#[tokio::test]
async fn empty_question_set_keeps_room_in_lobby() {
    let setup = setup_with_questions(vec![]);
    let room_id = setup.create_room("alice", "Alice").await;

    setup.service.start_game("alice", &room_id).await;

    let error = setup
        .connections
        .last_of_type("alice", MessageType::Error)
        .await
        .expect("room hears about the failed start");
    assert_eq!(
        error.payload["message"],
        "Не удалось сгенерировать вопросы. Возможно, проблема с API ключом или ответом от ИИ."
    );

    // The room is back in the lobby and accepts joins again.
    setup.service.join_room("bob", &room_id, "Bob").await;
    assert!(setup
        .connections
        .last_of_type("bob", MessageType::PlayerJoined)
        .await
        .is_some());
}

#[tokio::test]
async fn non_host_cannot_start_game() {
    let setup = setup_with_questions(sample_questions(2));
    let room_id = setup.create_room("alice", "Alice").await;
    setup.service.join_room("bob", &room_id, "Bob").await;

    setup.service.start_game("bob", &room_id).await;

    let error = setup
        .connections
        .last_of_type("bob", MessageType::Error)
        .await
        .unwrap();
    assert_eq!(error.payload["message"], "Только хост может начать игру.");
    assert_eq!(
        setup
            .connections
            .count_of_type("alice", MessageType::GameStarted)
            .await,
        0
    );
}

#[tokio::test]
async fn duplicate_answer_is_ignored() {
    let setup = setup_with_questions(sample_questions(2));
    let room_id = setup.create_room("alice", "Alice").await;
    setup.service.join_room("bob", &room_id, "Bob").await;
    setup.service.start_game("alice", &room_id).await;

    setup.service.submit_answer("alice", &room_id, "б").await;
    setup.service.submit_answer("alice", &room_id, "б").await;

    assert_eq!(
        setup
            .connections
            .count_of_type("alice", MessageType::AnswerResult)
            .await,
        1,
        "second answer draws no reply"
    );
    let scores = setup
        .connections
        .last_of_type("alice", MessageType::UpdateScores)
        .await
        .unwrap();
    assert_eq!(scores.payload["alice"]["score"], 10);
}

#[tokio::test]
async fn host_departure_reassigns_host_and_announces_it() {
    let setup = setup_with_questions(sample_questions(2));
    let room_id = setup.create_room("alice", "Alice").await;
    setup.service.join_room("bob", &room_id, "Bob").await;
    setup.service.join_room("carol", &room_id, "Carol").await;

    setup.service.leave_room("alice", &room_id).await;

    let left = setup
        .connections
        .last_of_type("bob", MessageType::PlayerLeft)
        .await
        .unwrap();
    assert_eq!(left.payload["playerName"], "Alice");
    assert_eq!(left.payload["players"].as_object().unwrap().len(), 2);

    // Earliest remaining joiner becomes host.
    for session in ["bob", "carol"] {
        let new_host = setup
            .connections
            .last_of_type(session, MessageType::NewHost)
            .await
            .unwrap();
        assert_eq!(new_host.payload, "bob");
    }
    assert!(setup.repository.get(&room_id).await.unwrap().is_host("bob"));
}

#[tokio::test(start_paused = true)]
async fn departure_mid_round_completes_the_round() {
    let setup = setup_with_questions(sample_questions(3));
    let room_id = setup.create_room("alice", "Alice").await;
    setup.service.join_room("bob", &room_id, "Bob").await;
    setup.service.start_game("alice", &room_id).await;

    setup.service.submit_answer("alice", &room_id, "б").await;
    assert_eq!(
        setup
            .connections
            .count_of_type("alice", MessageType::RevealAnswer)
            .await,
        0
    );

    // Bob leaves without answering; Alice is the whole roster and has
    // answered, so the reveal fires for her.
    setup.service.leave_room("bob", &room_id).await;
    let reveal = setup
        .connections
        .last_of_type("alice", MessageType::RevealAnswer)
        .await
        .expect("departure completes the round");
    assert_eq!(reveal.payload["correctAnswer"], "б");

    run_reveal_timer().await;
    let question = setup
        .connections
        .last_of_type("alice", MessageType::NewQuestion)
        .await
        .unwrap();
    assert_eq!(question.payload["questionNumber"], 2);
}

#[tokio::test]
async fn disconnect_takes_the_leave_path() {
    let setup = setup_with_questions(sample_questions(2));
    let room_id = setup.create_room("alice", "Alice").await;
    setup.service.join_room("bob", &room_id, "Bob").await;

    setup.service.disconnect("bob").await;

    let left = setup
        .connections
        .last_of_type("alice", MessageType::PlayerLeft)
        .await
        .expect("disconnect is an implicit leave");
    assert_eq!(left.payload["playerName"], "Bob");

    // Last disconnect deletes the room.
    setup.service.disconnect("alice").await;
    assert!(setup.repository.get(&room_id).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn pending_advance_is_cancelled_when_room_empties() {
    let setup = setup_with_questions(sample_questions(2));
    let room_id = setup.create_room("alice", "Alice").await;
    setup.service.start_game("alice", &room_id).await;

    // Sole player answers: reveal fires and the advance timer is armed.
    setup.service.submit_answer("alice", &room_id, "б").await;
    assert_eq!(
        setup
            .connections
            .count_of_type("alice", MessageType::RevealAnswer)
            .await,
        1
    );

    // The room empties before the timer fires.
    setup.service.leave_room("alice", &room_id).await;
    assert!(setup.repository.get(&room_id).await.is_none());

    run_reveal_timer().await;

    // The scheduled advance must not have produced anything.
    assert_eq!(
        setup
            .connections
            .count_of_type("alice", MessageType::NewQuestion)
            .await,
        1,
        "only the first question was ever dispatched"
    );
}

#[tokio::test(start_paused = true)]
async fn exhausting_questions_ends_game_and_frees_players() {
    let total = 2;
    let setup = setup_with_questions(sample_questions(total));
    let room_id = setup.create_room("alice", "Alice").await;
    setup.service.start_game("alice", &room_id).await;

    for _ in 0..total {
        let question = setup
            .connections
            .last_of_type("alice", MessageType::NewQuestion)
            .await
            .unwrap();
        let selected = question.payload["options"][1].as_str().unwrap().to_string();
        setup.service.submit_answer("alice", &room_id, &selected).await;
        run_reveal_timer().await;
    }

    let game_over = setup
        .connections
        .last_of_type("alice", MessageType::GameOver)
        .await
        .expect("gameOver after the final question");
    assert_eq!(
        game_over.payload["finalPlayers"]["alice"]["score"],
        (total as i32) * 10
    );
    assert!(setup.repository.get(&room_id).await.is_none());

    // The session is free again and can open a new room.
    setup.connections.clear().await;
    let new_room = setup.create_room("alice", "Alice").await;
    assert_ne!(new_room, room_id);
}

#[tokio::test]
async fn session_cannot_be_in_two_rooms() {
    let setup = setup_with_questions(sample_questions(2));
    let first = setup.create_room("alice", "Alice").await;
    let second = setup.create_room("carol", "Carol").await;

    setup.service.join_room("alice", &second, "Alice").await;

    let error = setup
        .connections
        .last_of_type("alice", MessageType::JoinError)
        .await
        .unwrap();
    assert_eq!(error.payload["message"], "Вы уже находитесь в комнате.");
    assert!(!setup
        .repository
        .get(&second)
        .await
        .unwrap()
        .has_player("alice"));
    assert!(setup
        .repository
        .get(&first)
        .await
        .unwrap()
        .has_player("alice"));
}

#[tokio::test]
async fn blank_player_name_is_rejected() {
    let setup = setup_with_questions(sample_questions(2));

    setup.service.create_room("alice", "   ").await;

    let error = setup
        .connections
        .last_of_type("alice", MessageType::Error)
        .await
        .unwrap();
    assert_eq!(error.payload["message"], "Имя игрока не может быть пустым.");
    assert_eq!(
        setup
            .connections
            .count_of_type("alice", MessageType::RoomCreated)
            .await,
        0
    );
}
