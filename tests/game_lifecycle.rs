mod common;

use std::{sync::atomic::Ordering, time::Duration};

use common::{Harness, START, song, submission};
use futures::future::join_all;
use song_sleuths_back::{
    dao::{
        integrity::{IntegrityError, SubmissionDraft},
        models::{RevealLease, TierlistKind},
        storage::{Constraint, StorageError},
    },
    dto::{
        game::{CreateGameRequest, GameView},
        ranking::{RankingRequest, TierPlacementInput},
    },
    error::ServiceError,
    services::{game_service, ranking_service, submission_service},
    state::session::{SessionOperation, SessionPhase},
};
use uuid::Uuid;

async fn revealed(h: &Harness, player: &str, game_id: &str) -> GameView {
    game_service::get_game(&h.state, player.into(), game_id.into())
        .await
        .unwrap()
}

#[tokio::test]
async fn ace_scenario_enforces_song_uniqueness_per_game() {
    let h = Harness::new().await;
    let game_a = h.game("alice", 2).await;
    let game_b = h.game("bob", 1).await;

    let ace = submission_service::upsert_submission(
        &h.state,
        "alice".into(),
        game_a.clone(),
        submission("Ace", &[1, 2]),
    )
    .await
    .unwrap();
    assert_eq!(ace.nickname, "Ace");
    assert_eq!(ace.songs, [song(1), song(2)]);

    // Same song in another game is fine.
    submission_service::upsert_submission(
        &h.state,
        "bob".into(),
        game_b,
        submission("Bee", &[1]),
    )
    .await
    .unwrap();

    let err = submission_service::upsert_submission(
        &h.state,
        "bob".into(),
        game_a.clone(),
        submission("Bee", &[1, 3]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)), "got {err:?}");

    h.close_submissions();
    let GameView::Revealed { guess_list, .. } = revealed(&h, "alice", &game_a).await else {
        panic!("expected revealed view");
    };
    let names: Vec<_> = guess_list.tiers.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["Ace"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_submissions_have_one_winner() {
    let h = Harness::new().await;
    let game_id = h.game("owner", 1).await;
    let integrity = h.state.require_integrity().await.unwrap();
    let game = integrity
        .store()
        .find_game(game_id.clone())
        .await
        .unwrap()
        .unwrap();

    let attempts = (0..8u32).map(|n| {
        let integrity = integrity.clone();
        let game = game.clone();
        tokio::spawn(async move {
            let draft = SubmissionDraft {
                nickname: format!("Racer{n}"),
                drawing: "https://drawings/racer.png".into(),
                songs: vec![song(100 + n)],
            };
            integrity.insert_submission(&game, "racer".into(), draft).await
        })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for result in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(
                result,
                IntegrityError::Storage(StorageError::Conflict(Constraint::SubmissionPerPlayer))
            ),
            "got {result:?}"
        );
    }

    let store = integrity.store();
    assert_eq!(store.list_submissions(game_id.clone()).await.unwrap().len(), 1);
    let guess_tiers: usize = store
        .list_tierlists(game_id)
        .await
        .unwrap()
        .iter()
        .filter(|t| t.kind == TierlistKind::Guess)
        .map(|t| t.tiers.len())
        .sum();
    assert_eq!(guess_tiers, 1);
}

#[tokio::test]
async fn submission_after_deadline_is_a_phase_error() {
    let h = Harness::new().await;
    let game = h.game("owner", 1).await;
    submission_service::upsert_submission(
        &h.state,
        "p1".into(),
        game.clone(),
        submission("One", &[1]),
    )
    .await
    .unwrap();

    h.close_submissions();

    let err = submission_service::upsert_submission(
        &h.state,
        "p2".into(),
        game.clone(),
        submission("Two", &[2]),
    )
    .await
    .unwrap_err();
    match err {
        ServiceError::InvalidPhase(invalid) => {
            assert_eq!(invalid.phase, SessionPhase::Locked);
            assert_eq!(invalid.operation, SessionOperation::Submit);
        }
        other => panic!("expected phase error, got {other:?}"),
    }

    let err = submission_service::withdraw_submission(&h.state, "p1".into(), game.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidPhase(_)));

    let store = h.state.require_game_store().await.unwrap();
    assert_eq!(store.list_submissions(game).await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_and_withdraw_while_open() {
    let h = Harness::new().await;
    let game = h.game("owner", 1).await;

    let first = submission_service::upsert_submission(
        &h.state,
        "p1".into(),
        game.clone(),
        submission("One", &[1]),
    )
    .await
    .unwrap();
    let second = submission_service::upsert_submission(
        &h.state,
        "p1".into(),
        game.clone(),
        submission("Uno", &[2]),
    )
    .await
    .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.songs, [song(2)]);

    // The freed song can be taken by someone else.
    submission_service::upsert_submission(
        &h.state,
        "p2".into(),
        game.clone(),
        submission("Two", &[1]),
    )
    .await
    .unwrap();

    let GameView::Open { submission: own, .. } =
        game_service::get_game(&h.state, "p1".into(), game.clone())
            .await
            .unwrap()
    else {
        panic!("expected open view");
    };
    assert_eq!(own.unwrap().nickname, "Uno");

    submission_service::withdraw_submission(&h.state, "p1".into(), game.clone())
        .await
        .unwrap();
    let err = submission_service::withdraw_submission(&h.state, "p1".into(), game)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn nicknames_are_unique_per_game() {
    let h = Harness::new().await;
    let game = h.game("owner", 1).await;
    let other_game = h.game("owner", 1).await;
    let nickname_taken = ServiceError::Conflict(Constraint::NicknamePerGame.to_string());

    submission_service::upsert_submission(
        &h.state,
        "p1".into(),
        game.clone(),
        submission("Ace", &[1]),
    )
    .await
    .unwrap();

    let err = submission_service::upsert_submission(
        &h.state,
        "p2".into(),
        game.clone(),
        submission("Ace", &[2]),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), nickname_taken.to_string());

    submission_service::upsert_submission(
        &h.state,
        "p2".into(),
        game.clone(),
        submission("Bee", &[2]),
    )
    .await
    .unwrap();
    let err = submission_service::upsert_submission(
        &h.state,
        "p2".into(),
        game.clone(),
        submission("Ace", &[2]),
    )
    .await
    .unwrap_err();
    assert!(matches!(&err, ServiceError::Conflict(_)), "got {err:?}");
    assert_eq!(err.to_string(), nickname_taken.to_string());

    // Another game has its own namespace.
    submission_service::upsert_submission(
        &h.state,
        "p2".into(),
        other_game,
        submission("Ace", &[3]),
    )
    .await
    .unwrap();

    let store = h.state.require_game_store().await.unwrap();
    let bee = store.find_submission(game, "p2".into()).await.unwrap().unwrap();
    assert_eq!(bee.nickname, "Bee");
}

#[tokio::test]
async fn invalid_game_drafts_never_create_playlists() {
    let h = Harness::new().await;

    let err = game_service::create_game(
        &h.state,
        "owner".into(),
        CreateGameRequest {
            name: "Late".into(),
            deadline: START - 1,
            n_songs: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let err = game_service::create_game(
        &h.state,
        "owner".into(),
        CreateGameRequest {
            name: "Greedy".into(),
            deadline: START + 60,
            n_songs: 6,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
    assert_eq!(h.catalog.created_playlists.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reveals_fill_the_playlist_once() {
    let h = Harness::new().await;
    let game = h.game("owner", 2).await;
    for (n, player) in ["p1", "p2", "p3"].into_iter().enumerate() {
        let base = 10 * n as u32;
        submission_service::upsert_submission(
            &h.state,
            player.into(),
            game.clone(),
            submission(&player.to_uppercase(), &[base + 1, base + 2]),
        )
        .await
        .unwrap();
    }
    h.catalog.add_tracks_delay_ms.store(100, Ordering::SeqCst);
    h.close_submissions();

    let readers = (0..10).map(|n| {
        let state = h.state.clone();
        let game = game.clone();
        tokio::spawn(async move {
            game_service::get_game(&state, format!("reader{n}"), game).await
        })
    });
    for joined in join_all(readers).await {
        let view = joined.unwrap().unwrap();
        assert_eq!(view.phase(), SessionPhase::Revealed);
    }

    assert_eq!(h.catalog.add_tracks_calls(), 1);

    let GameView::Revealed { songs, playlist, .. } = revealed(&h, "p1", &game).await else {
        panic!("expected revealed view");
    };
    assert_eq!(songs.len(), 6);
    assert!(songs.windows(2).all(|pair| pair[0].id < pair[1].id));
    assert!(songs.iter().all(|s| s.name.is_some() && s.cover_art.is_some()));
    assert!(playlist.starts_with("playlist-"));
    assert_eq!(h.catalog.add_tracks_calls(), 1);
}

#[tokio::test]
async fn failed_playlist_call_leaves_game_locked_until_retry() {
    let h = Harness::new().await;
    let game = h.game("owner", 1).await;
    submission_service::upsert_submission(
        &h.state,
        "p1".into(),
        game.clone(),
        submission("One", &[1]),
    )
    .await
    .unwrap();
    h.close_submissions();
    h.catalog.set_failing(true);

    let err = game_service::get_game(&h.state, "p1".into(), game.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Upstream(_)), "got {err:?}");

    let store = h.state.require_game_store().await.unwrap();
    let row = store.find_game(game.clone()).await.unwrap().unwrap();
    assert!(!row.revealed);
    assert!(row.reveal_lease.is_none());

    h.catalog.set_failing(false);
    let view = revealed(&h, "p1", &game).await;
    assert_eq!(view.phase(), SessionPhase::Revealed);
    assert_eq!(h.catalog.add_tracks_calls(), 1);
}

async fn one_song_game(h: &Harness) -> String {
    let game = h.game("owner", 1).await;
    submission_service::upsert_submission(
        &h.state,
        "p1".into(),
        game.clone(),
        submission("One", &[1]),
    )
    .await
    .unwrap();
    h.close_submissions();
    game
}

fn spawn_reader(
    h: &Harness,
    reader: &str,
    game: &str,
) -> tokio::task::JoinHandle<Result<GameView, ServiceError>> {
    let state = h.state.clone();
    let reader = reader.to_owned();
    let game = game.to_owned();
    tokio::spawn(async move { game_service::get_game(&state, reader, game).await })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_playlist_call_keeps_the_lease() {
    let h = Harness::new().await;
    let game = one_song_game(&h).await;
    h.catalog.add_tracks_delay_ms.store(400, Ordering::SeqCst);

    let first = spawn_reader(&h, "r1", &game);
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.clock.advance(31);
    let second = spawn_reader(&h, "r2", &game);

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_eq!(first.phase(), SessionPhase::Revealed);
    assert_eq!(second.phase(), SessionPhase::Revealed);
    assert_eq!(h.catalog.add_tracks_calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn caller_that_lost_its_lease_never_fills_the_playlist() {
    let h = Harness::new().await;
    let game = one_song_game(&h).await;
    h.catalog.metadata_delay_ms.store(400, Ordering::SeqCst);

    let first = spawn_reader(&h, "r1", &game);
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.clock.advance(600);
    let second = spawn_reader(&h, "r2", &game);

    let err = first.await.unwrap().unwrap_err();
    assert!(matches!(err, ServiceError::RevealPending), "got {err:?}");
    let view = second.await.unwrap().unwrap();
    assert_eq!(view.phase(), SessionPhase::Revealed);

    assert_eq!(h.catalog.metadata_calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.catalog.add_tracks_calls(), 1);
}

#[tokio::test]
async fn filled_playlist_is_not_refilled_by_the_next_holder() {
    let h = Harness::new().await;
    let game = one_song_game(&h).await;

    // A previous holder filled the playlist, then failed before committing.
    let store = h.state.require_game_store().await.unwrap();
    let lease = RevealLease {
        token: Uuid::new_v4(),
        expires_at: h.state.now() + 30,
    };
    store
        .claim_reveal(game.clone(), lease, h.state.now())
        .await
        .unwrap();
    store
        .mark_tracks_added(game.clone(), lease.token)
        .await
        .unwrap();
    store.release_reveal(game.clone(), lease.token).await.unwrap();

    let GameView::Revealed { songs, .. } = revealed(&h, "p1", &game).await else {
        panic!("expected revealed view");
    };
    assert!(songs.iter().all(|s| s.name.is_some()));
    assert_eq!(h.catalog.add_tracks_calls(), 0);

    let row = store.find_game(game).await.unwrap().unwrap();
    assert!(row.revealed && row.tracks_added);
}

#[tokio::test]
async fn empty_game_reveals_without_external_calls() {
    let h = Harness::new().await;
    let game = h.game("owner", 1).await;
    h.close_submissions();

    let GameView::Revealed { songs, guess_list, .. } = revealed(&h, "owner", &game).await else {
        panic!("expected revealed view");
    };
    assert!(songs.is_empty());
    assert!(guess_list.tiers.is_empty());
    assert_eq!(h.catalog.add_tracks_calls(), 0);
    assert_eq!(h.catalog.metadata_calls.load(Ordering::SeqCst), 0);
}

/// Two players submit, the deadline passes and both read the revealed game.
async fn revealed_pair(h: &Harness) -> (String, Uuid, Uuid, Vec<Uuid>) {
    let game = h.game("ace", 1).await;
    for (player, nickname, song) in [("ace", "Ace", 1), ("bee", "Bee", 2)] {
        submission_service::upsert_submission(
            &h.state,
            player.into(),
            game.clone(),
            submission(nickname, &[song]),
        )
        .await
        .unwrap();
    }
    h.close_submissions();

    let GameView::Revealed {
        guess_list,
        ranking_list,
        ..
    } = revealed(h, "ace", &game).await
    else {
        panic!("expected revealed view");
    };
    revealed(h, "bee", &game).await;

    let guess_tiers = guess_list.tiers.iter().map(|t| t.id).collect();
    (game, guess_list.id, ranking_list.id, guess_tiers)
}

fn placement(tier_id: Uuid, songs: &[u32]) -> TierPlacementInput {
    TierPlacementInput {
        tier_id,
        songs: songs.iter().map(|n| song(*n)).collect(),
    }
}

#[tokio::test]
async fn ranking_requires_guess_first_and_is_never_overwritten() {
    let h = Harness::new().await;
    let (game, guess_id, ranking_id, guess_tiers) = revealed_pair(&h).await;
    let store = h.state.require_game_store().await.unwrap();
    let ranking_tiers: Vec<Uuid> = store
        .find_tierlist(ranking_id)
        .await
        .unwrap()
        .unwrap()
        .tiers
        .iter()
        .map(|t| t.id)
        .collect();

    let rank_songs = || RankingRequest {
        tierlist_id: ranking_id,
        ranking: vec![placement(ranking_tiers[0], &[1, 2])],
    };

    let err = ranking_service::submit_ranking(&h.state, "bee".into(), game.clone(), rank_songs())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Precedence(_)), "got {err:?}");

    let err = ranking_service::ranking_result(&h.state, "bee".into(), game.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Precedence(_)));

    let guess = RankingRequest {
        tierlist_id: guess_id,
        ranking: vec![placement(guess_tiers[0], &[1])],
    };
    ranking_service::submit_ranking(&h.state, "bee".into(), game.clone(), guess)
        .await
        .unwrap();

    let again = RankingRequest {
        tierlist_id: guess_id,
        ranking: vec![placement(guess_tiers[1], &[1])],
    };
    let err = ranking_service::submit_ranking(&h.state, "bee".into(), game.clone(), again)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let result = ranking_service::ranking_result(&h.state, "bee".into(), game.clone())
        .await
        .unwrap();
    assert_eq!((result.correct, result.total), (1, 1));
    assert!(!result.ranking_submitted);

    ranking_service::submit_ranking(&h.state, "bee".into(), game.clone(), rank_songs())
        .await
        .unwrap();
    let result = ranking_service::ranking_result(&h.state, "bee".into(), game)
        .await
        .unwrap();
    assert!(result.ranking_submitted);
}

#[tokio::test]
async fn ranking_checks_run_in_order() {
    let h = Harness::new().await;
    let (game, guess_id, _ranking_id, guess_tiers) = revealed_pair(&h).await;

    let err = ranking_service::submit_ranking(
        &h.state,
        "bee".into(),
        game.clone(),
        RankingRequest {
            tierlist_id: Uuid::new_v4(),
            ranking: vec![],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = ranking_service::submit_ranking(
        &h.state,
        "bee".into(),
        game.clone(),
        RankingRequest {
            tierlist_id: guess_id,
            ranking: vec![placement(guess_tiers[0], &[1]), placement(guess_tiers[1], &[1])],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let err = ranking_service::submit_ranking(
        &h.state,
        "stranger".into(),
        game,
        RankingRequest {
            tierlist_id: guess_id,
            ranking: vec![placement(guess_tiers[0], &[1])],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn ranking_before_reveal_is_a_phase_error() {
    let h = Harness::new().await;
    let game = h.game("owner", 1).await;
    let store = h.state.require_game_store().await.unwrap();
    let guess_id = store.list_tierlists(game.clone()).await.unwrap()[0].id;

    let err = ranking_service::submit_ranking(
        &h.state,
        "owner".into(),
        game,
        RankingRequest {
            tierlist_id: guess_id,
            ranking: vec![],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidPhase(_)));
}

#[tokio::test]
async fn only_the_owner_deletes_a_game() {
    let h = Harness::new().await;
    let game = h.game("owner", 1).await;

    let err = game_service::delete_game(&h.state, "guest".into(), game.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    game_service::delete_game(&h.state, "owner".into(), game.clone())
        .await
        .unwrap();
    let err = game_service::get_game(&h.state, "owner".into(), game)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}
