mod common;

use common::{account, set_rating, setup};
use skillgate::db::{MatchOutcome, Privilege, ranking::MAX_WINDOW};
use skillgate::elo::Winner;
use skillgate::error::AppError;

async fn play(services: &skillgate::Services, player1: i64, player2: i64, winner: Winner) {
    services
        .ledger
        .post_match_result(&MatchOutcome {
            player1,
            player2,
            winner,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn reserved_accounts_are_not_ranked() {
    let (_pool, services) = setup().await;
    services
        .credentials
        .seed_account(3, "admin", "admin@example.com", "s3cret", Privilege::ServerAdmin)
        .await
        .unwrap();
    account(&services, "Kasumi").await;
    account(&services, "Ryo").await;

    assert_eq!(services.ranking.leaderboard_size().await.unwrap(), 2);

    let rows = services.ranking.window(0, MAX_WINDOW).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.handle != "admin"));

    let (_, admin_pid) = services
        .credentials
        .account_identifiers("admin")
        .await
        .unwrap();
    assert_eq!(services.ranking.account_rank(&admin_pid).await.unwrap(), None);
    assert_eq!(services.ranking.account_rank("missing").await.unwrap(), None);
}

#[tokio::test]
async fn ranks_are_dense_over_rating_then_win_ratio() {
    let (pool, services) = setup().await;
    let (a, _) = account(&services, "Kasumi").await;
    let (b, _) = account(&services, "Ryo").await;
    account(&services, "Aoi").await;
    account(&services, "Mei").await;

    play(&services, a, b, Winner::Player1).await;
    // Same rating as the untouched accounts, but a better win ratio.
    set_rating(&pool, a, 1200).await;

    let rows = services.ranking.window(0, 10).await.unwrap();
    let ranks: Vec<_> = rows.iter().map(|r| (r.handle.as_str(), r.rank)).collect();
    assert_eq!(
        ranks,
        [("Kasumi", 1), ("Aoi", 2), ("Mei", 2), ("Ryo", 3)]
    );

    let paged = services.ranking.window(1, 2).await.unwrap();
    assert_eq!(paged, rows[1..3].to_vec());
}

#[tokio::test]
async fn window_and_single_lookup_agree() {
    let (pool, services) = setup().await;
    let mut ids = Vec::new();
    for (i, handle) in ["Kasumi", "Ryo", "Aoi", "Mei", "Sora", "Ren"].iter().enumerate() {
        let (id, _) = account(&services, handle).await;
        set_rating(&pool, id, 1000 + 50 * (i as i32 % 3)).await;
        ids.push(id);
    }
    play(&services, ids[0], ids[1], Winner::Player2).await;
    play(&services, ids[2], ids[3], Winner::Draw).await;

    let rows = services.ranking.window(0, MAX_WINDOW).await.unwrap();
    assert_eq!(rows.len(), 6);

    for row in &rows {
        let single = services
            .ranking
            .account_rank(&row.public_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&single, row);
    }
}

#[tokio::test]
async fn accounts_without_matches_have_zero_win_ratio() {
    let (_pool, services) = setup().await;
    let (_, public_id) = account(&services, "Kasumi").await;

    let rows = services.ranking.window(0, 1).await.unwrap();
    assert_eq!(rows[0].win_ratio, 0.0);
    assert_eq!(rows[0].ranked_total, 0);

    let single = services
        .ranking
        .account_rank(&public_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(single.win_ratio, 0.0);
    assert!(!single.win_ratio.is_nan());

    let profile = services.profiles.profile(&public_id).await.unwrap();
    assert_eq!(profile.win_ratio, 0.0);
}

#[tokio::test]
async fn leaderboard_reads_count_window_and_user_together() {
    let (_pool, services) = setup().await;
    let (a, a_pid) = account(&services, "Kasumi").await;
    let (b, _) = account(&services, "Ryo").await;
    account(&services, "Aoi").await;
    play(&services, a, b, Winner::Player2).await;

    let board = services
        .ranking
        .leaderboard(Some(&a_pid), 0, 2)
        .await
        .unwrap();

    assert_eq!(board.out_of, 3);
    assert_eq!(board.rows.len(), 2);
    assert_eq!(board.rows[0].handle, "Ryo");

    let user = board.user.unwrap();
    assert_eq!(user.handle, "Kasumi");
    assert_eq!(user.rank, 3);
    assert_eq!(user.losses, 1);

    let anonymous = services.ranking.leaderboard(None, 2, 10).await.unwrap();
    assert!(anonymous.user.is_none());
    assert_eq!(anonymous.rows.len(), 1);
    assert_eq!(anonymous.rows[0].public_id, a_pid);
}

#[tokio::test]
async fn profiles_expose_stats_and_avatar() {
    let (_pool, services) = setup().await;
    let (a, a_pid) = account(&services, "Kasumi").await;
    let (b, _) = account(&services, "Ryo").await;
    play(&services, a, b, Winner::Player1).await;
    play(&services, a, b, Winner::Draw).await;

    services.profiles.set_avatar(&a_pid, 4).await.unwrap();
    let profile = services.profiles.profile(&a_pid).await.unwrap();

    assert_eq!(profile.handle, "Kasumi");
    assert_eq!(profile.avatar, 4);
    assert_eq!((profile.wins, profile.draws, profile.losses), (1, 1, 0));
    assert_eq!(profile.ranked_total, 2);
    assert!((profile.win_ratio - 0.5).abs() < 1e-9);
    assert!(profile.created_at > 0);

    let err = services.profiles.profile("missing").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
    let err = services.profiles.set_avatar("missing", 1).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}
