//! Integration tests for filtered waits on inbound frames.

mod common;

use std::time::Duration;

use common::{STEP, TestServer, connect, test_bot};
use slirc_bot::WaitOutcome;
use tokio::time::timeout;

#[tokio::test]
async fn test_wait_for_disconnected_is_closed() {
    let server = TestServer::spawn().await.unwrap();
    let bot = test_bot(&server);

    let mut ran = false;
    let outcome = bot.wait_for(|_| true, || ran = true).await;
    assert_eq!(outcome, WaitOutcome::Closed);
    assert!(!ran);
    assert_eq!(bot.pending_waits(), 0);
}

#[tokio::test]
async fn test_reply_provoked_by_action_is_seen() {
    let server = TestServer::spawn().await.unwrap();
    let bot = test_bot(&server);
    let mut peer = connect(&bot, &server).await.unwrap();

    let waiter = {
        let bot = bot.clone();
        tokio::spawn(async move {
            bot.wait_for(
                |f| f.is("NOTICE") && f.trailing_text() == "pong",
                || bot.msg("Echo", "ping"),
            )
            .await
        })
    };

    // The server answers the instant it sees the request.
    peer.expect_line("PRIVMSG Echo :ping").await.unwrap();
    peer.send_raw(":Echo!e@h NOTICE ugjka :noise").await.unwrap();
    peer.send_raw(":Echo!e@h NOTICE ugjka :pong").await.unwrap();

    let outcome = timeout(STEP, waiter).await.unwrap().unwrap();
    match outcome {
        WaitOutcome::Matched(frame) => assert_eq!(frame.sender_nick(), "Echo"),
        other => panic!("expected a match, got {other:?}"),
    }
    assert_eq!(bot.pending_waits(), 0);

    bot.disconnect();
}

#[tokio::test]
async fn test_two_waits_both_see_the_same_frame() {
    let server = TestServer::spawn().await.unwrap();
    let bot = test_bot(&server);
    let mut peer = connect(&bot, &server).await.unwrap();

    let spawn_wait = |bot: slirc_bot::Connection| {
        tokio::spawn(async move { bot.wait_for(|f| f.is("TOPIC"), || {}).await })
    };
    let a = spawn_wait(bot.clone());
    let b = spawn_wait(bot.clone());

    timeout(STEP, async {
        while bot.pending_waits() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    peer.send_raw(":op!o@h TOPIC #ugjka :new topic").await.unwrap();

    assert!(timeout(STEP, a).await.unwrap().unwrap().is_matched());
    assert!(timeout(STEP, b).await.unwrap().unwrap().is_matched());

    bot.disconnect();
}

#[tokio::test]
async fn test_timeout_leaves_no_registration() {
    let server = TestServer::spawn().await.unwrap();
    let bot = test_bot(&server);
    let _peer = connect(&bot, &server).await.unwrap();

    let outcome = bot
        .wait_for_timeout(|_| false, || {}, Duration::from_millis(50))
        .await;
    assert_eq!(outcome, WaitOutcome::TimedOut);
    assert_eq!(bot.pending_waits(), 0);

    bot.disconnect();
}

#[tokio::test]
async fn test_server_close_ends_wait() {
    let server = TestServer::spawn().await.unwrap();
    let bot = test_bot(&server);
    let peer = connect(&bot, &server).await.unwrap();

    let waiter = {
        let bot = bot.clone();
        tokio::spawn(async move { bot.wait_for(|_| false, || {}).await })
    };
    timeout(STEP, async {
        while bot.pending_waits() < 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    drop(peer);
    assert_eq!(
        timeout(STEP, waiter).await.unwrap().unwrap(),
        WaitOutcome::Closed
    );
    assert!(!bot.is_connected());
}
