//! Login handshake against mock servers


use std::time::Duration;

use nntp_conn::session::SessionError;
use test_helpers::*;

#[tokio::test]
async fn test_anonymous_greeting_sends_nothing() {
    let server = spawn_anonymous_server().await;
    let (mut session, _reactor) = session_for(profile_from(mock_config(&server)), true);

    session.init_connect().await.unwrap();
    let code = read_status(&mut session).await.unwrap();
    assert_eq!(code, 200);
    assert_eq!(session.response_text(), "200 mock server ready");

    session.finish_connect(code).await.unwrap();
    assert!(session.connected());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(server.commands().is_empty());
}

#[tokio::test]
async fn test_user_and_password_sent_in_order() {
    let server = spawn_auth_server("alice", "s3cret").await;
    let profile = profile_from(mock_config(&server).username("alice").password("s3cret"));
    let (mut session, _reactor) = session_for(profile, true);

    session.init_connect().await.unwrap();
    let greeting = read_status(&mut session).await.unwrap();
    session.finish_connect(greeting).await.unwrap();
    assert!(session.auth().user_sent());
    assert!(!session.connected());

    let code = read_status(&mut session).await.unwrap();
    assert_eq!(code, 381);
    session.finish_connect(code).await.unwrap();
    assert!(session.auth().user_ok());
    assert!(session.auth().pass_sent());

    let code = read_status(&mut session).await.unwrap();
    assert_eq!(code, 281);
    session.finish_connect(code).await.unwrap();
    assert!(session.connected());

    assert_eq!(
        server.wait_for_commands(2).await,
        vec!["AUTHINFO USER alice", "AUTHINFO PASS s3cret"]
    );
}

#[tokio::test]
async fn test_wrong_password_is_permanent() {
    let server = spawn_auth_server("alice", "s3cret").await;
    let profile = profile_from(mock_config(&server).username("alice").password("wrong"));
    let (mut session, _reactor) = session_for(profile, true);

    let err = connect_and_login(&mut session).await.unwrap_err();
    match err {
        SessionError::Permanent(e) => {
            assert_eq!(e.code, 481);
            assert_eq!(e.message, "481 authentication failed");
        }
        other => panic!("expected permanent error, got {other:?}"),
    }
    assert!(!session.connected());

    session.hard_reset(true, true).await;
    assert!(session.connection().is_none());
}

#[tokio::test]
async fn test_user_accepted_without_password() {
    let server = spawn_mock_server(b"200 ready\r\n", |line| {
        if line.starts_with("AUTHINFO USER") {
            Reply::line("281 welcome")
        } else {
            Reply::line("500 unexpected")
        }
    })
    .await;
    let profile = profile_from(mock_config(&server).username("bob").password("pw"));
    let (mut session, _reactor) = session_for(profile, true);

    connect_and_login(&mut session).await.unwrap();
    assert!(session.auth().pass_ok());
    assert_eq!(server.wait_for_commands(1).await, vec!["AUTHINFO USER bob"]);
}

#[tokio::test]
async fn test_fatal_greeting() {
    for greeting in [
        &b"400 service temporarily unavailable\r\n"[..],
        &b"502 access denied\r\n"[..],
    ] {
        let server = spawn_mock_server(greeting, |_| Reply::Close).await;
        let profile = profile_from(mock_config(&server).username("u").password("p"));
        let (mut session, _reactor) = session_for(profile, true);

        let err = connect_and_login(&mut session).await.unwrap_err();
        let code = err.code().unwrap();
        assert!(code == 400 || code == 502);
        assert!(server.commands().is_empty());
    }
}

#[tokio::test]
async fn test_480_mid_session_restarts_login() {
    let server = spawn_auth_server("alice", "s3cret").await;
    let profile = profile_from(mock_config(&server).username("alice").password("s3cret"));
    let (mut session, _reactor) = session_for(profile, true);

    connect_and_login(&mut session).await.unwrap();

    // Any other command gets 480 from this server
    session.send_group("alt.test").await.unwrap();
    let code = read_status(&mut session).await.unwrap();
    assert_eq!(code, 480);

    session.finish_connect(code).await.unwrap();
    assert!(session.auth().force_login());
    assert!(!session.connected());
    assert!(session.auth().user_sent());

    let mut code = read_status(&mut session).await.unwrap();
    while !session.connected() {
        session.finish_connect(code).await.unwrap();
        if !session.connected() {
            code = read_status(&mut session).await.unwrap();
        }
    }

    assert_eq!(
        server.wait_for_commands(5).await,
        vec![
            "AUTHINFO USER alice",
            "AUTHINFO PASS s3cret",
            "GROUP alt.test",
            "AUTHINFO USER alice",
            "AUTHINFO PASS s3cret",
        ]
    );
}

#[tokio::test]
async fn test_480_without_credentials_is_permanent() {
    let server = spawn_mock_server(b"480 login first\r\n", |_| Reply::Close).await;
    let (mut session, _reactor) = session_for(profile_from(mock_config(&server)), true);

    let err = connect_and_login(&mut session).await.unwrap_err();
    assert_eq!(err.code(), Some(480));
    assert!(session.auth().force_login());
}

#[tokio::test]
async fn test_username_only_sends_empty_password() {
    let server = spawn_auth_server("alice", "").await;
    let profile = profile_from(mock_config(&server).username("alice"));
    let (mut session, _reactor) = session_for(profile, true);

    connect_and_login(&mut session).await.unwrap();
    assert!(session.connected());
    assert_eq!(
        server.wait_for_commands(2).await,
        vec!["AUTHINFO USER alice", "AUTHINFO PASS "]
    );
}

#[tokio::test]
async fn test_password_only_sends_empty_username() {
    let server = spawn_mock_server(b"200 ready\r\n", |line| {
        if line == "AUTHINFO USER " {
            Reply::line("381 password required")
        } else if line == "AUTHINFO PASS token" {
            Reply::line("281 ok")
        } else {
            Reply::line("481 rejected")
        }
    })
    .await;
    let profile = profile_from(mock_config(&server).password("token"));
    let (mut session, _reactor) = session_for(profile, true);

    connect_and_login(&mut session).await.unwrap();
    assert_eq!(
        server.wait_for_commands(2).await,
        vec!["AUTHINFO USER ", "AUTHINFO PASS token"]
    );
}
