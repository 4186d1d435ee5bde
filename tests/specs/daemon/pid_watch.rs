// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parent-watchdog specs: daemon dies with its supervisor.

use crate::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn parent_death_terminates_the_daemon() {
    let dir = tempdir().unwrap();
    let sock = dir.path().join("d.sock");

    // Stand-in parent process.
    let mut parent = std::process::Command::new("sleep").arg("30").spawn().unwrap();
    let parent_pid = parent.id() as i32;

    let hooks = Arc::new(Recorder::default());
    let mut daemon = Daemon::setup("specd", None, Arc::clone(&hooks) as _).unwrap();
    daemon.add_listener(&sock, Arc::new(EchoHooks::default()) as _).unwrap();
    let running = tokio::spawn(daemon.run(parent_pid));

    let started = Arc::clone(&hooks);
    assert!(wait_for(SPEC_WAIT_MAX_MS, move || started.started()).await);

    // Kill and reap the parent; the next probe sees ESRCH.
    parent.kill().unwrap();
    parent.wait().unwrap();

    let result = tokio::time::timeout(Duration::from_secs(10), running)
        .await
        .expect("watcher must notice the dead parent within one probe interval")
        .unwrap();

    match result {
        Err(DaemonError::PidGone(pid)) => assert_eq!(pid, parent_pid),
        other => panic!("expected PidGone, got {other:?}"),
    }
    assert!(!sock.exists(), "socket must be unlinked after PidGone shutdown");
    assert_eq!(hooks.shutdowns.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn pid_watch_at_most_one_is_disabled() {
    // 0 and 1 both mean "no watcher": the daemon outlives the first probe
    // window and stops only when asked.
    for pid_watch in [0, 1] {
        let dir = tempdir().unwrap();
        let sock = dir.path().join("d.sock");

        let hooks = Arc::new(Recorder::default());
        let mut daemon = Daemon::setup("specd", None, Arc::clone(&hooks) as _).unwrap();
        daemon.add_listener(&sock, Arc::new(EchoHooks::default()) as _).unwrap();
        let stop = daemon.stop_handle();
        let running = tokio::spawn(daemon.run(pid_watch));

        let started = Arc::clone(&hooks);
        assert!(wait_for(SPEC_WAIT_MAX_MS, move || started.started()).await);

        // Past the 1 s first-probe mark with room to spare.
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        let mut client = Client::connect(&sock).await.unwrap();
        let reply = client.roundtrip(b"still here", Duration::from_secs(5)).await.unwrap();
        assert_eq!(reply, b"still here");

        stop.stop();
        running.await.unwrap().unwrap();
    }
}
