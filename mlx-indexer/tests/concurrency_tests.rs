//! Background jobs: bounded parallelism, polling, cancellation, root exclusivity

mod helpers;

use helpers::{stub_controller, wait_for_terminal, wait_until_idle, TestLibrary};
use mlx_common::events::IndexingEvent;
use mlx_indexer::models::{IndexingJob, JobStatus};
use mlx_indexer::services::JobError;
use std::time::Duration;

/// Albums with mixed problems; earlier folders decode slower than later ones
fn uneven_library(albums: usize) -> TestLibrary {
    let library = TestLibrary::new();
    for i in 0..albums {
        let name = format!("album-{:02}", i);
        let delay = ((albums - i) * 3).to_string();
        let album = library.album(&name);
        album.tagged(
            "01.flac",
            &[("album", name.as_str()), ("title", "One"), ("delay_ms", delay.as_str())],
        );
        match i % 4 {
            0 => {
                album.corrupt_track("02.flac").cover("cover.jpg");
            }
            1 => {
                album.subdir("scans", &[]).file("bad.lrc", "[99:zz]");
            }
            2 => {
                album.track("02.flac", "Other", "Two").cover("cover.png");
            }
            _ => {
                album.cover("cover.jpg");
            }
        }
    }
    library
}

/// Album folders whose single track sleeps, so a walk takes a while
fn slow_library(albums: usize, delay_ms: u64) -> TestLibrary {
    let library = TestLibrary::new();
    let delay = delay_ms.to_string();
    for i in 0..albums {
        let name = format!("album-{:02}", i);
        library
            .album(&name)
            .tagged(
                "01.flac",
                &[("album", name.as_str()), ("title", "One"), ("delay_ms", delay.as_str())],
            )
            .corrupt_track("02.flac")
            .cover("cover.jpg");
    }
    library
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_walk_matches_sequential() {
    let library = uneven_library(12);

    let sequential = stub_controller(1).run_indexing_job(library.root()).await.unwrap();
    let parallel = stub_controller(4).run_indexing_job(library.root()).await.unwrap();
    let wide = stub_controller(16).run_indexing_job(library.root()).await.unwrap();

    assert_eq!(sequential.status, JobStatus::Completed);
    assert!(sequential.warnings.len() >= 12);
    assert_eq!(sequential.warnings, parallel.warnings);
    assert_eq!(sequential.warnings, wide.warnings);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_catalog_matches_sequential() {
    let library = uneven_library(8);

    let sequential = stub_controller(1);
    let parallel = stub_controller(4);
    let a = sequential.run_indexing_job(library.root()).await.unwrap();
    let b = parallel.run_indexing_job(library.root()).await.unwrap();

    assert_eq!(
        sequential.albums(a.job_id).await.unwrap(),
        parallel.albums(b.job_id).await.unwrap()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_polled_warnings_only_grow() {
    let library = slow_library(10, 15);
    let controller = stub_controller(2);

    let job_id = controller.start_indexing_job(library.root()).await.unwrap();

    let mut snapshots: Vec<IndexingJob> = Vec::new();
    loop {
        let job = controller.get_job_status(job_id).await.unwrap();
        let done = job.is_terminal();
        snapshots.push(job);
        if done {
            break;
        }
        tokio::time::sleep(Duration::from_millis(3)).await;
    }

    assert!(snapshots.len() > 2, "walk finished before it could be observed");
    for pair in snapshots.windows(2) {
        let (before, after) = (&pair[0], &pair[1]);
        assert!(after.warnings.len() >= before.warnings.len());
        assert_eq!(&after.warnings[..before.warnings.len()], &before.warnings[..]);
        assert!(after.progress >= before.progress);
    }

    let last = snapshots.last().unwrap();
    assert_eq!(last.status, JobStatus::Completed);
    assert_eq!(last.progress, 100);
    // one corrupt track per album
    assert_eq!(last.warnings.len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_running_job_keeps_warnings() {
    let library = slow_library(30, 40);
    let controller = stub_controller(2);
    let mut rx = controller.events().subscribe();

    let job_id = controller.start_indexing_job(library.root()).await.unwrap();

    // Cancel once the first warning is committed
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(IndexingEvent::WarningRaised { job_id: id, .. }) if id == job_id => break,
                Ok(_) => {}
                Err(e) => panic!("event stream ended: {}", e),
            }
        }
    })
    .await
    .unwrap();
    controller.cancel_job(job_id).await.unwrap();

    let job = wait_for_terminal(&controller, job_id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("cancelled"));
    assert!(!job.warnings.is_empty());
    assert!(job.warnings.len() < 30);
    assert!(job.progress < 100);
    assert!(job.completed_at.is_some());

    // Nothing lands after the terminal transition
    tokio::time::sleep(Duration::from_millis(200)).await;
    let later = controller.get_job_status(job_id).await.unwrap();
    assert_eq!(later.warnings, job.warnings);
    assert_eq!(later.progress, job.progress);

    wait_until_idle(&controller).await;
    assert!(matches!(
        controller.cancel_job(job_id).await,
        Err(JobError::AlreadyFinished(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_second_job_on_same_root_rejected() {
    let library = slow_library(10, 30);
    let controller = stub_controller(1);

    let first = controller.start_indexing_job(library.root()).await.unwrap();
    match controller.start_indexing_job(library.root()).await {
        Err(JobError::AlreadyRunning { job_id, .. }) => assert_eq!(job_id, first),
        other => panic!("expected AlreadyRunning, got {:?}", other),
    }

    controller.cancel_job(first).await.unwrap();
    wait_for_terminal(&controller, first).await;
    wait_until_idle(&controller).await;

    // Root is free again
    let third = controller.start_indexing_job(library.root()).await.unwrap();
    let job = wait_for_terminal(&controller, third).await;
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_jobs_on_different_roots_run_independently() {
    let a = slow_library(4, 10);
    let b = TestLibrary::with_clean_albums(3);
    let controller = stub_controller(2);

    let job_a = controller.start_indexing_job(a.root()).await.unwrap();
    let job_b = controller.start_indexing_job(b.root()).await.unwrap();

    let done_a = wait_for_terminal(&controller, job_a).await;
    let done_b = wait_for_terminal(&controller, job_b).await;

    assert_eq!(done_a.status, JobStatus::Completed);
    assert_eq!(done_a.warnings.len(), 4);
    assert_eq!(done_b.status, JobStatus::Completed);
    assert!(done_b.warnings.is_empty());

    wait_until_idle(&controller).await;
    assert_eq!(controller.active_job_count().await, 0);
}
