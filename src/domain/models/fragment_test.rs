use std::time::Duration;

use anyhow::Result;

use super::fragment_channel;
use super::CodePilotError;
use crate::domain::testing::collect_code;

#[tokio::test]
async fn it_yields_fragments_in_order_then_ends() -> Result<()> {
    let (tx, mut stream) = fragment_channel();
    tx.send("fn ")?;
    tx.send("main")?;
    tx.finish();

    assert_eq!(stream.next().await, Some(Ok("fn ".to_string())));
    assert_eq!(stream.next().await, Some(Ok("main".to_string())));
    assert_eq!(stream.next().await, None);
    assert_eq!(stream.next().await, None);

    return Ok(());
}

#[tokio::test]
async fn it_skips_empty_fragments() -> Result<()> {
    let (tx, stream) = fragment_channel();
    tx.send("")?;
    tx.send("a")?;
    tx.send("")?;
    tx.finish();

    assert_eq!(collect_code(stream).await, Ok("a".to_string()));
    return Ok(());
}

#[tokio::test]
async fn it_signals_failure_exactly_once() -> Result<()> {
    let (tx, mut stream) = fragment_channel();
    tx.send("partial")?;
    tx.fail(CodePilotError::ModelInvocation("boom".to_string()));

    assert_eq!(stream.next().await, Some(Ok("partial".to_string())));
    assert_eq!(
        stream.next().await,
        Some(Err(CodePilotError::ModelInvocation("boom".to_string())))
    );
    assert_eq!(stream.next().await, None);
    assert_eq!(stream.next().await, None);

    return Ok(());
}

#[tokio::test]
async fn it_reports_a_vanished_producer_as_truncation() -> Result<()> {
    let (tx, mut stream) = fragment_channel();
    tx.send("half a line")?;
    drop(tx);

    assert_eq!(stream.next().await, Some(Ok("half a line".to_string())));
    assert!(matches!(
        stream.next().await,
        Some(Err(CodePilotError::StreamTruncation(_)))
    ));
    assert_eq!(stream.next().await, None);

    return Ok(());
}

#[tokio::test]
async fn it_times_out_an_idle_producer() -> Result<()> {
    let (tx, stream) = fragment_channel();
    let mut stream = stream.with_idle_timeout(Duration::from_millis(20));
    tx.send("slow")?;

    assert_eq!(stream.next().await, Some(Ok("slow".to_string())));
    assert!(matches!(
        stream.next().await,
        Some(Err(CodePilotError::ModelInvocation(_)))
    ));
    assert_eq!(stream.next().await, None);
    assert!(tx.send("late").is_err());

    return Ok(());
}

#[tokio::test]
async fn it_aborts_the_worker_when_dropped() -> Result<()> {
    let (tx, stream) = fragment_channel();
    let worker = tokio::spawn(async move {
        loop {
            if tx.send("tick").is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });

    let stream = stream.with_worker(worker.abort_handle());
    drop(stream);

    let res = tokio::time::timeout(Duration::from_secs(1), worker).await;
    assert!(res.is_ok(), "worker kept running after its stream was dropped");
    return Ok(());
}

#[tokio::test]
async fn it_reassembles_any_fragmentation_identically() -> Result<()> {
    let total = "function add(a, b) {\n  return a + b;\n}";
    for size in 1..=total.len() {
        let (tx, stream) = fragment_channel();
        let bytes = total.as_bytes();
        for chunk in bytes.chunks(size) {
            tx.send(std::str::from_utf8(chunk)?)?;
        }
        tx.finish();

        assert_eq!(collect_code(stream).await, Ok(total.to_string()));
    }

    return Ok(());
}
