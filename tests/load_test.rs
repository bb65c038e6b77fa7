//! Load testing: many concurrent streams through a filter chain.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use tokio::sync::oneshot;

use edge_client::config::ClientConfig;
use edge_client::filter::LoggingFilter;
use edge_client::headers::{RequestHeadersBuilder, RequestMethod};
use edge_client::{LoopbackEngine, StreamClient};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_load_performance() {
    let engine = Arc::new(LoopbackEngine::new());
    let mut client = StreamClient::new(&engine, ClientConfig::default());
    client.register_filter(LoggingFilter::instance);
    client.register_filter(LoggingFilter::instance);

    let concurrency = 20;
    let streams_per_task = 50;
    let total_streams = concurrency * streams_per_task;
    let start = Instant::now();

    let mut tasks = Vec::new();
    for task in 0..concurrency {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for i in 0..streams_per_task {
                let stream_start = Instant::now();
                let body = format!("task {task} stream {i}");

                let (done_tx, done_rx) = oneshot::channel();
                let mut done_tx = Some(done_tx);
                let mut received = BytesMut::new();
                let stream = client
                    .new_stream_prototype()
                    .set_on_response_data(move |data: Bytes, end_stream| {
                        received.extend_from_slice(&data);
                        if end_stream {
                            if let Some(tx) = done_tx.take() {
                                let _ = tx.send(received.split().freeze());
                            }
                        }
                    })
                    .start()
                    .unwrap();

                let headers =
                    RequestHeadersBuilder::new(RequestMethod::Post, "https", "load.test", "/")
                        .build();
                stream.send_headers(headers, false).unwrap();
                stream.send_data(Bytes::from(body.clone())).unwrap();
                stream.close_with_data(Bytes::new()).unwrap();

                match tokio::time::timeout(Duration::from_secs(5), done_rx).await {
                    Ok(Ok(echoed)) if echoed == body.as_bytes() => {
                        latencies.push(stream_start.elapsed())
                    }
                    _ => {}
                }
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for task in tasks {
        all_latencies.extend(task.await.unwrap());
    }

    let duration = start.elapsed();
    let rate = total_streams as f64 / duration.as_secs_f64();

    assert_eq!(all_latencies.len(), total_streams, "every stream should echo its body");

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p95 = all_latencies[(all_latencies.len() as f64 * 0.95) as usize];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Streams:  {}", total_streams);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Streams/sec:    {:.2}", rate);
    println!("P50 Latency:    {:?}", p50);
    println!("P95 Latency:    {:?}", p95);
    println!("P99 Latency:    {:?}", p99);
    println!("-------------------------\n");

    // Give drivers a moment to observe completion.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.active_streams(), 0);
}
