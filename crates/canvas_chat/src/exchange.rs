use crate::ui::streaming::StreamSession;
use crate::ui::{Completion, RenderSink};
use anyhow::{Context, Result};
use llm::ChunkStream;
use tracing::{debug, info, warn};

/// How a single exchange ended
#[derive(Debug)]
pub enum ExchangeOutcome {
    Completed(Completion),
    /// Cancelled through the sink before the answer finished
    Aborted,
}

/// Pull chunks from `stream` into `session` until the answer is complete
///
/// The sink is made read-only while the exchange runs; the session restores
/// it on completion or abort. Cancellation is checked between chunks. The
/// stream is finished on every exit so a recording tee can save its session.
pub async fn run_exchange<C, S>(
    stream: &mut C,
    session: &mut StreamSession,
    sink: &mut S,
) -> Result<ExchangeOutcome>
where
    C: ChunkStream + ?Sized,
    S: RenderSink + ?Sized,
{
    sink.set_editable(false);
    let result = pump(stream, session, sink).await;

    if let Err(e) = stream.finish().await {
        warn!("Failed to finish response stream: {:#}", e);
    }

    result
}

async fn pump<C, S>(
    stream: &mut C,
    session: &mut StreamSession,
    sink: &mut S,
) -> Result<ExchangeOutcome>
where
    C: ChunkStream + ?Sized,
    S: RenderSink + ?Sized,
{
    let mut chunk_count = 0usize;

    loop {
        if !sink.should_streaming_continue() {
            info!("Streaming cancelled after {} chunks", chunk_count);
            session.abort(sink);
            return Ok(ExchangeOutcome::Aborted);
        }

        let chunk = match stream.next_chunk().await {
            Ok(chunk) => chunk,
            Err(e) => {
                session.abort(sink);
                return Err(e).context("Failed to read response stream");
            }
        };

        let Some(bytes) = chunk else {
            debug!("Response stream closed after {} chunks", chunk_count);
            let completion = session.close(sink)?;
            return Ok(ExchangeOutcome::Completed(completion));
        };

        chunk_count += 1;
        let outcome = match session.push(&bytes, sink) {
            Ok(outcome) => outcome,
            Err(e) => {
                session.abort(sink);
                return Err(e).context("Failed to render response");
            }
        };
        if let Some(completion) = outcome.completion {
            debug!("Answer complete after {} chunks", chunk_count);
            return Ok(ExchangeOutcome::Completed(completion));
        }
    }
}
