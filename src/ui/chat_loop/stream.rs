use std::io::{self, Write};

use futures_util::StreamExt;
use tracing::debug;

use crate::core::app::App;
use crate::core::chat_stream::ResponseStreamEngine;

/// Send one chat line and print the reply as fragments arrive. Returns once
/// the stream ends; connection failures show up as the final fragment.
pub(super) async fn stream_reply<W: Write>(
    app: &mut App,
    engine: &ResponseStreamEngine,
    message: &str,
    out: &mut W,
) -> io::Result<()> {
    let history = app.start_chat_turn(message);
    let mut stream = engine.stream(&mut app.session, message, &history, app.contexts.as_slice());

    let mut fragments = 0usize;
    while let Some(fragment) = stream.next().await {
        fragments += 1;
        app.append_fragment(&fragment);
        write!(out, "{fragment}")?;
        out.flush()?;
    }
    writeln!(out)?;
    writeln!(out)?;

    let preview_changed = app.finish_chat_turn();
    debug!(fragments, preview_changed, "reply finished");
    out.flush()
}
