//! Lazy fragment streams shared by the content generators.

use std::sync::Arc;

use async_stream::stream;
use futures_util::StreamExt;

use crate::llm_client::{FragmentStream, TextGenerator};

/// Wraps `stream_generate` so that nothing is sent upstream until the first poll.
///
/// A failure to open the stream is delivered as the first item. Empty fragments
/// are dropped. Fragments are passed through unmodified and in emission order.
pub fn lazy_fragments(
    llm: Arc<dyn TextGenerator>,
    prompt: String,
    system_instruction: String,
    temperature: f32,
) -> FragmentStream {
    let fragments = stream! {
        let opened = llm.stream_generate(&prompt, &system_instruction, temperature).await;
        let mut upstream = match opened {
            Ok(upstream) => upstream,
            Err(e) => {
                yield Err(e);
                return;
            }
        };
        while let Some(item) = upstream.next().await {
            match item {
                Ok(text) if text.is_empty() => continue,
                Ok(text) => yield Ok(text),
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
    };
    fragments.boxed()
}
