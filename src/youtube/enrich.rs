// Duration enrichment
// The listing endpoint has no lengths, so ids are sent to the videos endpoint
// in batches and the answers collected into a lookup table

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::youtube::api::{PlaylistApi, MAX_PAGE_SIZE};
use crate::youtube::duration::decode_duration;

// ==========================================
// fetch_durations()
// ==========================================
// Returns video id → display duration for every id the server answered.
//
// What happens:
// 1. ids are cut into consecutive batches of at most 50
// 2. batches are requested one after another
// 3. a failed or error-carrying batch is logged and skipped; the rest still run
//
// Ids missing from the table keep the default "0:00" when items are merged.
// No batch failure is ever reported to the caller.
pub async fn fetch_durations<A: PlaylistApi + ?Sized>(
    api: &A,
    video_ids: &[String],
) -> HashMap<String, String> {
    let mut durations = HashMap::with_capacity(video_ids.len());

    for (batch_index, batch) in video_ids.chunks(MAX_PAGE_SIZE).enumerate() {
        let response = match api.video_details(batch).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    batch = batch_index,
                    size = batch.len(),
                    error = %e,
                    "Duration batch failed, videos keep the default duration"
                );
                continue;
            }
        };

        if let Some(error) = response.error {
            warn!(batch = batch_index, code = ?error.code, message = %error.message, "Duration batch rejected by server");
            continue;
        }

        for video in response.items.unwrap_or_default() {
            let token = video.content_details.and_then(|details| details.duration);
            if let Some(token) = token {
                durations.insert(video.id, decode_duration(&token));
            }
        }
        debug!(batch = batch_index, size = batch.len(), "Duration batch done");
    }

    let missing = video_ids
        .iter()
        .filter(|id| !durations.contains_key(id.as_str()))
        .count();
    if missing > 0 {
        warn!(missing, total = video_ids.len(), "Some videos have no duration");
    }

    durations
}
