// YouTube side of the player: link parsing, Data API client and the
// ingestion pipeline built on it, plus yt-dlp audio extraction

pub mod api;
pub mod duration;
pub mod enrich;
pub mod extractor;
pub mod ingest;
pub mod link;
pub mod pages;

#[cfg(test)]
pub mod fake;
