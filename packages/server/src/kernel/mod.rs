//! Infrastructure services: page fetching, text extraction, answer
//! generation, and the job queue. Business logic stays in `domains`.

pub mod answer;
pub mod deps;
pub mod extract;
pub mod jobs;
pub mod scrape;
pub mod test_dependencies;

pub use answer::{BaseAnswerGenerator, GenerationError, OpenAiAnswerer};
pub use deps::ServerDeps;
pub use extract::{extract_content, ExtractError};
pub use scrape::{normalize_url, BasePageFetcher, FetchError, HttpPageFetcher};
