//! Local implementations: HTML segmentation and rendering (scraper), rule-based metadata,
//! OpenAI-compatible enrichment (reqwest), a filesystem image store and the CSV writer.

pub mod config;
pub mod convert;
pub mod csv_out;
pub mod enrich;
pub mod fallback;
pub mod openai_compat;
pub mod render;
pub mod resolve;
pub mod segment;
pub mod store;

pub use convert::{ConvertRequest, Converter};
pub use csv_out::{csv_file_name, to_csv, CSV_HEADERS};
pub use enrich::{Enricher, Prompts, SeoFields};
pub use openai_compat::OpenAiCompatClient;
pub use render::StyleMap;
pub use resolve::{FieldSource, Provenance};
pub use store::{upload_image, FsImageStore, UploadedImage};
