pub mod util;

pub use util::{parse_bucket_edges, split_csv, timestamp};
