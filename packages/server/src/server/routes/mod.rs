pub mod health;
pub mod tasks;

pub use health::health_handler;
pub use tasks::{
    coordinate_handler, enrich_handler, process_handler, reclaim_handler, scrape_handler,
};
