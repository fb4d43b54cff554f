//! Request routing: filters, path patterns, the route drawing DSL and the [`Router`].

mod dynamic_path;
pub mod filter;
mod router;
mod routes;

pub use dynamic_path::{DynamicPath, PathMatcher};
pub use filter::Filter;
pub use router::Router;
pub use routes::{Route, RouteDefinition, Routes};
