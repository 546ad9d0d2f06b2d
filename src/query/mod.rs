pub mod filter;
pub mod pagination;
pub mod params;

pub use filter::{WhereBuilder, WhereClause};
pub use pagination::{ListQuery, PageMeta, PageRequest};
