//! SQL building: identifiers from model metadata only, values as parameters.

mod builder;
pub mod condition;
pub mod dialect;
pub mod params;
pub mod query_define;

pub use builder::*;
pub use condition::{assemble_where, build_condition, Condition};
pub use dialect::Dialect;
pub use params::BindValue;
pub use query_define::{parse_query_settings, QueryDefine, QueryDefines, QueryKind, QuerySettings};
