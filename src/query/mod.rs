mod eval;
mod exec;
pub mod params;
mod types;

pub use eval::{compare_bson, eval_filter, project_fields, values_equal};
pub use exec::{count_docs, find_docs, find_one};
pub use params::{
    Condition, ListQuery, Operator, PageDefaults, QueryParseError, coerce_value, parse_pairs,
};
pub use types::{CmpOp, Filter, FindOptions, Order, SortSpec};
