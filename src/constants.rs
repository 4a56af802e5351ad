pub const DEFAULT_MAX_WIDTH: usize = 72;
pub const DEFAULT_INDENT: usize = 2;
pub const MAX_PARSE_DEPTH: usize = 4096;
pub const METRIC_STATS_LEN: usize = 3;
pub const TREE_KEYWORD: &str = "tree";
